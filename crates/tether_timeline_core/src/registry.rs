// SPDX-License-Identifier: MIT OR Apache-2.0
//! The set of timelines and the structural edits applied to them.
//!
//! Every edit either applies fully or leaves the registry untouched. Edits
//! addressed at a timeline, track, anchor or event that does not exist are
//! ignored and report `false` (or `None`).

use crate::error::{ValidationError, ValidationResult};
use crate::timeline::{Timeline, TimelineId, DEFAULT_DURATION, DEFAULT_FPS};
use crate::track::{AnchorPoint, ColorStop, CopyMode, EventTrigger, Track, TrackMode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Address of a track: parent timeline name plus track name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    /// Timeline name
    pub timeline: String,
    /// Track name
    pub track: String,
}

impl TrackRef {
    /// Create a new track reference
    pub fn new(timeline: impl Into<String>, track: impl Into<String>) -> Self {
        Self {
            timeline: timeline.into(),
            track: track.into(),
        }
    }
}

/// Playback configuration of a timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSettings {
    /// Duration in seconds
    pub duration: f64,
    /// Frame rate
    pub fps: u32,
    /// Whether playback wraps around
    pub loop_playback: bool,
}

impl TimelineSettings {
    fn is_valid(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0 && self.fps > 0
    }
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            fps: DEFAULT_FPS,
            loop_playback: false,
        }
    }
}

/// Owner of all timelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRegistry {
    timelines: Vec<Timeline>,
    #[serde(default)]
    selected_timeline: Option<String>,
}

impl TimelineRegistry {
    /// Create a registry holding one default timeline
    pub fn new() -> Self {
        Self::with_settings(TimelineSettings::default())
    }

    /// Create a registry holding one timeline with the given settings
    pub fn with_settings(settings: TimelineSettings) -> Self {
        let mut registry = Self {
            timelines: Vec::new(),
            selected_timeline: None,
        };
        registry.add_timeline(None, settings);
        registry
    }

    /// All timelines in order
    pub fn timelines(&self) -> &[Timeline] {
        &self.timelines
    }

    pub(crate) fn timelines_mut(&mut self) -> &mut [Timeline] {
        &mut self.timelines
    }

    /// Number of timelines
    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    /// Whether the registry holds no timeline
    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    /// Get a timeline by name
    pub fn timeline(&self, name: &str) -> Option<&Timeline> {
        self.timelines.iter().find(|t| t.name == name)
    }

    /// Get a mutable timeline by name
    pub fn timeline_mut(&mut self, name: &str) -> Option<&mut Timeline> {
        self.timelines.iter_mut().find(|t| t.name == name)
    }

    /// Get a timeline by runtime ID
    pub fn timeline_by_id(&self, id: TimelineId) -> Option<&Timeline> {
        self.timelines.iter().find(|t| t.id == id)
    }

    /// Get a mutable timeline by runtime ID
    pub fn timeline_by_id_mut(&mut self, id: TimelineId) -> Option<&mut Timeline> {
        self.timelines.iter_mut().find(|t| t.id == id)
    }

    /// Name of the selected timeline
    pub fn selected_timeline(&self) -> Option<&str> {
        self.selected_timeline.as_deref()
    }

    /// The selected timeline
    pub fn selected(&self) -> Option<&Timeline> {
        self.timeline(self.selected_timeline.as_deref()?)
    }

    /// Get a track by reference
    pub fn track(&self, track: &TrackRef) -> Option<&Track> {
        self.timeline(&track.timeline)?.track(&track.track)
    }

    /// Next free `Timeline N` name, counting up from the timeline count
    pub fn unique_timeline_name(&self) -> String {
        let mut idx = self.timelines.len() + 1;
        loop {
            let name = format!("Timeline {idx}");
            if self.timeline(&name).is_none() {
                return name;
            }
            idx += 1;
        }
    }

    /// Add a timeline with one default curve track and select it.
    ///
    /// Without a name, a free `Timeline N` name is generated. An explicit
    /// name that is taken, or invalid settings, refuse the addition.
    pub fn add_timeline(&mut self, name: Option<&str>, settings: TimelineSettings) -> Option<&mut Timeline> {
        if !settings.is_valid() {
            return None;
        }
        let name = match name {
            Some(name) if self.timeline(name).is_some() => return None,
            Some(name) => name.to_string(),
            None => self.unique_timeline_name(),
        };
        let mut timeline = Timeline::new(name, settings.duration, settings.fps, settings.loop_playback);
        timeline.add_track(None);
        self.selected_timeline = Some(timeline.name.clone());
        self.timelines.push(timeline);
        self.timelines.last_mut()
    }

    /// Remove a timeline.
    ///
    /// The last remaining timeline cannot be removed. If the removed
    /// timeline was selected, the first remaining one becomes selected.
    pub fn remove_timeline(&mut self, name: &str) -> Option<Timeline> {
        if self.timelines.len() < 2 {
            return None;
        }
        let index = self.timelines.iter().position(|t| t.name == name)?;
        let removed = self.timelines.remove(index);
        if self.selected_timeline.as_deref().map_or(true, |s| s == name) {
            self.selected_timeline = self.timelines.first().map(|t| t.name.clone());
        }
        Some(removed)
    }

    /// Rename a timeline, keeping the selection pointed at it
    pub fn rename_timeline(&mut self, old_name: &str, new_name: &str) -> bool {
        if old_name != new_name && self.timeline(new_name).is_some() {
            return false;
        }
        let Some(timeline) = self.timeline_mut(old_name) else {
            return false;
        };
        timeline.name = new_name.to_string();
        if self.selected_timeline.as_deref() == Some(old_name) {
            self.selected_timeline = Some(new_name.to_string());
        }
        true
    }

    /// Change a timeline's playback configuration
    pub fn update_timeline(&mut self, name: &str, settings: TimelineSettings) -> bool {
        if !settings.is_valid() {
            return false;
        }
        let Some(timeline) = self.timeline_mut(name) else {
            return false;
        };
        timeline.duration = settings.duration;
        timeline.fps = settings.fps;
        timeline.loop_playback = settings.loop_playback;
        true
    }

    /// Select a timeline by exact name
    pub fn select_timeline(&mut self, name: &str) -> bool {
        if self.timeline(name).is_none() {
            return false;
        }
        self.selected_timeline = Some(name.to_string());
        true
    }

    /// Select a timeline by loose name: case-insensitive, with underscores
    /// matching spaces.
    pub fn select_timeline_loose(&mut self, name: &str) -> bool {
        let wanted = name.to_lowercase().replace('_', " ");
        let found = self
            .timelines
            .iter()
            .find(|t| t.name.to_lowercase().replace('_', " ") == wanted)
            .map(|t| t.name.clone());
        match found {
            Some(name) => {
                self.selected_timeline = Some(name);
                true
            }
            None => false,
        }
    }

    fn with_track(&mut self, track: &TrackRef, edit: impl FnOnce(&mut Track) -> bool) -> bool {
        self.timeline_mut(&track.timeline)
            .and_then(|t| t.track_mut(&track.track))
            .is_some_and(edit)
    }

    /// Add a default curve track to a timeline. Returns the track's name.
    pub fn add_track(&mut self, timeline: &str, name: Option<&str>) -> Option<String> {
        let timeline = self.timeline_mut(timeline)?;
        timeline.add_track(name).map(|t| t.name.clone())
    }

    /// Remove a track
    pub fn remove_track(&mut self, track: &TrackRef) -> bool {
        self.timeline_mut(&track.timeline)
            .and_then(|t| t.remove_track(&track.track))
            .is_some()
    }

    /// Rename a track within its timeline
    pub fn rename_track(&mut self, track: &TrackRef, new_name: &str) -> bool {
        self.timeline_mut(&track.timeline)
            .is_some_and(|t| t.rename_track(&track.track, new_name))
    }

    /// Switch a track's mode, resetting its payload
    pub fn set_track_mode(&mut self, track: &TrackRef, mode: TrackMode) -> bool {
        self.with_track(track, |t| t.set_mode(mode))
    }

    /// Replace a curve. Coordinates are clamped and anchors sorted.
    pub fn update_curve(&mut self, track: &TrackRef, anchors: Vec<AnchorPoint>) -> bool {
        self.with_track(track, |t| t.set_curve(anchors))
    }

    /// Replace an event list. Positions are clamped and events sorted.
    pub fn update_events(&mut self, track: &TrackRef, events: Vec<EventTrigger>) -> bool {
        self.with_track(track, |t| t.set_events(events))
    }

    /// Replace a gradient. Positions are clamped and stops sorted.
    pub fn update_colors(&mut self, track: &TrackRef, stops: Vec<ColorStop>) -> bool {
        self.with_track(track, |t| t.set_colors(stops))
    }

    /// Apply an arbitrary edit to one track
    pub fn edit_track(&mut self, track: &TrackRef, edit: impl FnOnce(&mut Track) -> bool) -> bool {
        self.with_track(track, edit)
    }

    /// Copy the payload of one track into another of the same mode
    pub fn copy_track_data(&mut self, from: &TrackRef, to: &TrackRef, mode: CopyMode) -> bool {
        if from == to {
            return false;
        }
        let Some(source) = self.track(from).cloned() else {
            return false;
        };
        self.with_track(to, |t| t.copy_from(&source, mode))
    }

    /// Check the invariants inbound state must satisfy
    pub fn validate(&self) -> ValidationResult<()> {
        if self.timelines.is_empty() {
            return Err(ValidationError::NoTimelines);
        }
        let mut names = HashSet::new();
        for timeline in &self.timelines {
            if !names.insert(timeline.name.as_str()) {
                return Err(ValidationError::DuplicateTimeline(timeline.name.clone()));
            }
            timeline.validate()?;
        }
        if let Some(selected) = &self.selected_timeline {
            if !names.contains(selected.as_str()) {
                return Err(ValidationError::UnknownSelection(selected.clone()));
            }
        }
        Ok(())
    }

    /// Validate, then fill in a missing selection with the first timeline
    pub fn into_validated(mut self) -> ValidationResult<Self> {
        self.validate()?;
        if self.selected_timeline.is_none() {
            self.selected_timeline = self.timelines.first().map(|t| t.name.clone());
        }
        Ok(self)
    }
}

impl Default for TimelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bezier::Point;
    use crate::track::TrackData;

    fn assert_payload_matches_mode(registry: &TimelineRegistry) {
        for timeline in registry.timelines() {
            for track in timeline.tracks() {
                let matches = match track.data() {
                    TrackData::Curve(anchors) => track.mode() == TrackMode::Curve && anchors.len() >= 2,
                    TrackData::Event(_) => track.mode() == TrackMode::Event,
                    TrackData::Color(_) => track.mode() == TrackMode::Color,
                };
                assert!(matches, "track {} out of shape", track.name);
            }
        }
    }

    #[test]
    fn test_new_registry() {
        let registry = TimelineRegistry::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.selected_timeline(), Some("Timeline 1"));
        let timeline = registry.selected().unwrap();
        assert_eq!(timeline.track_count(), 1);
        assert_eq!(timeline.tracks()[0].mode(), TrackMode::Curve);
    }

    #[test]
    fn test_add_timeline_dedups_names() {
        let mut registry = TimelineRegistry::new();
        registry.add_timeline(Some("Timeline 2"), TimelineSettings::default());
        let name = registry
            .add_timeline(None, TimelineSettings::default())
            .map(|t| t.name.clone());
        assert_eq!(name.as_deref(), Some("Timeline 3"));
        assert_eq!(registry.selected_timeline(), Some("Timeline 3"));

        assert!(registry.add_timeline(Some("Timeline 2"), TimelineSettings::default()).is_none());
        let bad = TimelineSettings {
            duration: 0.0,
            ..TimelineSettings::default()
        };
        assert!(registry.add_timeline(Some("Zero"), bad).is_none());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_remove_timeline_reselects() {
        let mut registry = TimelineRegistry::new();
        registry.add_timeline(Some("B"), TimelineSettings::default());
        registry.add_timeline(Some("C"), TimelineSettings::default());
        registry.select_timeline("B");

        assert!(registry.remove_timeline("C").is_some());
        assert_eq!(registry.selected_timeline(), Some("B"));

        assert!(registry.remove_timeline("B").is_some());
        assert_eq!(registry.selected_timeline(), Some("Timeline 1"));

        // the last timeline stays
        assert!(registry.remove_timeline("Timeline 1").is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove_timeline("Missing").is_none());
    }

    #[test]
    fn test_rename_timeline_repoints_selection() {
        let mut registry = TimelineRegistry::new();
        registry.add_timeline(Some("Other"), TimelineSettings::default());
        registry.select_timeline("Timeline 1");
        assert!(!registry.rename_timeline("Timeline 1", "Other"));
        assert!(registry.rename_timeline("Timeline 1", "Intro"));
        assert_eq!(registry.selected_timeline(), Some("Intro"));
        assert!(registry.timeline("Timeline 1").is_none());
    }

    #[test]
    fn test_select_timeline_loose() {
        let mut registry = TimelineRegistry::new();
        registry.add_timeline(Some("Main Show"), TimelineSettings::default());
        registry.select_timeline("Timeline 1");
        assert!(registry.select_timeline_loose("main_show"));
        assert_eq!(registry.selected_timeline(), Some("Main Show"));
        assert!(!registry.select_timeline("main show"));
        assert!(!registry.select_timeline_loose("nothing"));
    }

    #[test]
    fn test_update_timeline() {
        let mut registry = TimelineRegistry::new();
        let settings = TimelineSettings {
            duration: 30.0,
            fps: 25,
            loop_playback: true,
        };
        assert!(registry.update_timeline("Timeline 1", settings));
        let timeline = registry.timeline("Timeline 1").unwrap();
        assert_eq!(timeline.duration, 30.0);
        assert_eq!(timeline.fps, 25);
        assert!(timeline.loop_playback);
        assert!(!registry.update_timeline("Missing", settings));
    }

    #[test]
    fn test_track_edits_are_scoped_to_timeline() {
        let mut registry = TimelineRegistry::new();
        registry.add_timeline(Some("B"), TimelineSettings::default());
        let in_a = TrackRef::new("Timeline 1", "Track 1");
        let in_b = TrackRef::new("B", "Track 1");

        assert!(registry.set_track_mode(&in_a, TrackMode::Event));
        assert_eq!(registry.track(&in_b).unwrap().mode(), TrackMode::Curve);

        assert!(registry.remove_track(&in_b));
        assert!(registry.track(&in_a).is_some());
        assert!(!registry.remove_track(&in_b));
    }

    #[test]
    fn test_mutations_on_missing_targets_are_noops() {
        let mut registry = TimelineRegistry::new();
        let before = registry.clone();
        let missing = TrackRef::new("Timeline 1", "Nope");

        assert!(registry.add_track("Nope", None).is_none());
        assert!(!registry.remove_track(&missing));
        assert!(!registry.rename_track(&missing, "X"));
        assert!(!registry.set_track_mode(&missing, TrackMode::Color));
        assert!(!registry.update_events(&missing, Vec::new()));
        assert!(!registry.update_curve(&TrackRef::new("Nope", "Track 1"), Vec::new()));
        assert!(!registry.rename_timeline("Nope", "X"));
        assert!(!registry.select_timeline("Nope"));
        assert_eq!(registry, before);
    }

    #[test]
    fn test_mode_invariant_survives_edit_sequences() {
        let mut registry = TimelineRegistry::new();
        let modes = [TrackMode::Event, TrackMode::Color, TrackMode::Curve];
        for i in 0..12 {
            let name = registry.add_track("Timeline 1", None).unwrap();
            let track = TrackRef::new("Timeline 1", name);
            registry.set_track_mode(&track, modes[i % 3]);
            if i % 4 == 0 {
                registry.remove_track(&track);
            }
            assert_payload_matches_mode(&registry);
        }
    }

    #[test]
    fn test_update_curve_clamps_and_sorts() {
        let mut registry = TimelineRegistry::new();
        let track = TrackRef::new("Timeline 1", "Track 1");
        let anchors = vec![
            AnchorPoint::new(Point::new(0.9, 0.1)),
            AnchorPoint::new(Point::new(0.1, 0.9)),
        ];
        assert!(registry.update_curve(&track, anchors));
        let curve = registry.track(&track).unwrap().curve().unwrap();
        assert_eq!(curve[0].anchor, Point::new(0.1, 0.9));
        assert_eq!(curve[1].anchor, Point::new(0.9, 0.1));
    }

    #[test]
    fn test_copy_track_data_between_timelines() {
        let mut registry = TimelineRegistry::new();
        registry.add_timeline(Some("B"), TimelineSettings::default());
        let src = TrackRef::new("Timeline 1", "Track 1");
        let dst = TrackRef::new("B", "Track 1");
        registry.edit_track(&src, |t| t.add_anchor(Point::new(0.5, 1.0)).is_some());

        assert!(registry.copy_track_data(&src, &dst, CopyMode::Replace));
        assert_eq!(registry.track(&dst).unwrap().curve().unwrap().len(), 3);
        assert!(!registry.copy_track_data(&src, &src, CopyMode::Append));
    }

    #[test]
    fn test_validate() {
        let registry = TimelineRegistry::new();
        assert!(registry.validate().is_ok());

        let mut dup = TimelineRegistry::new();
        dup.timelines.push(dup.timelines[0].clone());
        assert!(matches!(dup.validate(), Err(ValidationError::DuplicateTimeline(_))));

        let mut unknown = TimelineRegistry::new();
        unknown.selected_timeline = Some("Ghost".into());
        assert!(matches!(unknown.validate(), Err(ValidationError::UnknownSelection(_))));

        let empty = TimelineRegistry {
            timelines: Vec::new(),
            selected_timeline: None,
        };
        assert!(matches!(empty.validate(), Err(ValidationError::NoTimelines)));
    }
}
