// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline containing multiple tracks.

use crate::error::{ValidationError, ValidationResult};
use crate::track::{Track, TrackMode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Default timeline duration in seconds
pub const DEFAULT_DURATION: f64 = 10.0;

/// Default frame rate
pub const DEFAULT_FPS: u32 = 60;

/// Runtime identifier for a timeline.
///
/// Timelines are addressed by name from the outside; the id stays stable
/// across renames and keys the playback clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimelineId(pub Uuid);

impl TimelineId {
    /// Create a new random timeline ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimelineId {
    fn default() -> Self {
        Self::new()
    }
}

/// A timeline of tracks plus its playback configuration and live state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    /// Runtime ID, regenerated on load
    #[serde(skip)]
    pub id: TimelineId,
    /// Timeline name, unique within the registry
    pub name: String,
    /// Duration in seconds
    pub duration: f64,
    /// Frame rate, used for display and optional frame stepping
    pub fps: u32,
    /// Whether playback wraps around at the end
    pub loop_playback: bool,
    /// Tracks in display order
    tracks: Vec<Track>,
    /// Normalized playhead position in [0, 1]
    #[serde(default)]
    pub position: f64,
    /// Whether the timeline is playing
    #[serde(default)]
    pub is_playing: bool,
}

impl Timeline {
    /// Create a new timeline without tracks
    pub fn new(name: impl Into<String>, duration: f64, fps: u32, loop_playback: bool) -> Self {
        Self {
            id: TimelineId::new(),
            name: name.into(),
            duration,
            fps,
            loop_playback,
            tracks: Vec::new(),
            position: 0.0,
            is_playing: false,
        }
    }

    /// Get a track by name
    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    /// Get a mutable track by name
    pub fn track_mut(&mut self, name: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.name == name)
    }

    /// Get all tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Next free `Track N` name, counting up from the track count
    pub fn unique_track_name(&self) -> String {
        let mut idx = self.tracks.len() + 1;
        loop {
            let name = format!("Track {idx}");
            if self.track(&name).is_none() {
                return name;
            }
            idx += 1;
        }
    }

    /// Add a curve track with the default curve.
    ///
    /// Without a name, a free `Track N` name is generated. An explicit name
    /// that is already taken is refused.
    pub fn add_track(&mut self, name: Option<&str>) -> Option<&mut Track> {
        let name = match name {
            Some(name) if self.track(name).is_some() => return None,
            Some(name) => name.to_string(),
            None => self.unique_track_name(),
        };
        self.tracks.push(Track::new(name));
        self.tracks.last_mut()
    }

    /// Remove a track, keeping the order of the others
    pub fn remove_track(&mut self, name: &str) -> Option<Track> {
        let index = self.tracks.iter().position(|t| t.name == name)?;
        Some(self.tracks.remove(index))
    }

    /// Rename a track. Refused if the new name belongs to another track.
    pub fn rename_track(&mut self, old_name: &str, new_name: &str) -> bool {
        if old_name != new_name && self.track(new_name).is_some() {
            return false;
        }
        match self.track_mut(old_name) {
            Some(track) => {
                track.name = new_name.to_string();
                true
            }
            None => false,
        }
    }

    /// Switch a track's mode
    pub fn set_track_mode(&mut self, name: &str, mode: TrackMode) -> bool {
        self.track_mut(name).is_some_and(|t| t.set_mode(mode))
    }

    /// Current playhead time in seconds
    pub fn time(&self) -> f64 {
        self.position * self.duration
    }

    /// Set the playhead position, clamped to [0, 1]
    pub fn set_position(&mut self, position: f64) {
        self.position = if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, 1.0)
        };
    }

    /// Convert a normalized position to a frame number
    pub fn position_to_frame(&self, position: f64) -> u64 {
        (position.clamp(0.0, 1.0) * self.duration * f64::from(self.fps)).round() as u64
    }

    /// Total number of frames
    pub fn frame_count(&self) -> u64 {
        self.position_to_frame(1.0)
    }

    /// Check the invariants inbound timelines must satisfy
    pub fn validate(&self) -> ValidationResult<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ValidationError::InvalidDuration {
                timeline: self.name.clone(),
                duration: self.duration,
            });
        }
        if self.fps == 0 {
            return Err(ValidationError::InvalidFps(self.name.clone()));
        }
        if !(0.0..=1.0).contains(&self.position) {
            return Err(ValidationError::InvalidPosition {
                timeline: self.name.clone(),
                position: self.position,
            });
        }
        let mut names = HashSet::new();
        for track in &self.tracks {
            if !names.insert(track.name.as_str()) {
                return Err(ValidationError::DuplicateTrack {
                    timeline: self.name.clone(),
                    track: track.name.clone(),
                });
            }
            track.check_shape()?;
        }
        Ok(())
    }
}
