// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command layer over the registry and the playback clocks.
//!
//! A [`Session`] owns one [`TimelineRegistry`] and one
//! [`PlaybackController`]. Every change, whether an edit, a playback
//! command or an inbound message, goes through [`Session::apply`], which
//! keeps structure and clocks consistent with each other: a removed
//! timeline has its clock cancelled, a replaced registry keeps the live
//! state of timelines that survive the replacement.

use crate::bezier::Point;
use crate::evaluator::TimelineSnapshot;
use crate::playback::{OutputSink, PlaybackController, SeekTarget, StepUnit};
use crate::registry::{TimelineRegistry, TimelineSettings, TrackRef};
use crate::timeline::TimelineId;
use crate::track::{AnchorId, AnchorPoint, ColorStop, CopyMode, EventId, EventTrigger, RgbaColor, TrackMode};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Playback state reported by another party. Same shape as an outbound
/// snapshot; only `name`, `position` and `isPlaying` are used.
pub type PlaybackStateMessage = TimelineSnapshot;

/// A single change to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Add a timeline and select it
    AddTimeline {
        /// Explicit name, or `None` for a generated one
        #[serde(default)]
        name: Option<String>,
        /// Playback configuration
        #[serde(default)]
        settings: TimelineSettings,
    },
    /// Remove a timeline, stopping it first
    RemoveTimeline {
        /// Timeline name
        name: String,
    },
    /// Rename a timeline
    RenameTimeline {
        /// Current name
        from: String,
        /// New name
        to: String,
    },
    /// Change a timeline's playback configuration
    UpdateTimeline {
        /// Timeline name
        name: String,
        /// New configuration
        settings: TimelineSettings,
    },
    /// Select a timeline, stopping the previously selected one
    SelectTimeline {
        /// Timeline name
        name: String,
        /// Match case-insensitively, with underscores as spaces
        #[serde(default)]
        loose: bool,
    },
    /// Add a curve track
    AddTrack {
        /// Parent timeline
        timeline: String,
        /// Explicit name, or `None` for a generated one
        #[serde(default)]
        name: Option<String>,
    },
    /// Remove a track
    RemoveTrack {
        /// Track to remove
        track: TrackRef,
    },
    /// Rename a track
    RenameTrack {
        /// Track to rename
        track: TrackRef,
        /// New name
        name: String,
    },
    /// Switch a track's mode
    SetTrackMode {
        /// Target track
        track: TrackRef,
        /// New mode
        mode: TrackMode,
    },
    /// Replace a curve
    UpdateCurve {
        /// Target track
        track: TrackRef,
        /// New anchors
        anchors: Vec<AnchorPoint>,
    },
    /// Replace an event list
    UpdateEvents {
        /// Target track
        track: TrackRef,
        /// New events
        events: Vec<EventTrigger>,
    },
    /// Replace a gradient
    UpdateColors {
        /// Target track
        track: TrackRef,
        /// New stops
        colors: Vec<ColorStop>,
    },
    /// Insert an anchor
    AddAnchor {
        /// Target track
        track: TrackRef,
        /// Anchor position
        at: Point,
    },
    /// Remove an anchor
    RemoveAnchor {
        /// Target track
        track: TrackRef,
        /// Anchor to remove
        id: AnchorId,
    },
    /// Move an anchor with its handles
    MoveAnchor {
        /// Target track
        track: TrackRef,
        /// Anchor to move
        id: AnchorId,
        /// New anchor position
        to: Point,
    },
    /// Insert an event trigger
    AddEvent {
        /// Target track
        track: TrackRef,
        /// Normalized position
        position: f64,
        /// Payload
        data: String,
    },
    /// Remove an event trigger
    RemoveEvent {
        /// Target track
        track: TrackRef,
        /// Event to remove
        id: EventId,
    },
    /// Move an event trigger
    MoveEvent {
        /// Target track
        track: TrackRef,
        /// Event to move
        id: EventId,
        /// New normalized position
        position: f64,
    },
    /// Insert a color stop
    AddColorStop {
        /// Target track
        track: TrackRef,
        /// Normalized position
        position: f64,
        /// Stop color
        color: RgbaColor,
    },
    /// Remove a color stop by index
    RemoveColorStop {
        /// Target track
        track: TrackRef,
        /// Index in the sorted stop list
        index: usize,
    },
    /// Copy one track's payload into another of the same mode
    CopyTrackData {
        /// Source track
        from: TrackRef,
        /// Destination track
        to: TrackRef,
        /// Append to or replace the destination payload
        mode: CopyMode,
    },
    /// Start or seek playback; `None` targets the selected timeline
    Play {
        /// Timeline name
        #[serde(default)]
        timeline: Option<String>,
        /// Start position
        #[serde(default)]
        from: Option<f64>,
    },
    /// Pause playback; `None` targets the selected timeline
    Pause {
        /// Timeline name
        #[serde(default)]
        timeline: Option<String>,
    },
    /// Move the playhead; `None` targets the selected timeline
    Seek {
        /// Timeline name
        #[serde(default)]
        timeline: Option<String>,
        /// Where to move
        target: SeekTarget,
    },
    /// Pause every timeline
    StopAll,
    /// Playback state reported by another party
    PlaybackState(PlaybackStateMessage),
    /// Full structural replacement, validated before it is accepted
    ReplaceState(TimelineRegistry),
}

/// Registry plus playback clocks
#[derive(Debug, Default)]
pub struct Session {
    registry: TimelineRegistry,
    controller: PlaybackController,
}

impl Session {
    /// Create a session over a registry
    pub fn new(registry: TimelineRegistry, step_unit: StepUnit) -> Self {
        Self {
            registry,
            controller: PlaybackController::new(step_unit),
        }
    }

    /// The timelines
    pub fn registry(&self) -> &TimelineRegistry {
        &self.registry
    }

    /// The playback clocks
    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// Advance every running clock
    pub fn tick(&mut self, now: Instant, sink: &mut dyn OutputSink) -> usize {
        self.controller.tick_all(&mut self.registry, now, sink)
    }

    /// Apply a command. Returns false if it was ignored.
    pub fn apply(&mut self, command: Command, now: Instant, sink: &mut dyn OutputSink) -> bool {
        let applied = match command {
            Command::AddTimeline { name, settings } => self.add_timeline(name.as_deref(), settings),
            Command::RemoveTimeline { name } => self.remove_timeline(&name),
            Command::RenameTimeline { from, to } => self.registry.rename_timeline(&from, &to),
            Command::UpdateTimeline { name, settings } => self.registry.update_timeline(&name, settings),
            Command::SelectTimeline { name, loose } => self.select_timeline(&name, loose),
            Command::AddTrack { timeline, name } => self.registry.add_track(&timeline, name.as_deref()).is_some(),
            Command::RemoveTrack { track } => self.registry.remove_track(&track),
            Command::RenameTrack { track, name } => self.registry.rename_track(&track, &name),
            Command::SetTrackMode { track, mode } => self.registry.set_track_mode(&track, mode),
            Command::UpdateCurve { track, anchors } => self.registry.update_curve(&track, anchors),
            Command::UpdateEvents { track, events } => self.registry.update_events(&track, events),
            Command::UpdateColors { track, colors } => self.registry.update_colors(&track, colors),
            Command::AddAnchor { track, at } => self.registry.edit_track(&track, |t| t.add_anchor(at).is_some()),
            Command::RemoveAnchor { track, id } => self.registry.edit_track(&track, |t| t.remove_anchor(&id)),
            Command::MoveAnchor { track, id, to } => self.registry.edit_track(&track, |t| t.move_anchor(&id, to)),
            Command::AddEvent { track, position, data } => {
                self.registry.edit_track(&track, |t| t.add_event(position, data).is_some())
            }
            Command::RemoveEvent { track, id } => self.registry.edit_track(&track, |t| t.remove_event(&id)),
            Command::MoveEvent { track, id, position } => {
                self.registry.edit_track(&track, |t| t.move_event(&id, position))
            }
            Command::AddColorStop { track, position, color } => {
                self.registry.edit_track(&track, |t| t.add_color_stop(position, color))
            }
            Command::RemoveColorStop { track, index } => {
                self.registry.edit_track(&track, |t| t.remove_color_stop(index))
            }
            Command::CopyTrackData { from, to, mode } => self.registry.copy_track_data(&from, &to, mode),
            Command::Play { timeline, from } => self.play(timeline.as_deref(), from, now, sink),
            Command::Pause { timeline } => self.pause(timeline.as_deref()),
            Command::Seek { timeline, target } => self.seek(timeline.as_deref(), target, now, sink),
            Command::StopAll => {
                self.controller.stop_all(&mut self.registry);
                true
            }
            Command::PlaybackState(message) => self.sync_remote(&message, now),
            Command::ReplaceState(registry) => self.replace_state(registry),
        };
        if !applied {
            tracing::debug!("Ignored command that matched no target or changed nothing");
        }
        applied
    }

    fn target_name(&self, timeline: Option<&str>) -> Option<String> {
        timeline
            .or_else(|| self.registry.selected_timeline())
            .map(str::to_string)
    }

    fn add_timeline(&mut self, name: Option<&str>, settings: TimelineSettings) -> bool {
        let previous = self.registry.selected().map(|t| t.id);
        if self.registry.add_timeline(name, settings).is_none() {
            return false;
        }
        if let Some(id) = previous {
            self.stop_clock(id);
        }
        true
    }

    fn remove_timeline(&mut self, name: &str) -> bool {
        let Some(id) = self.registry.timeline(name).map(|t| t.id) else {
            return false;
        };
        if self.registry.len() < 2 {
            return false;
        }
        if self.controller.stop(id) {
            tracing::debug!("Stopped timeline '{}' before removal", name);
        }
        self.registry.remove_timeline(name).is_some()
    }

    fn select_timeline(&mut self, name: &str, loose: bool) -> bool {
        let previous = self.registry.selected().map(|t| t.id);
        let selected = if loose {
            self.registry.select_timeline_loose(name)
        } else {
            self.registry.select_timeline(name)
        };
        if !selected {
            return false;
        }
        let current = self.registry.selected().map(|t| t.id);
        if let Some(id) = previous.filter(|id| Some(*id) != current) {
            self.stop_clock(id);
        }
        true
    }

    /// Pause a timeline's clock, keeping its position
    fn stop_clock(&mut self, id: TimelineId) {
        if let Some(timeline) = self.registry.timeline_by_id_mut(id) {
            self.controller.pause(timeline);
        }
    }

    fn play(&mut self, timeline: Option<&str>, from: Option<f64>, now: Instant, sink: &mut dyn OutputSink) -> bool {
        let Some(name) = self.target_name(timeline) else {
            return false;
        };
        match self.registry.timeline_mut(&name) {
            Some(timeline) => {
                self.controller.play(timeline, from, now, sink);
                true
            }
            None => false,
        }
    }

    fn pause(&mut self, timeline: Option<&str>) -> bool {
        let Some(name) = self.target_name(timeline) else {
            return false;
        };
        self.registry
            .timeline_mut(&name)
            .is_some_and(|t| self.controller.pause(t))
    }

    fn seek(&mut self, timeline: Option<&str>, target: SeekTarget, now: Instant, sink: &mut dyn OutputSink) -> bool {
        let Some(name) = self.target_name(timeline) else {
            return false;
        };
        match self.registry.timeline_mut(&name) {
            Some(timeline) => {
                self.controller.seek(timeline, target, now, sink);
                true
            }
            None => false,
        }
    }

    fn sync_remote(&mut self, message: &PlaybackStateMessage, now: Instant) -> bool {
        match self.registry.timeline_mut(&message.name) {
            Some(timeline) => {
                self.controller
                    .sync_remote(timeline, message.position, message.is_playing, now);
                true
            }
            None => {
                tracing::debug!("Playback state for unknown timeline '{}' ignored", message.name);
                false
            }
        }
    }

    /// Replace the whole registry after validation.
    ///
    /// Timelines whose name survives keep their runtime id, position and
    /// play state, so their clocks carry on. New timelines start stopped.
    fn replace_state(&mut self, incoming: TimelineRegistry) -> bool {
        let mut incoming = match incoming.into_validated() {
            Ok(registry) => registry,
            Err(e) => {
                tracing::warn!("Rejected structural state: {}", e);
                return false;
            }
        };
        for timeline in incoming.timelines_mut() {
            match self.registry.timeline(&timeline.name) {
                Some(current) => {
                    timeline.id = current.id;
                    timeline.position = current.position;
                    timeline.is_playing = current.is_playing;
                }
                None => timeline.is_playing = false,
            }
        }
        self.registry = incoming;
        self.controller.prune(&self.registry);
        tracing::debug!("Structural state replaced, {} timeline(s)", self.registry.len());
        true
    }
}
