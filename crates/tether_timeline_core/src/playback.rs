// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback clocks.
//!
//! Each playing timeline owns a [`PlaybackClock`] that advances its
//! position from wall-clock time. Clocks never run on their own: the host
//! calls [`PlaybackController::tick_all`] from a timer and passes the
//! current [`Instant`], which keeps every transition deterministic.
//!
//! Every position change produces a [`TimelineSnapshot`] for the output
//! sink. A non-looping timeline that reaches its end additionally produces
//! one [`CompletionNotice`].

use crate::evaluator::{evaluate, CompletionNotice, EventWindow, TimelineSnapshot};
use crate::registry::TimelineRegistry;
use crate::timeline::{Timeline, TimelineId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Consumer of playback output
pub trait OutputSink {
    /// Deliver an evaluated snapshot
    fn send_snapshot(&mut self, snapshot: &TimelineSnapshot);

    /// Deliver a completion notice
    fn send_completed(&mut self, notice: &CompletionNotice);
}

/// A single message produced by playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload", rename_all = "camelCase")]
pub enum Emission {
    /// Snapshot after a position change
    Update(TimelineSnapshot),
    /// Non-looping timeline reached its end
    Completed(CompletionNotice),
}

impl OutputSink for Vec<Emission> {
    fn send_snapshot(&mut self, snapshot: &TimelineSnapshot) {
        self.push(Emission::Update(snapshot.clone()));
    }

    fn send_completed(&mut self, notice: &CompletionNotice) {
        self.push(Emission::Completed(notice.clone()));
    }
}

/// Clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    /// Not advancing
    #[default]
    Stopped,
    /// Advancing on every tick
    Playing,
}

/// Granularity of fast-forward and fast-rewind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepUnit {
    /// One second of timeline time
    #[default]
    Second,
    /// One frame at the timeline's frame rate
    Frame,
}

/// Manual playhead movement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SeekTarget {
    /// Jump to position 0
    Start,
    /// Jump to position 1
    End,
    /// Step forward by one [`StepUnit`]
    Forward,
    /// Step back by one [`StepUnit`]
    Rewind,
    /// Jump to a normalized position
    Position(f64),
}

impl SeekTarget {
    /// Resolve to a normalized position on `timeline`
    pub fn resolve(&self, timeline: &Timeline, unit: StepUnit) -> f64 {
        match *self {
            Self::Start => 0.0,
            Self::End => 1.0,
            Self::Forward => step_position(timeline, 1.0, unit),
            Self::Rewind => step_position(timeline, -1.0, unit),
            Self::Position(position) => position,
        }
    }
}

/// Position one step away from the current one, snapped to the step grid
fn step_position(timeline: &Timeline, direction: f64, unit: StepUnit) -> f64 {
    let steps = match unit {
        StepUnit::Second => timeline.duration,
        StepUnit::Frame => timeline.frame_count() as f64,
    };
    if steps <= 0.0 {
        return timeline.position;
    }
    ((timeline.position * steps + direction).round() / steps).clamp(0.0, 1.0)
}

/// Playback state machine for one timeline
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    state: PlayState,
    last_updated_at: Option<Instant>,
    /// Next tick opens a run and includes its start position
    opening: bool,
}

impl PlaybackClock {
    /// Create a stopped clock
    pub fn new() -> Self {
        Self {
            state: PlayState::Stopped,
            last_updated_at: None,
            opening: false,
        }
    }

    /// Is the clock advancing
    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    /// Start playback, or seek if already playing.
    ///
    /// Starting evaluates immediately, so the first snapshot reflects the
    /// start position and any event sitting exactly on it.
    pub fn play(
        &mut self,
        timeline: &mut Timeline,
        from: Option<f64>,
        now: Instant,
        sink: &mut dyn OutputSink,
    ) {
        if self.is_playing() {
            if let Some(position) = from {
                self.seek(timeline, position, now, sink);
            } else {
                self.last_updated_at = Some(now);
            }
            return;
        }

        if let Some(position) = from {
            timeline.set_position(position);
        }
        self.state = PlayState::Playing;
        self.last_updated_at = Some(now);
        self.opening = true;
        timeline.is_playing = true;
        tracing::debug!("Playing timeline '{}' from {:.4}", timeline.name, timeline.position);

        self.tick(timeline, now, sink);
    }

    /// Stop advancing. Returns false if the clock was already stopped.
    pub fn pause(&mut self, timeline: &mut Timeline) -> bool {
        timeline.is_playing = false;
        if !self.is_playing() {
            return false;
        }
        self.halt();
        tracing::debug!("Paused timeline '{}' at {:.4}", timeline.name, timeline.position);
        true
    }

    fn halt(&mut self) {
        self.state = PlayState::Stopped;
        self.last_updated_at = None;
        self.opening = false;
    }

    /// Advance the position by the time elapsed since the previous update.
    ///
    /// Returns true if a snapshot was emitted, which happens on every tick
    /// while playing.
    pub fn tick(&mut self, timeline: &mut Timeline, now: Instant, sink: &mut dyn OutputSink) -> bool {
        if !self.is_playing() {
            return false;
        }

        let elapsed = self
            .last_updated_at
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        let advance = if timeline.duration > 0.0 {
            elapsed / timeline.duration
        } else {
            0.0
        };

        let previous = timeline.position;
        let next = previous + advance;
        let mut completed = false;

        let window = if timeline.loop_playback {
            timeline.set_position(next.rem_euclid(1.0));
            if advance >= 1.0 {
                // a whole cycle or more went by, every trigger fires once
                EventWindow::opening(0.0, 1.0)
            } else {
                self.window(previous, timeline.position)
            }
        } else {
            completed = next >= 1.0;
            timeline.set_position(next.min(1.0));
            self.window(previous, timeline.position)
        };
        self.last_updated_at = Some(now);
        self.opening = false;

        if completed {
            self.halt();
            timeline.is_playing = false;
        }

        sink.send_snapshot(&evaluate(timeline, Some(&window)));

        if completed {
            tracing::info!("Timeline '{}' completed", timeline.name);
            sink.send_completed(&CompletionNotice {
                name: timeline.name.clone(),
            });
        }
        true
    }

    fn window(&self, from: f64, to: f64) -> EventWindow {
        if self.opening {
            EventWindow::opening(from, to)
        } else {
            EventWindow::new(from, to)
        }
    }

    /// Move the playhead without changing the play state.
    ///
    /// Events are not reported for a jump. While playing, the next tick
    /// continues from the new position and includes it.
    pub fn seek(&mut self, timeline: &mut Timeline, position: f64, now: Instant, sink: &mut dyn OutputSink) {
        timeline.set_position(position);
        if self.is_playing() {
            self.last_updated_at = Some(now);
            self.opening = true;
        }
        sink.send_snapshot(&evaluate(timeline, None));
    }

    /// Adopt externally reported playback state, replacing the local one
    pub fn sync_remote(&mut self, timeline: &mut Timeline, position: f64, is_playing: bool, now: Instant) {
        timeline.set_position(position);
        timeline.is_playing = is_playing;
        if is_playing {
            if !self.is_playing() {
                self.state = PlayState::Playing;
                self.opening = true;
            }
            self.last_updated_at = Some(now);
        } else {
            self.halt();
        }
    }
}

/// Set of playback clocks keyed by timeline
#[derive(Debug, Default)]
pub struct PlaybackController {
    clocks: IndexMap<TimelineId, PlaybackClock>,
    /// Granularity of fast-forward and fast-rewind
    pub step_unit: StepUnit,
}

impl PlaybackController {
    /// Create a controller with no clocks
    pub fn new(step_unit: StepUnit) -> Self {
        Self {
            clocks: IndexMap::new(),
            step_unit,
        }
    }

    fn clock_mut(&mut self, id: TimelineId) -> &mut PlaybackClock {
        self.clocks.entry(id).or_default()
    }

    /// Get the clock of a timeline, if one exists
    pub fn clock(&self, id: TimelineId) -> Option<&PlaybackClock> {
        self.clocks.get(&id)
    }

    /// Is the timeline's clock running
    pub fn is_playing(&self, id: TimelineId) -> bool {
        self.clocks.get(&id).is_some_and(PlaybackClock::is_playing)
    }

    /// Number of running clocks
    pub fn playing_count(&self) -> usize {
        self.clocks.values().filter(|c| c.is_playing()).count()
    }

    /// Start or seek playback of a timeline
    pub fn play(&mut self, timeline: &mut Timeline, from: Option<f64>, now: Instant, sink: &mut dyn OutputSink) {
        self.clock_mut(timeline.id).play(timeline, from, now, sink);
    }

    /// Pause a timeline
    pub fn pause(&mut self, timeline: &mut Timeline) -> bool {
        match self.clocks.get_mut(&timeline.id) {
            Some(clock) => clock.pause(timeline),
            None => {
                timeline.is_playing = false;
                false
            }
        }
    }

    /// Cancel the clock of a timeline. Used when the timeline goes away.
    pub fn stop(&mut self, id: TimelineId) -> bool {
        self.clocks.shift_remove(&id).is_some_and(|c| c.is_playing())
    }

    /// Pause every timeline in the registry and drop all clocks
    pub fn stop_all(&mut self, registry: &mut TimelineRegistry) {
        for timeline in registry.timelines_mut() {
            timeline.is_playing = false;
        }
        self.clocks.clear();
    }

    /// Move a timeline's playhead
    pub fn seek(&mut self, timeline: &mut Timeline, target: SeekTarget, now: Instant, sink: &mut dyn OutputSink) {
        let position = target.resolve(timeline, self.step_unit);
        self.clock_mut(timeline.id).seek(timeline, position, now, sink);
    }

    /// Adopt externally reported playback state
    pub fn sync_remote(&mut self, timeline: &mut Timeline, position: f64, is_playing: bool, now: Instant) {
        self.clock_mut(timeline.id)
            .sync_remote(timeline, position, is_playing, now);
    }

    /// Advance every running clock. Returns the number of snapshots emitted.
    ///
    /// Clocks whose timeline no longer exists are dropped.
    pub fn tick_all(&mut self, registry: &mut TimelineRegistry, now: Instant, sink: &mut dyn OutputSink) -> usize {
        self.prune(registry);
        let mut emitted = 0;
        for (id, clock) in self.clocks.iter_mut() {
            if !clock.is_playing() {
                continue;
            }
            if let Some(timeline) = registry.timeline_by_id_mut(*id) {
                if clock.tick(timeline, now, sink) {
                    emitted += 1;
                }
            }
        }
        emitted
    }

    /// Drop clocks whose timeline no longer exists
    pub fn prune(&mut self, registry: &TimelineRegistry) {
        self.clocks.retain(|id, _| registry.timeline_by_id(*id).is_some());
    }
}
