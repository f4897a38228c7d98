// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluation of timelines into snapshots.
//!
//! Evaluation is a pure function of a track and a position. Event tracks are
//! the exception in that they need a window rather than a single position:
//! the playback clock knows where the previous tick left off and passes an
//! [`EventWindow`] so every trigger fires exactly once.
//!
//! A malformed track never fails a snapshot; it reports no value instead.

use crate::bezier::{cubic_bezier, find_t_for_x, DEFAULT_PRECISION};
use crate::timeline::Timeline;
use crate::track::{AnchorPoint, ColorStop, EventTrigger, RgbaColor, Track, TrackData};
use serde::{Deserialize, Serialize};

/// Evaluated output of one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    /// Track name
    pub name: String,
    /// Curve value, for curve tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Data of the events fired since the previous snapshot, for event tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
    /// Gradient color, for color tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<RgbaColor>,
}

/// Evaluated output of all tracks of a timeline at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    /// Timeline name
    pub name: String,
    /// Playhead time in seconds
    pub time: f64,
    /// Normalized playhead position
    pub position: f64,
    /// Whether the timeline is playing
    pub is_playing: bool,
    /// Per-track output
    #[serde(default)]
    pub tracks: Vec<TrackSnapshot>,
}

/// Sent once when a non-looping timeline plays to its end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionNotice {
    /// Timeline name
    pub name: String,
}

/// Span of positions covered by one playback step.
///
/// The window is half-open, `(from, to]`, unless it opens a playback run,
/// in which case `from` itself is included. A window whose end lies before
/// its start has wrapped around the end of a looping timeline and covers
/// `(from, 1]` and `[0, to]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventWindow {
    /// Position before the step
    pub from: f64,
    /// Position after the step
    pub to: f64,
    /// Whether `from` is part of the window
    pub inclusive_start: bool,
}

impl EventWindow {
    /// Window for a step from `from` to `to`
    pub fn new(from: f64, to: f64) -> Self {
        Self {
            from,
            to,
            inclusive_start: false,
        }
    }

    /// Window for the first step of a playback run
    pub fn opening(from: f64, to: f64) -> Self {
        Self {
            from,
            to,
            inclusive_start: true,
        }
    }

    /// Whether the step crossed the end of the timeline
    pub fn wrapped(&self) -> bool {
        self.to < self.from
    }

    /// Whether a position lies inside the window
    pub fn contains(&self, position: f64) -> bool {
        let after_start = if self.inclusive_start {
            position >= self.from
        } else {
            position > self.from
        };
        if self.wrapped() {
            (after_start && position <= 1.0) || (position >= 0.0 && position <= self.to)
        } else {
            after_start && position <= self.to
        }
    }
}

/// Value of a curve at `position`.
///
/// Positions before the first anchor or after the last one take that
/// anchor's value. A position exactly on an anchor returns its value.
pub fn curve_value(anchors: &[AnchorPoint], position: f64) -> Option<f64> {
    let first = anchors.first()?;
    let last = anchors.last()?;

    if position <= first.anchor.x {
        return Some(first.anchor.y);
    }
    if position >= last.anchor.x {
        return Some(last.anchor.y);
    }

    let next_idx = anchors.iter().position(|a| a.anchor.x > position)?;
    let prev = anchors.get(next_idx.checked_sub(1)?)?;
    let next = &anchors[next_idx];

    if prev.anchor.x == position {
        return Some(prev.anchor.y);
    }
    if next.anchor.x - prev.anchor.x <= f64::EPSILON {
        return Some(next.anchor.y);
    }

    let t = find_t_for_x(
        prev.anchor.x,
        prev.control_2.x,
        next.control_1.x,
        next.anchor.x,
        position,
        DEFAULT_PRECISION,
    );
    Some(cubic_bezier(prev.anchor, prev.control_2, next.control_1, next.anchor, t).y)
}

/// Color of a gradient at `position`, clamped to the outermost stops
pub fn color_at(stops: &[ColorStop], position: f64) -> Option<RgbaColor> {
    let first = stops.first()?;
    let last = stops.last()?;

    if position <= first.position {
        return Some(first.color);
    }
    if position >= last.position {
        return Some(last.color);
    }

    let next_idx = stops.iter().position(|s| s.position > position)?;
    let prev = stops.get(next_idx.checked_sub(1)?)?;
    let next = &stops[next_idx];

    let span = next.position - prev.position;
    if span <= 0.0 {
        return Some(next.color);
    }
    Some(prev.color.lerp(next.color, (position - prev.position) / span))
}

/// Data of every trigger inside `window`, in track order
pub fn fired_events(events: &[EventTrigger], window: &EventWindow) -> Vec<String> {
    events
        .iter()
        .filter(|e| window.contains(e.position))
        .map(|e| e.data.clone())
        .collect()
}

/// Evaluate one track.
///
/// Event tracks report an empty list when no window is given, as for a
/// manual seek.
pub fn evaluate_track(track: &Track, position: f64, window: Option<&EventWindow>) -> TrackSnapshot {
    let mut snapshot = TrackSnapshot {
        name: track.name.clone(),
        value: None,
        events: None,
        color: None,
    };
    match track.data() {
        TrackData::Curve(anchors) => snapshot.value = curve_value(anchors, position),
        TrackData::Event(events) => {
            snapshot.events = Some(window.map(|w| fired_events(events, w)).unwrap_or_default());
        }
        TrackData::Color(stops) => snapshot.color = color_at(stops, position),
    }
    snapshot
}

/// Evaluate every track of a timeline at `position`.
///
/// The position is clamped to [0, 1] before evaluation; the snapshot reports
/// the clamped value.
pub fn evaluate_at(timeline: &Timeline, position: f64, window: Option<&EventWindow>) -> TimelineSnapshot {
    let position = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    };
    TimelineSnapshot {
        name: timeline.name.clone(),
        time: position * timeline.duration,
        position,
        is_playing: timeline.is_playing,
        tracks: timeline
            .tracks()
            .iter()
            .map(|track| evaluate_track(track, position, window))
            .collect(),
    }
}

/// Evaluate a timeline at its current position
pub fn evaluate(timeline: &Timeline, window: Option<&EventWindow>) -> TimelineSnapshot {
    evaluate_at(timeline, timeline.position, window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bezier::Point;
    use crate::track::{default_curve, TrackMode};

    fn flat_anchor(x: f64, y: f64) -> AnchorPoint {
        AnchorPoint::with_handles(
            Point::new(x, y),
            Point::new(x - 0.125, y),
            Point::new(x + 0.125, y),
        )
    }

    fn peak_curve() -> Vec<AnchorPoint> {
        vec![flat_anchor(0.0, 0.0), flat_anchor(0.5, 1.0), flat_anchor(1.0, 0.0)]
    }

    #[test]
    fn test_flat_default_curve() {
        let curve = default_curve();
        for i in 0..=100 {
            let pos = f64::from(i) / 100.0;
            let value = curve_value(&curve, pos).unwrap();
            assert!((value - 0.5).abs() <= DEFAULT_PRECISION, "{pos} -> {value}");
        }
    }

    #[test]
    fn test_curve_endpoints_are_exact() {
        let curve = vec![flat_anchor(0.0, 0.2), flat_anchor(1.0, 0.9)];
        assert_eq!(curve_value(&curve, 0.0), Some(0.2));
        assert_eq!(curve_value(&curve, 1.0), Some(0.9));
    }

    #[test]
    fn test_peak_curve() {
        let curve = peak_curve();
        let peak = curve_value(&curve, 0.5).unwrap();
        assert!((peak - 1.0).abs() < 1e-9);

        let quarter = curve_value(&curve, 0.25).unwrap();
        assert!(quarter > 0.0 && quarter < 1.0);
        // symmetric flat handles put the segment midpoint at (0.25, 0.5)
        assert!((quarter - 0.5).abs() < 0.01, "{quarter}");

        // reproducible
        assert_eq!(curve_value(&curve, 0.25), Some(quarter));
    }

    #[test]
    fn test_curve_is_symmetric_around_peak() {
        let curve = peak_curve();
        for i in 1..10 {
            let d = f64::from(i) / 20.0;
            let left = curve_value(&curve, 0.5 - d).unwrap();
            let right = curve_value(&curve, 0.5 + d).unwrap();
            assert!((left - right).abs() < 0.01, "{d}: {left} vs {right}");
        }
    }

    #[test]
    fn test_curve_outside_range_clamps_to_anchors() {
        let curve = vec![flat_anchor(0.2, 0.3), flat_anchor(0.8, 0.7)];
        assert_eq!(curve_value(&curve, 0.1), Some(0.3));
        assert_eq!(curve_value(&curve, 0.95), Some(0.7));
        assert_eq!(curve_value(&[], 0.5), None);
    }

    #[test]
    fn test_color_gradient() {
        let stops = vec![
            ColorStop::new(0.2, RgbaColor::new(1.0, 0.0, 0.0, 1.0)),
            ColorStop::new(0.6, RgbaColor::new(0.0, 0.0, 1.0, 0.0)),
        ];
        assert_eq!(color_at(&stops, 0.0), Some(stops[0].color));
        assert_eq!(color_at(&stops, 1.0), Some(stops[1].color));

        let mid = color_at(&stops, 0.4).unwrap();
        assert!((mid.r - 0.5).abs() < 1e-9);
        assert!((mid.b - 0.5).abs() < 1e-9);
        assert!((mid.a - 0.5).abs() < 1e-9);
        assert_eq!(color_at(&[], 0.5), None);
    }

    #[test]
    fn test_event_window_bounds() {
        let window = EventWindow::new(0.1, 0.3);
        assert!(!window.contains(0.1));
        assert!(window.contains(0.2));
        assert!(window.contains(0.3));
        assert!(!window.contains(0.6));

        let opening = EventWindow::opening(0.0, 0.01);
        assert!(opening.contains(0.0));

        let wrapped = EventWindow::new(0.9, 0.1);
        assert!(wrapped.wrapped());
        assert!(wrapped.contains(0.95));
        assert!(wrapped.contains(0.0));
        assert!(wrapped.contains(0.1));
        assert!(!wrapped.contains(0.5));
        assert!(!wrapped.contains(0.9));
    }

    #[test]
    fn test_events_fire_once_across_ticks() {
        let mut track = Track::with_mode("Cues", TrackMode::Event);
        track.add_event(0.2, "first");
        track.add_event(0.6, "second");
        let events = track.events().unwrap();

        assert_eq!(fired_events(events, &EventWindow::new(0.1, 0.3)), vec!["first"]);
        assert_eq!(fired_events(events, &EventWindow::new(0.3, 0.7)), vec!["second"]);
    }

    #[test]
    fn test_evaluate_snapshot() {
        let mut timeline = Timeline::new("Show", 10.0, 60, false);
        timeline.add_track(Some("Dimmer"));
        timeline.add_track(Some("Cues"));
        timeline.set_track_mode("Cues", TrackMode::Event);
        timeline.add_track(Some("Wash"));
        timeline.set_track_mode("Wash", TrackMode::Color);
        timeline.set_position(0.5);

        let snapshot = evaluate(&timeline, None);
        assert_eq!(snapshot.name, "Show");
        assert_eq!(snapshot.time, 5.0);
        assert_eq!(snapshot.tracks.len(), 3);
        assert!(snapshot.tracks[0].value.is_some());
        assert_eq!(snapshot.tracks[1].events, Some(Vec::new()));
        // empty gradient has no value
        assert_eq!(snapshot.tracks[2].color, None);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["isPlaying"], false);
        assert!(json["tracks"][0].get("events").is_none());
        assert!(json["tracks"][2].get("color").is_none());
    }

    #[test]
    fn test_evaluate_at_clamps_position() {
        let mut timeline = Timeline::new("Show", 4.0, 60, false);
        timeline.add_track(None);
        let snapshot = evaluate_at(&timeline, 1.5, None);
        assert_eq!(snapshot.position, 1.0);
        assert_eq!(snapshot.time, 4.0);
    }
}
