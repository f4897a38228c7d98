// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions for timelines.
//!
//! A track carries exactly one payload, selected by its [`TrackMode`]:
//! a Bezier curve, a list of event triggers, or a color gradient. On the
//! wire a track is a flat record with three nullable fields; conversion to
//! and from [`TrackRecord`] enforces that the field matching `mode` is set.

use crate::bezier::Point;
use crate::error::TrackShapeError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Horizontal handle offset used for newly created anchors
pub const DEFAULT_HANDLE_OFFSET: f64 = 0.125;

/// Opaque identifier for an anchor point
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(pub String);

impl AnchorId {
    /// Create a new random anchor ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque identifier for an event trigger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Create a new random event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Track mode, the discriminator between payload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TrackMode {
    /// Bezier curve producing a scalar value
    #[default]
    Curve,
    /// Discrete data-carrying triggers
    Event,
    /// Piecewise-linear color gradient
    Color,
}

/// A curve control vertex with its two Bezier handles.
///
/// `control_1` shapes the segment ending at this anchor, `control_2` the
/// segment starting here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    /// Anchor ID
    #[serde(default)]
    pub id: AnchorId,
    /// Anchor position
    pub anchor: Point,
    /// Incoming handle
    pub control_1: Point,
    /// Outgoing handle
    pub control_2: Point,
}

impl AnchorPoint {
    /// Create an anchor with flat handles offset by [`DEFAULT_HANDLE_OFFSET`]
    pub fn new(anchor: Point) -> Self {
        Self::with_handles(
            anchor,
            Point::new(anchor.x - DEFAULT_HANDLE_OFFSET, anchor.y),
            Point::new(anchor.x + DEFAULT_HANDLE_OFFSET, anchor.y),
        )
    }

    /// Create an anchor with explicit handles
    pub fn with_handles(anchor: Point, control_1: Point, control_2: Point) -> Self {
        let mut point = Self {
            id: AnchorId::new(),
            anchor,
            control_1,
            control_2,
        };
        point.normalize();
        point
    }

    /// Clamp every coordinate to [0, 1] and keep each handle on its own
    /// side of the anchor.
    pub fn normalize(&mut self) {
        self.anchor = self.anchor.clamped();
        self.control_1 = self.control_1.clamped();
        self.control_2 = self.control_2.clamped();
        self.control_1.x = self.control_1.x.min(self.anchor.x);
        self.control_2.x = self.control_2.x.max(self.anchor.x);
    }

    /// Shift the anchor and both handles by the same offset
    fn translate(&mut self, to: Point) {
        let dx = to.x - self.anchor.x;
        let dy = to.y - self.anchor.y;
        self.anchor = to;
        self.control_1 = Point::new(self.control_1.x + dx, self.control_1.y + dy);
        self.control_2 = Point::new(self.control_2.x + dx, self.control_2.y + dy);
        self.normalize();
    }
}

/// The default curve: flat at 0.5 from x=0 to x=1
pub fn default_curve() -> Vec<AnchorPoint> {
    vec![
        AnchorPoint::new(Point::new(0.0, 0.5)),
        AnchorPoint::new(Point::new(1.0, 0.5)),
    ]
}

/// A discrete, data-carrying instant on a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTrigger {
    /// Event ID
    #[serde(default)]
    pub id: EventId,
    /// Normalized position on the track
    pub position: f64,
    /// Payload reported when the event fires
    pub data: String,
}

impl EventTrigger {
    /// Create a new event trigger
    pub fn new(position: f64, data: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            position: position.clamp(0.0, 1.0),
            data: data.into(),
        }
    }
}

/// RGBA color with float components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RgbaColor {
    /// Red
    pub r: f64,
    /// Green
    pub g: f64,
    /// Blue
    pub b: f64,
    /// Alpha
    pub a: f64,
}

impl RgbaColor {
    /// Create a new color
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Component-wise linear interpolation towards `other`
    pub fn lerp(&self, other: RgbaColor, t: f64) -> RgbaColor {
        use crate::bezier::lerp;
        RgbaColor {
            r: lerp(self.r, other.r, t),
            g: lerp(self.g, other.g, t),
            b: lerp(self.b, other.b, t),
            a: lerp(self.a, other.a, t),
        }
    }

    fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }
}

/// A color at a normalized position of a gradient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Normalized position
    pub position: f64,
    /// Color at this position
    pub color: RgbaColor,
}

impl ColorStop {
    /// Create a new color stop
    pub fn new(position: f64, color: RgbaColor) -> Self {
        Self {
            position: position.clamp(0.0, 1.0),
            color: color.clamped(),
        }
    }
}

/// How [`Track::copy_from`] combines the source payload with the target's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyMode {
    /// Keep the target's entries and add copies of the source's
    Append,
    /// Discard the target's entries first
    Replace,
}

/// Payload of a track, one variant per mode
#[derive(Debug, Clone, PartialEq)]
pub enum TrackData {
    /// Anchors sorted by `anchor.x`
    Curve(Vec<AnchorPoint>),
    /// Triggers sorted by position
    Event(Vec<EventTrigger>),
    /// Stops sorted by position
    Color(Vec<ColorStop>),
}

impl TrackData {
    /// Default payload for a mode
    pub fn default_for(mode: TrackMode) -> Self {
        match mode {
            TrackMode::Curve => Self::Curve(default_curve()),
            TrackMode::Event => Self::Event(Vec::new()),
            TrackMode::Color => Self::Color(Vec::new()),
        }
    }

    /// Mode matching this payload
    pub fn mode(&self) -> TrackMode {
        match self {
            Self::Curve(_) => TrackMode::Curve,
            Self::Event(_) => TrackMode::Event,
            Self::Color(_) => TrackMode::Color,
        }
    }
}

/// A named track of a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrackRecord", into = "TrackRecord")]
pub struct Track {
    /// Track name, unique within its timeline
    pub name: String,
    data: TrackData,
}

impl Track {
    /// Create a new curve track with the default flat curve
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_mode(name, TrackMode::Curve)
    }

    /// Create a new track with the default payload for `mode`
    pub fn with_mode(name: impl Into<String>, mode: TrackMode) -> Self {
        Self {
            name: name.into(),
            data: TrackData::default_for(mode),
        }
    }

    /// Get the track mode
    pub fn mode(&self) -> TrackMode {
        self.data.mode()
    }

    /// Get the payload
    pub fn data(&self) -> &TrackData {
        &self.data
    }

    /// Curve anchors, if this is a curve track
    pub fn curve(&self) -> Option<&[AnchorPoint]> {
        match &self.data {
            TrackData::Curve(anchors) => Some(anchors),
            _ => None,
        }
    }

    /// Event triggers, if this is an event track
    pub fn events(&self) -> Option<&[EventTrigger]> {
        match &self.data {
            TrackData::Event(events) => Some(events),
            _ => None,
        }
    }

    /// Color stops, if this is a color track
    pub fn colors(&self) -> Option<&[ColorStop]> {
        match &self.data {
            TrackData::Color(stops) => Some(stops),
            _ => None,
        }
    }

    /// Switch the track mode, resetting the payload to the mode's default.
    ///
    /// Returns false when the track already has this mode; its payload is
    /// left untouched in that case.
    pub fn set_mode(&mut self, mode: TrackMode) -> bool {
        if self.mode() == mode {
            return false;
        }
        self.data = TrackData::default_for(mode);
        true
    }

    /// Replace the curve. Requires curve mode and at least two anchors.
    pub fn set_curve(&mut self, mut anchors: Vec<AnchorPoint>) -> bool {
        if anchors.len() < 2 {
            return false;
        }
        let TrackData::Curve(curve) = &mut self.data else {
            return false;
        };
        anchors.iter_mut().for_each(AnchorPoint::normalize);
        sort_anchors(&mut anchors);
        *curve = anchors;
        true
    }

    /// Replace the event list. Requires event mode.
    pub fn set_events(&mut self, mut events: Vec<EventTrigger>) -> bool {
        let TrackData::Event(list) = &mut self.data else {
            return false;
        };
        for event in &mut events {
            event.position = event.position.clamp(0.0, 1.0);
        }
        sort_events(&mut events);
        *list = events;
        true
    }

    /// Replace the gradient. Requires color mode.
    pub fn set_colors(&mut self, stops: Vec<ColorStop>) -> bool {
        let TrackData::Color(list) = &mut self.data else {
            return false;
        };
        let mut stops: Vec<ColorStop> = stops
            .into_iter()
            .map(|s| ColorStop::new(s.position, s.color))
            .collect();
        sort_stops(&mut stops);
        *list = stops;
        true
    }

    /// Insert an anchor with default handles
    pub fn add_anchor(&mut self, at: Point) -> Option<AnchorId> {
        let TrackData::Curve(curve) = &mut self.data else {
            return None;
        };
        let anchor = AnchorPoint::new(at);
        let id = anchor.id.clone();
        curve.push(anchor);
        sort_anchors(curve);
        Some(id)
    }

    /// Remove an anchor. A curve never drops below two anchors.
    pub fn remove_anchor(&mut self, id: &AnchorId) -> bool {
        let TrackData::Curve(curve) = &mut self.data else {
            return false;
        };
        if curve.len() <= 2 {
            return false;
        }
        let before = curve.len();
        curve.retain(|a| &a.id != id);
        curve.len() != before
    }

    /// Move an anchor, carrying its handles along
    pub fn move_anchor(&mut self, id: &AnchorId, to: Point) -> bool {
        let TrackData::Curve(curve) = &mut self.data else {
            return false;
        };
        let Some(anchor) = curve.iter_mut().find(|a| &a.id == id) else {
            return false;
        };
        anchor.translate(to.clamped());
        sort_anchors(curve);
        true
    }

    /// Add an event trigger
    pub fn add_event(&mut self, position: f64, data: impl Into<String>) -> Option<EventId> {
        let TrackData::Event(events) = &mut self.data else {
            return None;
        };
        let event = EventTrigger::new(position, data);
        let id = event.id.clone();
        events.push(event);
        sort_events(events);
        Some(id)
    }

    /// Remove an event trigger
    pub fn remove_event(&mut self, id: &EventId) -> bool {
        let TrackData::Event(events) = &mut self.data else {
            return false;
        };
        let before = events.len();
        events.retain(|e| &e.id != id);
        events.len() != before
    }

    /// Move an event trigger to a new position
    pub fn move_event(&mut self, id: &EventId, position: f64) -> bool {
        let TrackData::Event(events) = &mut self.data else {
            return false;
        };
        let Some(event) = events.iter_mut().find(|e| &e.id == id) else {
            return false;
        };
        event.position = position.clamp(0.0, 1.0);
        sort_events(events);
        true
    }

    /// Add a color stop
    pub fn add_color_stop(&mut self, position: f64, color: RgbaColor) -> bool {
        let TrackData::Color(stops) = &mut self.data else {
            return false;
        };
        stops.push(ColorStop::new(position, color));
        sort_stops(stops);
        true
    }

    /// Remove the color stop at `index`
    pub fn remove_color_stop(&mut self, index: usize) -> bool {
        let TrackData::Color(stops) = &mut self.data else {
            return false;
        };
        if index >= stops.len() {
            return false;
        }
        stops.remove(index);
        true
    }

    /// Copy the payload of `source` into this track.
    ///
    /// Both tracks must have the same mode. Copied anchors and events get
    /// fresh ids, so nothing is shared between the two tracks.
    pub fn copy_from(&mut self, source: &Track, mode: CopyMode) -> bool {
        match (&mut self.data, &source.data) {
            (TrackData::Curve(dst), TrackData::Curve(src)) => {
                let copies = src.iter().map(|a| AnchorPoint {
                    id: AnchorId::new(),
                    ..a.clone()
                });
                match mode {
                    CopyMode::Replace => *dst = copies.collect(),
                    CopyMode::Append => dst.extend(copies),
                }
                sort_anchors(dst);
                true
            }
            (TrackData::Event(dst), TrackData::Event(src)) => {
                let copies = src.iter().map(|e| EventTrigger {
                    id: EventId::new(),
                    ..e.clone()
                });
                match mode {
                    CopyMode::Replace => *dst = copies.collect(),
                    CopyMode::Append => dst.extend(copies),
                }
                sort_events(dst);
                true
            }
            (TrackData::Color(dst), TrackData::Color(src)) => {
                match mode {
                    CopyMode::Replace => *dst = src.clone(),
                    CopyMode::Append => dst.extend(src.iter().copied()),
                }
                sort_stops(dst);
                true
            }
            _ => false,
        }
    }

    /// Check the payload invariants that inbound data must satisfy
    pub(crate) fn check_shape(&self) -> Result<(), TrackShapeError> {
        match &self.data {
            TrackData::Curve(anchors) if anchors.len() < 2 => Err(TrackShapeError::TooFewAnchors {
                track: self.name.clone(),
                count: anchors.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Re-clamp and re-sort the payload
    pub(crate) fn normalize(&mut self) {
        match &mut self.data {
            TrackData::Curve(anchors) => {
                anchors.iter_mut().for_each(AnchorPoint::normalize);
                sort_anchors(anchors);
            }
            TrackData::Event(events) => {
                for event in events.iter_mut() {
                    event.position = event.position.clamp(0.0, 1.0);
                }
                sort_events(events);
            }
            TrackData::Color(stops) => {
                for stop in stops.iter_mut() {
                    *stop = ColorStop::new(stop.position, stop.color);
                }
                sort_stops(stops);
            }
        }
    }
}

fn sort_anchors(anchors: &mut [AnchorPoint]) {
    anchors.sort_by(|a, b| a.anchor.x.total_cmp(&b.anchor.x));
}

fn sort_events(events: &mut [EventTrigger]) {
    events.sort_by(|a, b| a.position.total_cmp(&b.position));
}

fn sort_stops(stops: &mut [ColorStop]) {
    stops.sort_by(|a, b| a.position.total_cmp(&b.position));
}

/// Flat wire representation of a [`Track`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Track name
    pub name: String,
    /// Track mode
    pub mode: TrackMode,
    /// Curve payload, set in curve mode
    #[serde(default)]
    pub curve: Option<Vec<AnchorPoint>>,
    /// Event payload, set in event mode
    #[serde(default)]
    pub events: Option<Vec<EventTrigger>>,
    /// Color payload, set in color mode
    #[serde(default)]
    pub colors: Option<Vec<ColorStop>>,
}

impl TryFrom<TrackRecord> for Track {
    type Error = TrackShapeError;

    fn try_from(record: TrackRecord) -> Result<Self, Self::Error> {
        let data = match record.mode {
            TrackMode::Curve => record.curve.map(TrackData::Curve),
            TrackMode::Event => record.events.map(TrackData::Event),
            TrackMode::Color => record.colors.map(TrackData::Color),
        };
        let Some(data) = data else {
            return Err(TrackShapeError::MissingPayload {
                track: record.name,
                mode: record.mode,
            });
        };
        let mut track = Track {
            name: record.name,
            data,
        };
        track.normalize();
        Ok(track)
    }
}

impl From<Track> for TrackRecord {
    fn from(track: Track) -> Self {
        let mode = track.mode();
        let (curve, events, colors) = match track.data {
            TrackData::Curve(c) => (Some(c), None, None),
            TrackData::Event(e) => (None, Some(e), None),
            TrackData::Color(c) => (None, None, Some(c)),
        };
        Self {
            name: track.name,
            mode,
            curve,
            events,
            colors,
        }
    }
}
