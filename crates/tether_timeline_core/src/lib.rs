// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline evaluation core for Tether Timeline.
//!
//! This crate models animation timelines and turns them into output:
//! - Curve tracks (chains of cubic Bezier segments)
//! - Event tracks (data-carrying triggers)
//! - Color tracks (linear gradients)
//!
//! ## Architecture
//!
//! The core is built on:
//! - Pure Bezier math and a stateless evaluator
//! - A registry that is the single writer of timeline structure
//! - Playback clocks driven by injected time
//! - A session that routes commands and inbound state to both
//!
//! Nothing here spawns threads or performs I/O apart from the file helpers
//! in [`persistence`].

pub mod bezier;
pub mod error;
pub mod evaluator;
pub mod persistence;
pub mod playback;
pub mod registry;
pub mod session;
pub mod timeline;
pub mod track;

pub use bezier::{cubic_bezier, find_t_for_x, Point};
pub use error::{PersistError, PersistResult, TrackShapeError, ValidationError, ValidationResult};
pub use evaluator::{evaluate, evaluate_at, CompletionNotice, EventWindow, TimelineSnapshot, TrackSnapshot};
pub use persistence::Format;
pub use playback::{Emission, OutputSink, PlayState, PlaybackClock, PlaybackController, SeekTarget, StepUnit};
pub use registry::{TimelineRegistry, TimelineSettings, TrackRef};
pub use session::{Command, PlaybackStateMessage, Session};
pub use timeline::{Timeline, TimelineId};
pub use track::{
    AnchorId, AnchorPoint, ColorStop, CopyMode, EventId, EventTrigger, RgbaColor, Track, TrackData, TrackMode,
};
