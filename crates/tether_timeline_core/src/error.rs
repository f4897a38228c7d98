// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the timeline core.
//!
//! Only inbound data and persistence can fail. Mutations addressed at a
//! missing timeline, track, anchor or event are ignored rather than
//! reported as errors.

use crate::track::TrackMode;
use thiserror::Error;

/// A track record whose payload does not satisfy its mode
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackShapeError {
    /// The field matching `mode` is null or absent
    #[error("Track '{track}' is in {mode:?} mode but has no {mode:?} payload")]
    MissingPayload {
        /// Track name
        track: String,
        /// Declared mode
        mode: TrackMode,
    },

    /// A curve track needs at least two anchors to be evaluated
    #[error("Curve track '{track}' has {count} anchor(s), at least 2 are required")]
    TooFewAnchors {
        /// Track name
        track: String,
        /// Number of anchors found
        count: usize,
    },
}

/// Rejected inbound structural state
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Payload could not be decoded
    #[error("Malformed payload: {0}")]
    Decode(String),

    /// The timeline list is empty
    #[error("Timeline list is empty")]
    NoTimelines,

    /// Two timelines share a name
    #[error("Duplicate timeline name: {0}")]
    DuplicateTimeline(String),

    /// Two tracks of one timeline share a name
    #[error("Duplicate track name '{track}' in timeline '{timeline}'")]
    DuplicateTrack {
        /// Timeline name
        timeline: String,
        /// Track name
        track: String,
    },

    /// Duration must be finite and positive
    #[error("Timeline '{timeline}' has invalid duration {duration}")]
    InvalidDuration {
        /// Timeline name
        timeline: String,
        /// Offending duration
        duration: f64,
    },

    /// Position must be finite and within [0, 1]
    #[error("Timeline '{timeline}' has position {position} outside [0, 1]")]
    InvalidPosition {
        /// Timeline name
        timeline: String,
        /// Offending position
        position: f64,
    },

    /// Frame rate must be positive
    #[error("Timeline '{0}' has a frame rate of zero")]
    InvalidFps(String),

    /// `selectedTimeline` names no timeline
    #[error("Selected timeline '{0}' does not exist")]
    UnknownSelection(String),

    /// A track payload is malformed
    #[error(transparent)]
    Track(#[from] TrackShapeError),
}

/// Result type for validation
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Import/export failure
#[derive(Debug, Error)]
pub enum PersistError {
    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON decode error
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON encode error
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// Decoded state failed validation
    #[error("Invalid state: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for persistence
pub type PersistResult<T> = std::result::Result<T, PersistError>;
