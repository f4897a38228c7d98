// SPDX-License-Identifier: MIT OR Apache-2.0
//! Service settings.
//!
//! Settings are stored as RON. Every field has a default, so a settings
//! file only needs to name what it changes.

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tether_timeline_core::{Format, StepUnit, TimelineSettings};

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Where snapshots are written
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputTarget {
    /// Standard output
    #[default]
    Stdout,
    /// A file, truncated on start
    File(PathBuf),
}

/// Output encoding and destination
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Encoding of each emitted message
    pub format: Format,
    /// Destination
    pub target: OutputTarget,
}

/// Playback service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Settings format version
    pub version: u32,
    /// Playback ticks per second
    pub tick_rate_hz: u32,
    /// Frame rate of timelines created by the service
    pub default_fps: u32,
    /// Granularity of fast-forward and fast-rewind
    pub step_unit: StepUnit,
    /// Registry state loaded at start-up
    pub state_file: Option<PathBuf>,
    /// Re-apply the state file when it changes on disk
    pub watch_state_file: bool,
    /// Output encoding and destination
    pub output: OutputSettings,
    /// Timeline started on boot
    pub autoplay: Option<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            tick_rate_hz: 60,
            default_fps: 60,
            step_unit: StepUnit::Second,
            state_file: None,
            watch_state_file: true,
            output: OutputSettings::default(),
            autoplay: None,
        }
    }
}

impl ServiceSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: ServiceSettings = ron::from_str(&content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Time between playback ticks. A zero rate falls back to one tick per
    /// second.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }

    /// Settings for timelines created by the service
    pub fn timeline_settings(&self) -> TimelineSettings {
        TimelineSettings {
            fps: self.default_fps.max(1),
            ..TimelineSettings::default()
        }
    }
}
