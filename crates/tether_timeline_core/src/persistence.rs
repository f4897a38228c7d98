// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export and import of the full registry state.
//!
//! State is written as JSON (the format the rest of the system exchanges)
//! or RON. Import is all-or-nothing: the decoded state is validated before
//! it is returned, and nothing is returned on failure.

use crate::error::PersistResult;
use crate::registry::TimelineRegistry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Encoding of exported state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Format {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Pretty-printed RON
    Ron,
}

impl Format {
    /// Pick a format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ron") => Self::Ron,
            _ => Self::Json,
        }
    }
}

/// Encode the registry
pub fn export(registry: &TimelineRegistry, format: Format) -> PersistResult<String> {
    let content = match format {
        Format::Json => serde_json::to_string_pretty(registry)?,
        Format::Ron => {
            let config = ron::ser::PrettyConfig::default()
                .struct_names(true)
                .enumerate_arrays(false);
            ron::ser::to_string_pretty(registry, config)?
        }
    };
    Ok(content)
}

/// Decode and validate a registry.
///
/// Imported timelines are stopped: play state only lives as long as the
/// clock driving it.
pub fn import(content: &str, format: Format) -> PersistResult<TimelineRegistry> {
    let registry: TimelineRegistry = match format {
        Format::Json => serde_json::from_str(content)?,
        Format::Ron => ron::from_str(content)?,
    };
    let mut registry = registry.into_validated()?;
    for timeline in registry.timelines_mut() {
        timeline.is_playing = false;
    }
    Ok(registry)
}

/// Load a registry from a file, picking the format from its extension
pub fn load(path: &Path) -> PersistResult<TimelineRegistry> {
    let content = std::fs::read_to_string(path)?;
    let registry = import(&content, Format::from_path(path))?;
    tracing::info!("Loaded {} timeline(s) from {}", registry.len(), path.display());
    Ok(registry)
}

/// Save a registry to a file, picking the format from its extension
pub fn save(registry: &TimelineRegistry, path: &Path) -> PersistResult<()> {
    let content = export(registry, Format::from_path(path))?;
    std::fs::write(path, content)?;
    tracing::debug!("Saved {} timeline(s) to {}", registry.len(), path.display());
    Ok(())
}
