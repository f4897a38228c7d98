// SPDX-License-Identifier: MIT OR Apache-2.0
//! Control messages read by the service.
//!
//! One JSON object per line, tagged by `type`, e.g.
//! `{"type": "play", "timeline": "Intro"}` or
//! `{"type": "seek", "target": "Forward"}`. Inbound playback state and
//! structural state use the `playbackState` and `replaceState` types.

use tether_timeline_core::{Command, ValidationError, ValidationResult};

/// Decode one control line. Blank lines and `#` comments yield `None`.
pub fn decode_line(line: &str) -> ValidationResult<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| ValidationError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_timeline_core::{SeekTarget, TrackMode, TrackRef};

    #[test]
    fn test_blank_and_comment_lines() {
        assert!(decode_line("").unwrap().is_none());
        assert!(decode_line("   ").unwrap().is_none());
        assert!(decode_line("# start the show").unwrap().is_none());
    }

    #[test]
    fn test_playback_commands() {
        assert_eq!(
            decode_line(r#"{"type": "play", "timeline": "Intro", "from": 0.5}"#).unwrap(),
            Some(Command::Play {
                timeline: Some("Intro".into()),
                from: Some(0.5)
            })
        );
        assert_eq!(
            decode_line(r#"{"type": "seek", "target": "Rewind"}"#).unwrap(),
            Some(Command::Seek {
                timeline: None,
                target: SeekTarget::Rewind
            })
        );
        assert_eq!(decode_line(r#"{"type": "stopAll"}"#).unwrap(), Some(Command::StopAll));
    }

    #[test]
    fn test_edit_command() {
        let command = decode_line(
            r#"{"type": "setTrackMode", "track": {"timeline": "Intro", "track": "Cues"}, "mode": "Color"}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            Some(Command::SetTrackMode {
                track: TrackRef::new("Intro", "Cues"),
                mode: TrackMode::Color
            })
        );
    }

    #[test]
    fn test_inbound_playback_state() {
        let command = decode_line(
            r#"{"type": "playbackState", "name": "Intro", "time": 1.0, "position": 0.1, "isPlaying": false}"#,
        )
        .unwrap();
        assert!(matches!(command, Some(Command::PlaybackState(m)) if m.name == "Intro"));
    }

    #[test]
    fn test_malformed_lines_are_rejected() {
        assert!(matches!(decode_line("{"), Err(ValidationError::Decode(_))));
        assert!(matches!(
            decode_line(r#"{"type": "explode"}"#),
            Err(ValidationError::Decode(_))
        ));
    }
}
