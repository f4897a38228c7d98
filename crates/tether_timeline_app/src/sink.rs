// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output sinks for playback emissions.
//!
//! Each emission is written as one line: a JSON document or a RON value,
//! tagged with its topic (`update` or `completed`). Output is fire and
//! forget; a failed write is logged and the emission dropped.

use crate::error::SinkError;
use crate::settings::{OutputSettings, OutputTarget};
use std::fs::File;
use std::io::{BufWriter, Write};
use tether_timeline_core::{CompletionNotice, Emission, Format, OutputSink, TimelineSnapshot};

/// Encode one emission as a single line, without the trailing newline
pub fn encode(emission: &Emission, format: Format) -> Result<String, SinkError> {
    let line = match format {
        Format::Json => serde_json::to_string(emission)?,
        Format::Ron => ron::to_string(emission)?,
    };
    Ok(line)
}

/// Sink writing encoded emissions to any writer
pub struct WriterSink<W: Write> {
    writer: W,
    format: Format,
    failures: usize,
}

impl<W: Write> WriterSink<W> {
    /// Create a sink over a writer
    pub fn new(writer: W, format: Format) -> Self {
        Self {
            writer,
            format,
            failures: 0,
        }
    }

    /// Number of emissions that could not be written
    pub fn failures(&self) -> usize {
        self.failures
    }

    fn write(&mut self, emission: &Emission) -> Result<(), SinkError> {
        let line = encode(emission, self.format)?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }

    fn emit(&mut self, emission: &Emission) {
        if let Err(e) = self.write(emission) {
            self.failures += 1;
            tracing::error!("Failed to write output: {e}");
        }
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn send_snapshot(&mut self, snapshot: &TimelineSnapshot) {
        self.emit(&Emission::Update(snapshot.clone()));
    }

    fn send_completed(&mut self, notice: &CompletionNotice) {
        self.emit(&Emission::Completed(notice.clone()));
    }
}

/// Boxed writer used by the service
pub type BoxedWriter = Box<dyn Write + Send>;

/// Open the sink described by the settings
pub fn open(settings: &OutputSettings) -> Result<WriterSink<BoxedWriter>, SinkError> {
    let writer: BoxedWriter = match &settings.target {
        OutputTarget::Stdout => Box::new(std::io::stdout()),
        OutputTarget::File(path) => {
            tracing::info!("Writing output to {}", path.display());
            Box::new(BufWriter::new(File::create(path)?))
        }
    };
    Ok(WriterSink::new(writer, settings.format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_timeline_core::TrackSnapshot;

    fn snapshot() -> TimelineSnapshot {
        TimelineSnapshot {
            name: "Show".into(),
            time: 2.5,
            position: 0.25,
            is_playing: true,
            tracks: vec![TrackSnapshot {
                name: "Dimmer".into(),
                value: Some(0.75),
                events: None,
                color: None,
            }],
        }
    }

    #[test]
    fn test_json_lines_are_tagged_by_topic() {
        let mut sink = WriterSink::new(Vec::new(), Format::Json);
        sink.send_snapshot(&snapshot());
        sink.send_completed(&CompletionNotice { name: "Show".into() });

        let output = String::from_utf8(sink.writer).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["topic"], "update");
        assert_eq!(lines[0]["payload"]["isPlaying"], true);
        assert_eq!(lines[0]["payload"]["tracks"][0]["value"], 0.75);
        assert!(lines[0]["payload"]["tracks"][0].get("events").is_none());
        assert_eq!(lines[1]["topic"], "completed");
        assert_eq!(lines[1]["payload"]["name"], "Show");
    }

    #[test]
    fn test_ron_output() {
        let mut sink = WriterSink::new(Vec::new(), Format::Ron);
        sink.send_completed(&CompletionNotice { name: "Show".into() });
        let output = String::from_utf8(sink.writer).unwrap();
        assert_eq!(output.lines().count(), 1);
        assert!(output.contains("completed"));
        assert!(output.contains("Show"));
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failures_are_counted() {
        let mut sink = WriterSink::new(Broken, Format::Json);
        sink.send_snapshot(&snapshot());
        sink.send_snapshot(&snapshot());
        assert_eq!(sink.failures(), 2);
    }
}
