// SPDX-License-Identifier: MIT OR Apache-2.0
//! The headless playback service.
//!
//! A [`Service`] owns one session and one output sink. The async
//! [`run`] loop feeds it three sources: the playback tick interval,
//! control lines from stdin, and changes to the state file. All of them
//! are handled on one task, so ticks never overlap with edits.

use crate::control;
use crate::error::ServiceResult;
use crate::file_watcher::{FileEvent, FileWatcher, FileWatcherConfig};
use crate::settings::ServiceSettings;
use crate::sink::WriterSink;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tether_timeline_core::{persistence, Command, OutputSink, Session, TimelineRegistry};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Session plus output sink
pub struct Service<S: OutputSink> {
    session: Session,
    sink: S,
    state_file: Option<PathBuf>,
}

impl<S: OutputSink> Service<S> {
    /// Create a service, loading the state file if the settings name one.
    ///
    /// A state file that does not exist yet is not an error; the service
    /// starts with a single default timeline.
    pub fn new(settings: &ServiceSettings, sink: S) -> ServiceResult<Self> {
        let registry = match &settings.state_file {
            Some(path) if path.exists() => persistence::load(path)?,
            Some(path) => {
                tracing::info!("State file {} does not exist, starting empty", path.display());
                TimelineRegistry::with_settings(settings.timeline_settings())
            }
            None => TimelineRegistry::with_settings(settings.timeline_settings()),
        };
        Ok(Self {
            session: Session::new(registry, settings.step_unit),
            sink,
            state_file: settings.state_file.clone(),
        })
    }

    /// The session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The output sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Path of the state file
    pub fn state_file(&self) -> Option<&Path> {
        self.state_file.as_deref()
    }

    /// Apply a command
    pub fn apply(&mut self, command: Command, now: Instant) -> bool {
        self.session.apply(command, now, &mut self.sink)
    }

    /// Advance the clocks
    pub fn tick(&mut self, now: Instant) -> usize {
        self.session.tick(now, &mut self.sink)
    }

    /// Handle one control line. Returns true if it changed anything.
    pub fn handle_line(&mut self, line: &str, now: Instant) -> bool {
        match control::decode_line(line) {
            Ok(Some(command)) => self.apply(command, now),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Rejected control message: {e}");
                false
            }
        }
    }

    /// Decode the state file's content and apply it as a structural
    /// replacement. Invalid content leaves the current state intact.
    pub fn apply_state_content(&mut self, path: &Path, content: &str, now: Instant) -> bool {
        match persistence::import(content, persistence::Format::from_path(path)) {
            Ok(registry) => {
                let applied = self.apply(Command::ReplaceState(registry), now);
                if applied {
                    tracing::info!("Reloaded state from {}", path.display());
                }
                applied
            }
            Err(e) => {
                tracing::warn!("Ignoring state file {}: {e}", path.display());
                false
            }
        }
    }

    /// Start the configured autoplay timeline
    pub fn autoplay(&mut self, name: &str, now: Instant) -> bool {
        let applied = self.apply(
            Command::Play {
                timeline: Some(name.to_string()),
                from: None,
            },
            now,
        );
        if !applied {
            tracing::warn!("Autoplay timeline '{name}' does not exist");
        }
        applied
    }

    async fn reload_state(&mut self, path: &Path, now: Instant) {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                self.apply_state_content(path, &content, now);
            }
            Err(e) => tracing::warn!("Failed to read state file {}: {e}", path.display()),
        }
    }
}

/// Process termination requests: Ctrl-C everywhere, SIGTERM on Unix
struct Shutdown {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Shutdown {
    /// Install the signal handlers. Must run inside the runtime.
    fn listen() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    /// Wait for the next termination request, returning its name
    #[cfg(unix)]
    async fn recv(&mut self) -> std::io::Result<&'static str> {
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|()| "Ctrl-C"),
            _ = self.terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> std::io::Result<&'static str> {
        tokio::signal::ctrl_c().await.map(|()| "Ctrl-C")
    }
}

/// Drive a service until Ctrl-C or SIGTERM is received.
///
/// Closing stdin stops reading control lines but playback continues.
pub async fn run<W: Write>(mut service: Service<WriterSink<W>>, settings: &ServiceSettings) -> ServiceResult<()> {
    let (file_tx, mut file_rx) = mpsc::unbounded_channel();
    let _watcher = match service.state_file().map(Path::to_path_buf) {
        Some(path) if settings.watch_state_file => {
            let mut watcher = FileWatcher::new(FileWatcherConfig::default(), file_tx)?;
            watcher.watch(&path)?;
            Some(watcher)
        }
        _ => None,
    };

    if let Some(name) = &settings.autoplay {
        service.autoplay(name, Instant::now());
    }

    let mut interval = tokio::time::interval(settings.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut shutdown = Shutdown::listen()?;

    tracing::info!(
        "Playback service running at {} Hz with {} timeline(s)",
        settings.tick_rate_hz,
        service.session().registry().len()
    );

    loop {
        tokio::select! {
            tick = interval.tick() => {
                service.tick(tick.into_std());
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        service.handle_line(&line, Instant::now());
                    }
                    Ok(None) => {
                        tracing::debug!("Control input closed");
                        stdin_open = false;
                    }
                    Err(e) => {
                        tracing::error!("Failed to read control input: {e}");
                        stdin_open = false;
                    }
                }
            }
            Some(event) = file_rx.recv() => match event {
                FileEvent::Changed(path) => service.reload_state(&path, Instant::now()).await,
                FileEvent::Deleted(path) => {
                    tracing::warn!("State file {} was deleted, keeping current state", path.display());
                }
                FileEvent::Error(e) => tracing::warn!("File watcher error: {e}"),
            },
            signal = shutdown.recv() => {
                tracing::info!("Received {}, shutting down", signal?);
                break;
            }
        }
    }

    let stopped = service.session().controller().playing_count();
    service.apply(Command::StopAll, Instant::now());
    tracing::debug!("Stopped {stopped} playing timeline(s)");

    let failures = service.sink().failures();
    if failures > 0 {
        tracing::warn!("{failures} emission(s) could not be written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tether_timeline_core::{persistence::Format, Emission, TimelineSettings};

    fn service() -> Service<Vec<Emission>> {
        Service::new(&ServiceSettings::default(), Vec::new()).unwrap()
    }

    fn temp_path(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("service-{}.{ext}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_new_service_has_default_timeline() {
        let mut settings = ServiceSettings::default();
        settings.default_fps = 25;
        let service = Service::new(&settings, Vec::new()).unwrap();
        let registry = service.session().registry();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.selected().unwrap().fps, 25);
    }

    #[test]
    fn test_missing_state_file_starts_empty() {
        let mut settings = ServiceSettings::default();
        settings.state_file = Some(temp_path("json"));
        let service = Service::new(&settings, Vec::new()).unwrap();
        assert_eq!(service.session().registry().len(), 1);
    }

    #[test]
    fn test_state_file_loaded_on_start() {
        let path = temp_path("ron");
        let mut registry = TimelineRegistry::new();
        registry.add_timeline(Some("Finale"), TimelineSettings::default());
        persistence::save(&registry, &path).unwrap();

        let mut settings = ServiceSettings::default();
        settings.state_file = Some(path.clone());
        let service = Service::new(&settings, Vec::new()).unwrap();
        assert!(service.session().registry().timeline("Finale").is_some());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_control_lines_drive_playback() {
        let mut service = service();
        let start = Instant::now();

        assert!(service.handle_line(r#"{"type": "play"}"#, start));
        assert_eq!(service.sink().len(), 1);

        assert_eq!(service.tick(start + Duration::from_secs(1)), 1);
        let position = service.session().registry().selected().unwrap().position;
        assert!((position - 0.1).abs() < 1e-9);

        assert!(service.handle_line(r#"{"type": "pause"}"#, start));
        assert_eq!(service.tick(start + Duration::from_secs(2)), 0);
    }

    #[test]
    fn test_bad_control_lines_are_ignored() {
        let mut service = service();
        let now = Instant::now();
        assert!(!service.handle_line("not json", now));
        assert!(!service.handle_line("", now));
        assert!(!service.handle_line(r#"{"type": "play", "timeline": "Ghost"}"#, now));
        assert!(service.sink().is_empty());
    }

    #[test]
    fn test_state_reload_keeps_previous_state_on_error() {
        let mut service = service();
        let now = Instant::now();
        let path = Path::new("state.json");

        assert!(!service.apply_state_content(path, r#"{"timelines": []}"#, now));
        assert_eq!(service.session().registry().len(), 1);

        let mut registry = TimelineRegistry::new();
        registry.add_timeline(Some("Encore"), TimelineSettings::default());
        let content = persistence::export(&registry, Format::Json).unwrap();
        assert!(service.apply_state_content(path, &content, now));
        assert_eq!(service.session().registry().selected_timeline(), Some("Encore"));
    }

    #[test]
    fn test_autoplay() {
        let mut service = service();
        let now = Instant::now();
        assert!(service.autoplay("Timeline 1", now));
        assert_eq!(service.session().controller().playing_count(), 1);
        assert!(!service.autoplay("Ghost", now));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_on_terminate_signal() {
        let mut shutdown = Shutdown::listen().unwrap();
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let signal = tokio::time::timeout(Duration::from_secs(5), shutdown.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal, "SIGTERM");
    }

    #[tokio::test]
    async fn test_reload_state_reads_file() {
        let path = temp_path("json");
        let mut registry = TimelineRegistry::new();
        registry.add_timeline(Some("Loaded"), TimelineSettings::default());
        persistence::save(&registry, &path).unwrap();

        let mut service = service();
        service.reload_state(&path, Instant::now()).await;
        assert!(service.session().registry().timeline("Loaded").is_some());
        let _ = std::fs::remove_file(&path);
    }
}
