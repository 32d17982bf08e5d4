//! Daemon module for the Pomodoro service.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with state transitions and countdown logic
//! - `service`: Command dispatch and the countdown loop
//! - `ipc`: Unix socket server and request handling
//!
//! [`Daemon`] wires them together with the store, renderer and signals.

pub mod ipc;
pub mod service;
pub mod timer;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};

use crate::config::ServiceConfig;
use crate::notification::{NotificationRenderer, TextRenderer};
use crate::signal::{DeviceSignals, SignalEmitter};
use crate::sound::{resolve_sound, try_create_player, SoundPlayer};
use crate::store::{
    JsonFileStore, PomodoroRepository, PreferenceStore, SettingsRepository, TagsRepository,
};
use crate::types::Phase;

pub use ipc::{IpcError, IpcServer, Observers, RequestHandler};
pub use service::{Command, TimerService};
pub use timer::{EnginePorts, TimerEngine, TimerEvent};

/// The assembled service: engine, repositories and IPC front end.
pub struct Daemon {
    config: ServiceConfig,
    store: Arc<dyn PreferenceStore>,
    service: Arc<TimerService>,
    tags: Arc<TagsRepository>,
    observers: Observers,
    events: mpsc::UnboundedReceiver<TimerEvent>,
}

impl Daemon {
    /// Builds the daemon with the JSON file store and real audio.
    pub fn build(config: &ServiceConfig) -> Self {
        let store: Arc<dyn PreferenceStore> = Arc::new(JsonFileStore::new(&config.state_path));

        let player = if config.sound {
            try_create_player(false).map(|player| player as Arc<dyn SoundPlayer>)
        } else {
            tracing::info!("Sound disabled by config");
            None
        };
        let signals = DeviceSignals::new(player, resolve_sound(config.sound_file.as_deref()));

        Self::with_ports(config, store, Arc::new(TextRenderer), Arc::new(signals))
    }

    /// Builds the daemon around the given store and collaborators.
    pub fn with_ports(
        config: &ServiceConfig,
        store: Arc<dyn PreferenceStore>,
        renderer: Arc<dyn NotificationRenderer>,
        signals: Arc<dyn SignalEmitter>,
    ) -> Self {
        let settings = Arc::new(SettingsRepository::new(Arc::clone(&store)));
        let repository = Arc::new(PomodoroRepository::new(
            Arc::clone(&store),
            &settings.durations(),
        ));
        let tags = Arc::new(TagsRepository::new(Arc::clone(&store)));

        let state = repository.subscribe();
        let rest_interval = repository.subscribe_rest_interval();
        let options = settings.subscribe_options();
        let (event_tx, events) = mpsc::unbounded_channel();
        let engine = TimerEngine::new(
            EnginePorts {
                repository,
                settings,
                renderer,
                signals,
            },
            event_tx,
        );
        let observers = Observers {
            state,
            rest_interval,
            options,
            notification: engine.subscribe_notification(),
        };

        Self {
            config: config.clone(),
            store,
            service: Arc::new(TimerService::new(engine, config.tick_interval())),
            tags,
            observers,
            events,
        }
    }

    pub fn service(&self) -> Arc<TimerService> {
        Arc::clone(&self.service)
    }

    pub fn tags(&self) -> Arc<TagsRepository> {
        Arc::clone(&self.tags)
    }

    /// Serves requests until `close`, Ctrl-C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub async fn run(self) -> Result<()> {
        let server = IpcServer::new(&self.config.socket_path)?;
        tracing::info!("Listening on {:?}", server.socket_path());

        let handler = Arc::new(RequestHandler::new(
            Arc::clone(&self.service),
            Arc::clone(&self.tags),
            self.observers,
        ));
        let (journal_stop, stop_rx) = watch::channel(false);
        let journal = tokio::spawn(record_events(
            self.events,
            Arc::clone(&self.tags),
            stop_rx,
        ));
        let signals = tokio::spawn(shutdown_on_signal(Arc::clone(&self.service)));

        ipc::serve(&server, handler, self.service.subscribe_shutdown()).await;

        signals.abort();
        self.service.join_countdown().await;
        journal_stop.send_replace(true);
        if let Err(e) = journal.await {
            tracing::error!("Journal task failed: {}", e);
        }
        self.store.flush();
        tracing::info!("Daemon stopped");
        Ok(())
    }
}

/// Credits finished work phases to the focused tag.
///
/// Runs until the event channel closes or `stop` is raised; events already
/// queued when `stop` is raised are still recorded.
pub async fn record_events(
    mut events: mpsc::UnboundedReceiver<TimerEvent>,
    tags: Arc<TagsRepository>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => record_event(event, &tags),
                None => break,
            },
            _ = stop.changed() => {
                while let Ok(event) = events.try_recv() {
                    record_event(event, &tags);
                }
                break;
            }
        }
    }
}

fn record_event(event: TimerEvent, tags: &TagsRepository) {
    match event {
        TimerEvent::PhaseCompleted {
            phase: Phase::Work,
            seconds,
            completed_work_cycles,
        } => {
            let focus = tags.focus_task();
            tracing::info!(
                "Pomodoro #{} finished ({})",
                completed_work_cycles,
                focus.task_name
            );
            if focus.tag_id != 0 && !tags.credit_tag(focus.tag_id, u64::from(seconds)) {
                tracing::warn!("Focused tag {} no longer exists", focus.tag_id);
            }
        }
        TimerEvent::PhaseCompleted { phase, .. } => {
            tracing::info!("{} finished", phase.display_name());
        }
        other => tracing::debug!("{:?}", other),
    }
}

async fn shutdown_on_signal(service: Arc<TimerService>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    service.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::IpcClient;
    use crate::signal::MockSignalEmitter;
    use crate::store::MemoryStore;
    use crate::types::{IpcRequest, OperatingMode};
    use std::time::Duration;

    fn test_config(dir: &tempfile::TempDir) -> ServiceConfig {
        ServiceConfig {
            socket_path: dir.path().join("pomodoro.sock"),
            state_path: dir.path().join("state.json"),
            sound: false,
            ..ServiceConfig::default()
        }
    }

    fn test_daemon(config: &ServiceConfig) -> Daemon {
        Daemon::with_ports(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(TextRenderer),
            Arc::new(MockSignalEmitter::new()),
        )
    }

    mod journal_tests {
        use super::*;

        #[tokio::test]
        async fn test_work_completion_credits_focused_tag() {
            let tags = Arc::new(TagsRepository::new(Arc::new(MemoryStore::new())));
            let study = tags.insert_tag("Study").unwrap();
            tags.update_focus_task(study.id, Some("Chapter 3")).unwrap();

            let (tx, rx) = mpsc::unbounded_channel();
            tx.send(TimerEvent::PhaseCompleted {
                phase: Phase::Work,
                seconds: 1500,
                completed_work_cycles: 1,
            })
            .unwrap();
            tx.send(TimerEvent::PhaseCompleted {
                phase: Phase::ShortBreak,
                seconds: 300,
                completed_work_cycles: 1,
            })
            .unwrap();
            drop(tx);
            let (_stop_tx, stop) = watch::channel(false);

            record_events(rx, Arc::clone(&tags), stop).await;

            assert_eq!(tags.tags()[0].seconds, 1500);
        }

        #[tokio::test]
        async fn test_stop_still_records_queued_events() {
            let tags = Arc::new(TagsRepository::new(Arc::new(MemoryStore::new())));
            let study = tags.insert_tag("Study").unwrap();
            tags.update_focus_task(study.id, None).unwrap();

            let (tx, rx) = mpsc::unbounded_channel();
            let (stop_tx, stop) = watch::channel(false);
            tx.send(TimerEvent::PhaseCompleted {
                phase: Phase::Work,
                seconds: 60,
                completed_work_cycles: 1,
            })
            .unwrap();
            stop_tx.send_replace(true);

            tokio::time::timeout(
                Duration::from_secs(1),
                record_events(rx, Arc::clone(&tags), stop),
            )
            .await
            .expect("journal should stop while the sender is alive");

            assert_eq!(tags.tags()[0].seconds, 60);
            drop(tx);
        }

        #[tokio::test]
        async fn test_no_focused_tag_credits_nothing() {
            let tags = Arc::new(TagsRepository::new(Arc::new(MemoryStore::new())));
            tags.insert_tag("Study").unwrap();

            let (tx, rx) = mpsc::unbounded_channel();
            tx.send(TimerEvent::PhaseCompleted {
                phase: Phase::Work,
                seconds: 1500,
                completed_work_cycles: 1,
            })
            .unwrap();
            drop(tx);
            let (_stop_tx, stop) = watch::channel(false);

            record_events(rx, Arc::clone(&tags), stop).await;

            assert_eq!(tags.tags()[0].seconds, 0);
        }
    }

    mod daemon_tests {
        use super::*;

        #[tokio::test]
        async fn test_build_uses_file_store() {
            let dir = tempfile::tempdir().unwrap();
            let config = test_config(&dir);

            let daemon = Daemon::build(&config);
            daemon
                .service()
                .dispatch(Command::ChangeRestInterval(2))
                .await;
            daemon.store.flush();

            assert!(config.state_path.exists());
        }

        #[tokio::test]
        async fn test_shutdown_while_running_stops_daemon() {
            let dir = tempfile::tempdir().unwrap();
            let config = test_config(&dir);
            let daemon = test_daemon(&config);
            let service = daemon.service();
            let run = tokio::spawn(daemon.run());

            let client = IpcClient::with_socket_path(&config.socket_path);
            client.send(&IpcRequest::Start).await.unwrap();
            service.shutdown();

            tokio::time::timeout(Duration::from_secs(5), run)
                .await
                .expect("daemon should stop on shutdown signal")
                .unwrap()
                .unwrap();
            assert_eq!(service.status().await.mode, OperatingMode::Active);
        }

        #[tokio::test]
        async fn test_run_until_close() {
            let dir = tempfile::tempdir().unwrap();
            let config = test_config(&dir);
            let daemon = test_daemon(&config);
            let run = tokio::spawn(daemon.run());

            let client = IpcClient::with_socket_path(&config.socket_path);
            let started = client.send(&IpcRequest::Start).await.unwrap();
            assert_eq!(
                started.data.unwrap().status.unwrap().mode,
                OperatingMode::Active
            );

            client.send(&IpcRequest::Close).await.unwrap();

            tokio::time::timeout(Duration::from_secs(5), run)
                .await
                .expect("daemon should stop after close")
                .unwrap()
                .unwrap();
            assert!(!config.socket_path.exists());
        }
    }
}
