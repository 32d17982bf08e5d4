//! IPC server for the Pomodoro service.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer, settings and journal commands
//! - Accept loop that runs until shutdown

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{timeout, Duration};

use crate::notification::NotificationSurface;
use crate::store::TagsRepository;
use crate::types::{
    DurationParams, EngineState, EngineStatus, IpcRequest, IpcResponse, OptionParams, Options,
    Phase, ResponseData,
};

use super::service::{Command, TimerService};

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
pub const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// The peer closed the connection without sending anything
    #[error("Connection closed by client")]
    Closed,

    /// The request is not valid JSON for any command
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Applies a read timeout to prevent blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest, IpcError> {
        // One spare byte detects oversized requests.
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE + 1];

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string())),
            Err(_) => return Err(IpcError::Timeout),
        };

        if n == 0 {
            return Err(IpcError::Closed);
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge);
        }

        serde_json::from_slice(&buffer[..n]).map_err(|e| IpcError::InvalidRequest(e.to_string()))
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// Observers
// ============================================================================

/// Last-value receivers the handler reads status from.
#[derive(Clone)]
pub struct Observers {
    pub state: watch::Receiver<EngineState>,
    pub rest_interval: watch::Receiver<u32>,
    pub options: watch::Receiver<Options>,
    pub notification: watch::Receiver<NotificationSurface>,
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the timer service and the
/// journal repository.
pub struct RequestHandler {
    service: Arc<TimerService>,
    tags: Arc<TagsRepository>,
    observers: Observers,
}

impl RequestHandler {
    pub fn new(service: Arc<TimerService>, tags: Arc<TagsRepository>, observers: Observers) -> Self {
        Self {
            service,
            tags,
            observers,
        }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start => self.run(Command::Start, "Timer started").await,
            IpcRequest::Resume => self.run(Command::Resume, "Timer resumed").await,
            IpcRequest::Pause => self.run(Command::Pause, "Timer paused").await,
            IpcRequest::Switch => self.handle_switch().await,
            IpcRequest::Reset => self.run(Command::Reset, "Timer reset").await,
            IpcRequest::Close => self.run(Command::Close, "Service closing").await,
            IpcRequest::ChangePhase { phase } => self.handle_change_phase(&phase).await,
            IpcRequest::ChangeRestInterval { interval } => {
                let status = self
                    .service
                    .dispatch(Command::ChangeRestInterval(interval))
                    .await;
                let message = format!("Rest interval set to {}", status.rest_interval);
                self.with_status(message, status)
            }
            IpcRequest::RefreshNotification => {
                self.run(Command::RefreshNotification, "Notification refreshed")
                    .await
            }
            IpcRequest::Status => self.handle_status().await,
            IpcRequest::SetDurations { params } => self.handle_set_durations(params).await,
            IpcRequest::SetOptions { params } => self.handle_set_options(params).await,
            IpcRequest::AddTag { name } => self.handle_add_tag(&name),
            IpcRequest::RemoveTag { id } => self.handle_remove_tag(id),
            IpcRequest::ListTags => self.handle_list_tags(),
            IpcRequest::SetFocusTask { tag_id, task_name } => {
                self.handle_set_focus_task(tag_id, task_name.as_deref())
            }
            IpcRequest::Unknown => {
                tracing::warn!("Ignoring unrecognized command");
                IpcResponse::error("Unrecognized command")
            }
        }
    }

    async fn run(&self, command: Command, message: &str) -> IpcResponse {
        let status = self.service.dispatch(command).await;
        self.with_status(message, status)
    }

    fn with_status(&self, message: impl Into<String>, status: EngineStatus) -> IpcResponse {
        IpcResponse::success(
            message,
            Some(ResponseData {
                status: Some(status),
                notification: Some(self.observers.notification.borrow().clone()),
                ..Default::default()
            }),
        )
    }

    async fn handle_switch(&self) -> IpcResponse {
        let status = self.service.dispatch(Command::Switch).await;
        let message = if status.mode.is_active() {
            "Timer started"
        } else {
            "Timer paused"
        };
        self.with_status(message, status)
    }

    async fn handle_change_phase(&self, name: &str) -> IpcResponse {
        let phase: Phase = match name.parse() {
            Ok(phase) => phase,
            Err(e) => {
                tracing::warn!("Ignoring change_phase: {}", e);
                return IpcResponse::error(e.to_string());
            }
        };
        let status = self.service.dispatch(Command::ChangePhase(phase)).await;
        self.with_status(format!("Phase set to {}", phase.display_name()), status)
    }

    async fn handle_status(&self) -> IpcResponse {
        let state = *self.observers.state.borrow();
        let cycles = self.service.status().await.completed_work_cycles;
        let (durations, _) = self.service.settings().await;

        IpcResponse::success(
            "",
            Some(ResponseData {
                status: Some(EngineStatus {
                    rest_interval: *self.observers.rest_interval.borrow(),
                    ..EngineStatus::from_state(&state, cycles)
                }),
                notification: Some(self.observers.notification.borrow().clone()),
                durations: Some(durations),
                options: Some(*self.observers.options.borrow()),
                tags: None,
                focus_task: Some(self.tags.focus_task()),
            }),
        )
    }

    async fn handle_set_durations(&self, params: DurationParams) -> IpcResponse {
        let status = self.service.dispatch(Command::SetDurations(params)).await;
        let (durations, _) = self.service.settings().await;

        IpcResponse::success(
            "Durations updated",
            Some(ResponseData {
                status: Some(status),
                durations: Some(durations),
                ..Default::default()
            }),
        )
    }

    async fn handle_set_options(&self, params: OptionParams) -> IpcResponse {
        self.service.dispatch(Command::SetOptions(params)).await;
        let (_, options) = self.service.settings().await;

        IpcResponse::success(
            "Options updated",
            Some(ResponseData {
                options: Some(options),
                ..Default::default()
            }),
        )
    }

    fn handle_add_tag(&self, name: &str) -> IpcResponse {
        match self.tags.insert_tag(name) {
            Some(tag) => IpcResponse::success(
                format!("Tag '{}' added", tag.name),
                Some(ResponseData {
                    tags: Some(vec![tag]),
                    ..Default::default()
                }),
            ),
            None => IpcResponse::error(format!("Tag '{}' is blank or already exists", name.trim())),
        }
    }

    fn handle_remove_tag(&self, id: u32) -> IpcResponse {
        if self.tags.delete_tag(id) {
            IpcResponse::success(format!("Tag {} removed", id), None)
        } else {
            IpcResponse::error(format!("No tag with id {}", id))
        }
    }

    fn handle_list_tags(&self) -> IpcResponse {
        IpcResponse::success(
            "",
            Some(ResponseData {
                tags: Some(self.tags.tags()),
                focus_task: Some(self.tags.focus_task()),
                ..Default::default()
            }),
        )
    }

    fn handle_set_focus_task(&self, tag_id: u32, task_name: Option<&str>) -> IpcResponse {
        match self.tags.update_focus_task(tag_id, task_name) {
            Some(focus) => IpcResponse::success(
                format!("Focusing on {} ({})", focus.task_name, focus.tag_name),
                Some(ResponseData {
                    focus_task: Some(focus),
                    ..Default::default()
                }),
            ),
            None => IpcResponse::error(format!("No tag with id {}", tag_id)),
        }
    }
}

// ============================================================================
// Accept loop
// ============================================================================

/// Serves one connection: a single request and its response.
pub async fn handle_connection(mut stream: UnixStream, handler: &RequestHandler) {
    let response = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => {
            tracing::debug!("Received request: {:?}", request);
            handler.handle(request).await
        }
        Err(IpcError::Closed) => return,
        Err(e) => {
            tracing::warn!("Bad request: {}", e);
            IpcResponse::error(e.to_string())
        }
    };

    if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
        tracing::warn!("Failed to send response: {:#}", e);
    }
}

/// Accepts connections until `shutdown` turns true, then waits for the
/// connections in flight.
pub async fn serve(
    server: &IpcServer,
    handler: Arc<RequestHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();

    while !*shutdown.borrow() {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = Arc::clone(&handler);
                    connections.spawn(async move {
                        handle_connection(stream, &handler).await;
                    });
                }
                Err(e) => tracing::warn!("{:#}", e),
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("Connection task failed: {}", e);
                }
            }
        }
    }

    while let Some(joined) = connections.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Connection task failed: {}", e);
        }
    }
    tracing::info!("IPC server stopped");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::service::DEFAULT_TICK_INTERVAL;
    use crate::daemon::timer::{EnginePorts, TimerEngine};
    use crate::notification::{NotificationAction, TextRenderer};
    use crate::signal::MockSignalEmitter;
    use crate::store::{MemoryStore, PomodoroRepository, PreferenceStore, SettingsRepository};
    use crate::types::OperatingMode;
    use tokio::sync::mpsc;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn socket_in(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("test.sock")
    }

    fn create_handler() -> RequestHandler {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryStore::new());
        let settings = Arc::new(SettingsRepository::new(store.clone()));
        let repository = Arc::new(PomodoroRepository::new(store.clone(), &settings.durations()));
        let tags = Arc::new(TagsRepository::new(store));
        let (tx, _rx) = mpsc::unbounded_channel();

        let state = repository.subscribe();
        let rest_interval = repository.subscribe_rest_interval();
        let options = settings.subscribe_options();
        let engine = TimerEngine::new(
            EnginePorts {
                repository,
                settings,
                renderer: Arc::new(TextRenderer),
                signals: Arc::new(MockSignalEmitter::new()),
            },
            tx,
        );
        let observers = Observers {
            state,
            rest_interval,
            options,
            notification: engine.subscribe_notification(),
        };
        let service = Arc::new(TimerService::new(engine, DEFAULT_TICK_INTERVAL));
        RequestHandler::new(service, tags, observers)
    }

    // ------------------------------------------------------------------------
    // IpcServer Tests
    // ------------------------------------------------------------------------

    mod ipc_server_tests {
        use super::*;

        #[tokio::test]
        async fn test_server_removes_existing_socket() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = socket_in(&dir);
            std::fs::write(&socket_path, "dummy").unwrap();

            let server = IpcServer::new(&socket_path);
            assert!(server.is_ok());
        }

        #[tokio::test]
        async fn test_server_creates_parent_directory() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("subdir").join("test.sock");

            let server = IpcServer::new(&socket_path);
            assert!(server.is_ok());
            assert!(socket_path.parent().unwrap().exists());
        }

        #[tokio::test]
        async fn test_receive_request_change_phase() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = socket_in(&dir);
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let request = r#"{"command":"change_phase","phase":"rest"}"#;
                stream.write_all(request.as_bytes()).await.unwrap();
                stream.flush().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await.unwrap();
            match request {
                IpcRequest::ChangePhase { phase } => assert_eq!(phase, "rest"),
                other => panic!("Expected ChangePhase, got {:?}", other),
            }

            client_handle.await.unwrap();
        }

        #[tokio::test]
        async fn test_receive_request_invalid_json() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = socket_in(&dir);
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(b"not valid json").await.unwrap();
                stream.flush().await.unwrap();
                stream
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await;
            assert!(matches!(request, Err(IpcError::InvalidRequest(_))));

            drop(client_handle.await.unwrap());
        }

        #[tokio::test]
        async fn test_receive_request_too_large() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = socket_in(&dir);
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client_handle = tokio::spawn(async move {
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let payload = format!(
                    r#"{{"command":"add_tag","name":"{}"}}"#,
                    "x".repeat(MAX_REQUEST_SIZE)
                );
                stream.write_all(payload.as_bytes()).await.unwrap();
                stream
            });

            let mut stream = server.accept().await.unwrap();
            // Let the whole payload land in the socket buffer.
            let client = client_handle.await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await;
            assert!(matches!(request, Err(IpcError::RequestTooLarge)));
            drop(client);
        }

        #[tokio::test]
        async fn test_server_drop_cleanup() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = socket_in(&dir);

            {
                let server = IpcServer::new(&socket_path).unwrap();
                assert!(socket_path.exists());
                assert_eq!(server.socket_path(), socket_path);
            }

            assert!(!socket_path.exists());
        }
    }

    // ------------------------------------------------------------------------
    // RequestHandler Tests
    // ------------------------------------------------------------------------

    mod request_handler_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_handle_status() {
            let handler = create_handler();

            let response = handler.handle(IpcRequest::Status).await;

            assert!(response.is_success());
            let data = response.data.unwrap();
            let status = data.status.unwrap();
            assert_eq!(status.mode, OperatingMode::Stopped);
            assert_eq!(status.remaining_seconds, 25 * 60);
            assert_eq!(status.time_text, "25:00");
            assert_eq!(data.durations.unwrap().work, 25);
            assert_eq!(data.focus_task.unwrap().task_name, "Brainstorming");
            assert!(data
                .notification
                .unwrap()
                .has_action(NotificationAction::Start));
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_status_reports_rest_interval_stream() {
            let handler = create_handler();
            let mut rest_interval = handler.observers.rest_interval.clone();

            handler
                .handle(IpcRequest::ChangeRestInterval { interval: 7 })
                .await;

            assert!(rest_interval.has_changed().unwrap());
            assert_eq!(*rest_interval.borrow_and_update(), 7);
            let status = handler.handle(IpcRequest::Status).await;
            assert_eq!(status.data.unwrap().status.unwrap().rest_interval, 7);
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_start_and_pause() {
            let handler = create_handler();

            let response = handler.handle(IpcRequest::Start).await;
            assert_eq!(response.message, "Timer started");
            let data = response.data.unwrap();
            assert_eq!(data.status.unwrap().mode, OperatingMode::Active);
            assert_eq!(
                data.notification.unwrap().actions,
                vec![NotificationAction::Pause]
            );

            let response = handler.handle(IpcRequest::Pause).await;
            assert_eq!(
                response.data.unwrap().status.unwrap().mode,
                OperatingMode::Paused
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_change_phase_invalid_name() {
            let handler = create_handler();

            let response = handler
                .handle(IpcRequest::ChangePhase {
                    phase: "BOGUS".to_string(),
                })
                .await;

            assert!(!response.is_success());
            let status = handler.handle(IpcRequest::Status).await;
            assert_eq!(
                status.data.unwrap().status.unwrap().chosen_phase,
                Phase::Work
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_change_phase_alias() {
            let handler = create_handler();
            let response = handler
                .handle(IpcRequest::ChangePhase {
                    phase: "break".to_string(),
                })
                .await;

            assert_eq!(response.message, "Phase set to Break");
            let status = response.data.unwrap().status.unwrap();
            assert_eq!(status.current_phase, Phase::ShortBreak);
            assert_eq!(status.remaining_seconds, 5 * 60);
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_unknown_command() {
            let handler = create_handler();
            let response = handler.handle(IpcRequest::Unknown).await;
            assert_eq!(response.status, "error");
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_set_durations_partial() {
            let handler = create_handler();

            let response = handler
                .handle(IpcRequest::SetDurations {
                    params: DurationParams {
                        short_break: Some(0),
                        ..Default::default()
                    },
                })
                .await;

            let durations = response.data.unwrap().durations.unwrap();
            assert_eq!(durations.work, 25);
            assert_eq!(durations.short_break, 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_set_options_partial() {
            let handler = create_handler();

            let response = handler
                .handle(IpcRequest::SetOptions {
                    params: OptionParams {
                        vibration: Some(false),
                        ..Default::default()
                    },
                })
                .await;

            let options = response.data.unwrap().options.unwrap();
            assert!(!options.vibration);
            assert!(options.notification_sound);

            let status = handler.handle(IpcRequest::Status).await;
            assert!(!status.data.unwrap().options.unwrap().vibration);
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_tags_flow() {
            let handler = create_handler();

            let added = handler
                .handle(IpcRequest::AddTag {
                    name: "Study".to_string(),
                })
                .await;
            assert!(added.is_success());
            let id = added.data.unwrap().tags.unwrap()[0].id;

            let duplicate = handler
                .handle(IpcRequest::AddTag {
                    name: "Study".to_string(),
                })
                .await;
            assert!(!duplicate.is_success());

            let focus = handler
                .handle(IpcRequest::SetFocusTask {
                    tag_id: id,
                    task_name: Some("Flashcards".to_string()),
                })
                .await;
            assert_eq!(focus.data.unwrap().focus_task.unwrap().tag_name, "Study");

            let listed = handler.handle(IpcRequest::ListTags).await;
            assert_eq!(listed.data.unwrap().tags.unwrap().len(), 1);

            assert!(handler
                .handle(IpcRequest::RemoveTag { id })
                .await
                .is_success());
            assert!(!handler
                .handle(IpcRequest::RemoveTag { id })
                .await
                .is_success());
        }

        #[tokio::test(start_paused = true)]
        async fn test_handle_close() {
            let handler = create_handler();
            let response = handler.handle(IpcRequest::Close).await;
            assert!(response.is_success());
            assert!(handler.service.is_shutting_down());
        }
    }

    // ------------------------------------------------------------------------
    // Accept loop Tests
    // ------------------------------------------------------------------------

    mod serve_tests {
        use super::*;

        async fn roundtrip(path: &Path, request: &str) -> IpcResponse {
            let mut stream = UnixStream::connect(path).await.unwrap();
            stream.write_all(request.as_bytes()).await.unwrap();
            let mut buffer = Vec::new();
            stream.read_to_end(&mut buffer).await.unwrap();
            serde_json::from_slice(&buffer).unwrap()
        }

        #[tokio::test]
        async fn test_serve_until_close() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = socket_in(&dir);
            let server = IpcServer::new(&socket_path).unwrap();
            let handler = Arc::new(create_handler());
            let shutdown = handler.service.subscribe_shutdown();

            let serve_task = {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move { serve(&server, handler, shutdown).await })
            };

            let status = roundtrip(&socket_path, r#"{"command":"status"}"#).await;
            assert!(status.is_success());

            let unknown = roundtrip(&socket_path, r#"{"command":"self_destruct"}"#).await;
            assert!(!unknown.is_success());

            let garbage = roundtrip(&socket_path, "{{{").await;
            assert!(!garbage.is_success());

            let closed = roundtrip(&socket_path, r#"{"command":"close"}"#).await;
            assert!(closed.is_success());

            tokio::time::timeout(Duration::from_secs(5), serve_task)
                .await
                .expect("serve should stop after close")
                .unwrap();
            assert!(!socket_path.exists());
        }
    }
}
