//! Best-effort mirror of newly created tasks to a remote endpoint.
//!
//! # Responsibility
//! - Serialize created tasks as `{ "title": .., "completed": .. }`.
//! - POST them to `<base_url>/rest/todos` off the store's thread.
//!
//! # Invariants
//! - Mirroring never blocks or alters the local store.
//! - Failures are logged once; there is no retry.

use crate::model::task::Task;
use crate::service::observer::{TaskChange, TaskObserver, TaskView};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Relative path the mirror posts to.
pub const MIRROR_PATH: &str = "rest/todos";
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Invalid mirror configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyBaseUrl,
    UnsupportedScheme(String),
    ZeroTimeout,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBaseUrl => write!(f, "mirror base url cannot be empty"),
            Self::UnsupportedScheme(url) => {
                write!(f, "mirror base url must start with http:// or https://, got `{url}`")
            }
            Self::ZeroTimeout => write!(f, "mirror timeout must be > 0"),
        }
    }
}

impl Error for ConfigError {}

/// Mirror transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// Server answered with a non-success status.
    Status(u16),
    /// Connection, TLS or I/O failure.
    Transport(String),
}

impl Display for MirrorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(code) => write!(f, "mirror endpoint returned status {code}"),
            Self::Transport(message) => write!(f, "mirror transport failed: {message}"),
        }
    }
}

impl Error for MirrorError {}

/// Validated mirror endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    base_url: String,
    timeout: Duration,
}

impl MirrorConfig {
    /// Validates `base_url`; `timeout_ms = None` uses the default.
    pub fn new(base_url: &str, timeout_ms: Option<u64>) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::UnsupportedScheme(trimmed.to_string()));
        }
        let timeout_ms = timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self {
            base_url: trimmed.to_string(),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/{MIRROR_PATH}", self.base_url)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Wire body of one mirror write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorPayload {
    pub title: String,
    pub completed: bool,
}

impl From<&Task> for MirrorPayload {
    fn from(task: &Task) -> Self {
        Self {
            title: task.label.clone(),
            completed: task.completed,
        }
    }
}

/// Delivers one payload; returns the response status on success.
pub trait MirrorTransport: Send + Sync {
    fn post(&self, payload: &MirrorPayload) -> Result<u16, MirrorError>;
}

/// `ureq`-backed JSON POST transport.
pub struct HttpMirrorTransport {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpMirrorTransport {
    pub fn new(config: &MirrorConfig) -> Self {
        Self {
            endpoint: config.endpoint(),
            agent: ureq::AgentBuilder::new().timeout(config.timeout()).build(),
        }
    }
}

impl MirrorTransport for HttpMirrorTransport {
    fn post(&self, payload: &MirrorPayload) -> Result<u16, MirrorError> {
        match self.agent.post(&self.endpoint).send_json(payload) {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(code, _)) => Err(MirrorError::Status(code)),
            Err(ureq::Error::Transport(err)) => Err(MirrorError::Transport(err.to_string())),
        }
    }
}

/// Handle on mirror writes that have not finished yet.
#[derive(Clone, Default)]
pub struct InFlight {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl InFlight {
    fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        handles.retain(|pending| !pending.is_finished());
        handles.push(handle);
    }

    /// Blocks until every write started so far has finished.
    ///
    /// Short-lived processes call this before exiting.
    pub fn wait(&self) {
        let handles = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for handle in handles {
            if handle.join().is_err() {
                warn!("event=task_mirror module=mirror status=error error_code=worker_panicked");
            }
        }
    }
}

/// Store observer that mirrors each created task in the background.
pub struct TaskMirror {
    transport: Arc<dyn MirrorTransport>,
    in_flight: InFlight,
}

impl TaskMirror {
    pub fn new(transport: Arc<dyn MirrorTransport>) -> Self {
        Self {
            transport,
            in_flight: InFlight::default(),
        }
    }

    /// Shared handle for waiting on pending writes after subscribing.
    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    /// Mirror posting over HTTP to `config`'s endpoint.
    pub fn http(config: &MirrorConfig) -> Self {
        Self::new(Arc::new(HttpMirrorTransport::new(config)))
    }
}

impl TaskObserver for TaskMirror {
    fn tasks_changed(&mut self, change: &TaskChange, _tasks: TaskView<'_>) {
        let TaskChange::Created(task) = change else {
            return;
        };

        let task_id = task.id;
        let payload = MirrorPayload::from(task);
        let transport = Arc::clone(&self.transport);
        let spawned = thread::Builder::new()
            .name("todo-mirror".to_string())
            .spawn(move || match transport.post(&payload) {
                Ok(status) => info!(
                    "event=task_mirror module=mirror status=ok task_id={task_id} http_status={status}"
                ),
                Err(err) => warn!(
                    "event=task_mirror module=mirror status=error task_id={task_id} error={err}"
                ),
            });

        match spawned {
            Ok(handle) => self.in_flight.track(handle),
            Err(err) => warn!(
                "event=task_mirror module=mirror status=error task_id={task_id} error_code=spawn_failed error={err}"
            ),
        }
    }
}
