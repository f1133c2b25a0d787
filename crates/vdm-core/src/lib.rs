pub mod config;
pub mod logging;

// Engine modules
pub mod engine;
pub mod error;
pub mod listener;
pub mod persist;
pub mod task;
pub mod transport;
pub mod url_model;

pub use engine::{CreateTask, DownloadEngine, TaskHandle};
pub use error::EngineError;
pub use listener::{DownloadListener, EventKind, ListenerId};
pub use task::{TaskId, TaskRecord, TaskSnapshot, TaskState, VideoKind};
pub use transport::{RunDirective, TransportReport};
