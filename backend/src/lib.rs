//! iconbridge controller library
//!
//! The controller side of the bridge: storage, document access, export
//! packaging and request dispatch. Exposed as a library so the daemon, the
//! panel's in-process mode and the integration tests share one
//! implementation.

pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod host;
pub mod stdio;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use controller::Controller;
pub use error::{ControllerError, ControllerResult, UserFriendlyError};
pub use export::export_selection;
pub use host::{DocumentHost, SvgDirectoryHost};

#[cfg(any(test, feature = "test-support"))]
pub use host::ScriptedHost;
pub use storage::{FileStore, KeyValueStore, MemoryStore, SessionStorage};
