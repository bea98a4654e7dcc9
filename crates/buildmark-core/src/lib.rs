//! buildmark core library
//!
//! Two small, independent facilities shared by service binaries: a
//! canonical build/version identity model ([`VersionIdentity`]) and a
//! durable config object persisted as commented YAML
//! ([`PersistentConfig`]).

pub mod config;
pub mod error;
pub mod exe;
pub mod telemetry;
pub mod version;

pub use config::{ChangeHook, PersistentConfig};
pub use error::{BuildmarkError, Result};
pub use exe::{run_file_hash, run_file_mtime};
pub use telemetry::init_tracing;
pub use version::{BuildTag, VersionIdentity};

/// buildmark version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
