//! Forward command-line arguments to an external audio-source-separation tool
//! (`demucs` by default) and exit with its status.

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod logging;

pub use backend::AudioBackend;
pub use config::ForwarderConfig;
pub use error::ProcessFailure;
pub use forwarder::{Forwarder, Invocation};
