use std::io;

use thiserror::Error;

/// The only way forwarding can fail: the external tool did not run to a successful exit.
#[derive(Error, Debug)]
pub enum ProcessFailure {
    #[error("{program}: command not found")]
    NotFound { program: String },

    #[error("{program}: failed to run: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with status {code}")]
    Exited { program: String, code: i32 },

    #[error("{program} was terminated by signal {signal}")]
    Signaled { program: String, signal: i32 },
}

impl ProcessFailure {
    /// Exit code the forwarder itself should terminate with. Never 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            ProcessFailure::NotFound { .. } => 127,
            ProcessFailure::Spawn { .. } => 126,
            ProcessFailure::Exited { code, .. } => match (*code & 0xff) as u8 {
                0 => 1,
                truncated => truncated,
            },
            ProcessFailure::Signaled { signal, .. } => (128 + (*signal & 0x7f)) as u8,
        }
    }

    pub fn program(&self) -> &str {
        match self {
            ProcessFailure::NotFound { program }
            | ProcessFailure::Spawn { program, .. }
            | ProcessFailure::Exited { program, .. }
            | ProcessFailure::Signaled { program, .. } => program,
        }
    }
}

pub type ForwardResult<T> = Result<T, ProcessFailure>;
