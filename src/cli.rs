use std::process::ExitCode;

use tracing::{debug, error, warn};

use crate::backend;
use crate::config::ForwarderConfig;
use crate::forwarder::{Forwarder, Invocation};
use crate::logging;

/// Forward this process's arguments to the configured separation tool.
///
/// There are no flags of our own: every argument, `--help` and `--` included, belongs to the tool.
pub fn run() -> ExitCode {
    let loaded = ForwarderConfig::load();
    logging::init_logging(loaded.config.log_level);

    for warning in &loaded.warnings {
        warn!("{}", warning);
    }
    if let Some(path) = &loaded.source {
        debug!("loaded config from {}", path.display());
    }

    let config = loaded.config;
    backend::set_audio_backend(config.audio_backend);

    let forwarder = Forwarder::new(&config.program);
    match forwarder.run(&Invocation::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(program = e.program(), "{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
