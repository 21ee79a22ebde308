use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info};

use crate::error::{ForwardResult, ProcessFailure};

/// The caller's arguments, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Everything after our own program name, without interpretation.
    pub fn from_env() -> Self {
        Self::new(std::env::args_os().skip(1))
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

/// Runs one external program with the invocation's arguments appended.
#[derive(Debug, Clone)]
pub struct Forwarder {
    program: OsString,
}

impl Forwarder {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Full argv of the child: program first, then the passthrough arguments.
    pub fn command_line(&self, invocation: &Invocation) -> Vec<OsString> {
        std::iter::once(self.program.clone())
            .chain(invocation.args().iter().cloned())
            .collect()
    }

    /// The child command, with all three standard streams inherited.
    pub fn command(&self, invocation: &Invocation) -> Command {
        self.command_at(Path::new(&self.program), invocation)
    }

    /// Locate the program on `PATH`, or check that an explicit path exists.
    ///
    /// Explicit paths are not checked for permissions; spawning reports those.
    pub fn resolve(&self) -> ForwardResult<PathBuf> {
        let path = Path::new(&self.program);
        if path.components().count() > 1 {
            return if path.exists() {
                Ok(path.to_path_buf())
            } else {
                Err(ProcessFailure::NotFound {
                    program: self.display_name(),
                })
            };
        }
        which::which(&self.program).map_err(|e| {
            debug!("lookup of {:?} failed: {}", self.program, e);
            ProcessFailure::NotFound {
                program: self.display_name(),
            }
        })
    }

    /// Spawn the program and block until it exits.
    pub fn run(&self, invocation: &Invocation) -> ForwardResult<()> {
        let executable = self.resolve()?;
        debug!("resolved {:?} to {}", self.program, executable.display());
        info!("running: {:?}", self.command_line(invocation));

        let status = self
            .command_at(&executable, invocation)
            .status()
            .map_err(|source| self.launch_failure(source))?;
        debug!("{} finished: {}", self.display_name(), status);

        check_status(self.display_name(), status)
    }

    fn command_at(&self, executable: &Path, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(executable);

        // Keep the configured name as argv[0] even when spawning a resolved path.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.arg0(&self.program);
        }

        cmd.args(invocation.args())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }

    fn launch_failure(&self, source: io::Error) -> ProcessFailure {
        if source.kind() == io::ErrorKind::NotFound {
            ProcessFailure::NotFound {
                program: self.display_name(),
            }
        } else {
            ProcessFailure::Spawn {
                program: self.display_name(),
                source,
            }
        }
    }

    fn display_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

fn check_status(program: String, status: ExitStatus) -> ForwardResult<()> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(ProcessFailure::Exited { program, code }),
        None => Err(terminated(program, status)),
    }
}

#[cfg(unix)]
fn terminated(program: String, status: ExitStatus) -> ProcessFailure {
    use std::os::unix::process::ExitStatusExt;
    ProcessFailure::Signaled {
        program,
        signal: status.signal().unwrap_or(0),
    }
}

#[cfg(not(unix))]
fn terminated(program: String, _status: ExitStatus) -> ProcessFailure {
    ProcessFailure::Exited { program, code: 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::two_stems(&["--two-stems=vocals", "song.mp3"])]
    #[case::no_args(&[])]
    #[case::escape_and_help(&["--", "--help", "-h"])]
    #[case::spaces_and_empty(&["my song.mp3", "", "-n", "htdemucs"])]
    fn test_command_line_preserves_args(#[case] args: &[&str]) {
        let forwarder = Forwarder::new("demucs");
        let invocation = Invocation::new(args.iter().copied());

        let line = forwarder.command_line(&invocation);
        assert_eq!(line[0], OsString::from("demucs"));
        assert_eq!(&line[1..], invocation.args());
        assert_eq!(line.len(), args.len() + 1);
    }

    #[test]
    fn test_command_program_and_args() {
        let forwarder = Forwarder::new("demucs");
        let invocation = Invocation::new(["--two-stems=vocals", "song.mp3"]);

        let cmd = forwarder.command(&invocation);
        assert_eq!(cmd.get_program(), OsStr::new("demucs"));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(args, [OsStr::new("--two-stems=vocals"), OsStr::new("song.mp3")]);
    }

    #[test]
    fn test_missing_program_is_not_found() {
        let forwarder = Forwarder::new("definitely-not-a-real-separation-tool");
        let err = forwarder.run(&Invocation::default()).unwrap_err();
        assert!(matches!(err, ProcessFailure::NotFound { .. }));
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_missing_explicit_path_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let forwarder = Forwarder::new(dir.path().join("demucs"));
        assert!(matches!(
            forwarder.resolve(),
            Err(ProcessFailure::NotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_launch_failure() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("demucs");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let forwarder = Forwarder::new(&path);
        assert_eq!(forwarder.resolve().unwrap(), path);
        match forwarder.run(&Invocation::default()) {
            Err(err @ ProcessFailure::Spawn { .. }) => assert_eq!(err.exit_code(), 126),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_success_status() {
        let forwarder = Forwarder::new("sh");
        let invocation = Invocation::new(["-c", "exit 0"]);
        assert!(forwarder.run(&invocation).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_status() {
        let forwarder = Forwarder::new("sh");
        let invocation = Invocation::new(["-c", "exit 3"]);
        match forwarder.run(&invocation) {
            Err(ProcessFailure::Exited { program, code }) => {
                assert_eq!(program, "sh");
                assert_eq!(code, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_killed_by_signal() {
        let forwarder = Forwarder::new("sh");
        let invocation = Invocation::new(["-c", "kill -9 $$"]);
        match forwarder.run(&invocation) {
            Err(err @ ProcessFailure::Signaled { .. }) => assert_eq!(err.exit_code(), 137),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
