//! MB-012: docker CLI engine.
//!
//! Drives the `docker` binary directly instead of a daemon API client.
//! Any docker-compatible CLI (e.g. `podman`) can be substituted via
//! [`DockerCli::with_program`].

use super::process::ProcessStream;
use super::{ContainerEngine, ContainerId, ExecId, ExecInspect, ExecStream};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tracing::{debug, instrument, warn};

/// Lifecycle of a single exec instance.
#[derive(Debug)]
enum ExecState {
    Created { container: ContainerId, command: String },
    Running,
    Exited(i32),
}

/// [`ContainerEngine`] backed by the docker command-line client.
pub struct DockerCli {
    program: String,
    execs: RefCell<HashMap<ExecId, ExecState>>,
    next_exec: Cell<u64>,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::with_program("docker")
    }
}

impl DockerCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different docker-compatible binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            execs: RefCell::new(HashMap::new()),
            next_exec: Cell::new(0),
        }
    }

    fn docker(&self) -> Command {
        Command::new(&self.program)
    }

    /// `docker exec <id> sh -c 'exec 2>&1; <command>'`
    ///
    /// stderr is folded into stdout inside the container so the chunk stream
    /// preserves the interleaving the command produced.
    fn exec_command(&self, container: &ContainerId, command: &str) -> Command {
        let mut cmd = self.docker();
        cmd.arg("exec")
            .arg(&container.0)
            .args(["sh", "-c"])
            .arg(format!("exec 2>&1; {}", command));
        cmd
    }

    fn get_archive_command(&self, container: &ContainerId, path: &str) -> Command {
        let mut cmd = self.docker();
        cmd.arg("cp").arg(format!("{}:{}", container, path)).arg("-");
        cmd
    }

    fn put_archive_command(&self, container: &ContainerId, dest_dir: &str) -> Command {
        let mut cmd = self.docker();
        cmd.arg("cp").arg("-").arg(format!("{}:{}", container, dest_dir));
        cmd
    }

    fn build_command(&self, context_dir: &Path) -> Command {
        let mut cmd = self.docker();
        cmd.args(["build", "-q"]).arg(context_dir);
        cmd
    }

    /// The container idles on `cat` with a tty so it stays up for execs.
    fn create_command(&self, image: &str) -> Command {
        let mut cmd = self.docker();
        cmd.args(["create", "-t", "--entrypoint", "cat", image]);
        cmd
    }

    fn start_command(&self, container: &ContainerId) -> Command {
        let mut cmd = self.docker();
        cmd.arg("start").arg(&container.0);
        cmd
    }

    fn stop_command(&self, container: &ContainerId) -> Command {
        let mut cmd = self.docker();
        cmd.arg("stop").arg(&container.0);
        cmd
    }

    fn remove_command(&self, container: &ContainerId) -> Command {
        let mut cmd = self.docker();
        cmd.args(["rm", "-f"]).arg(&container.0);
        cmd
    }
}

/// Run a management command to completion, failing on nonzero exit.
fn checked_output(mut cmd: Command, stdin: Option<&[u8]>) -> io::Result<Output> {
    debug!(?cmd, "spawning docker");
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd.spawn()?;
    // The pipe is dropped at the end of its arm so docker sees EOF.
    let written = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => pipe.write_all(input),
        (Some(_), None) => Err(io::Error::other("stdin was not piped")),
        (None, _) => Ok(()),
    };

    // Reap the child before reporting anything; a nonzero docker exit takes
    // precedence over a pipe error.
    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "docker exited with code {}: {}",
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    written?;
    Ok(output)
}

fn stdout_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

impl ContainerEngine for DockerCli {
    fn create_exec(&self, container: &ContainerId, command: &str) -> io::Result<ExecId> {
        let next = self.next_exec.get() + 1;
        self.next_exec.set(next);
        let id = ExecId(format!("exec-{}", next));
        self.execs.borrow_mut().insert(
            id.clone(),
            ExecState::Created {
                container: container.clone(),
                command: command.to_string(),
            },
        );
        Ok(id)
    }

    #[instrument(skip(self))]
    fn start_exec(&self, exec: &ExecId) -> io::Result<ExecStream<'_>> {
        let state = self.execs.borrow_mut().insert(exec.clone(), ExecState::Running);
        let (container, command) = match state {
            Some(ExecState::Created { container, command }) => (container, command),
            other => {
                return Err(io::Error::other(format!(
                    "exec {} cannot be started from state {:?}",
                    exec.0, other
                )))
            }
        };

        let cmd = self.exec_command(&container, &command);
        let id = exec.clone();
        let stream = ProcessStream::spawn(cmd, move |code| {
            debug!(exec = %id.0, code, "exec finished");
            self.execs.borrow_mut().insert(id, ExecState::Exited(code));
        })?;
        Ok(Box::new(stream))
    }

    /// Reading the status of a finished exec also forgets it.
    fn inspect_exec(&self, exec: &ExecId) -> io::Result<ExecInspect> {
        let mut execs = self.execs.borrow_mut();
        match execs.get(exec) {
            Some(ExecState::Exited(code)) => {
                let exit_code = *code;
                execs.remove(exec);
                Ok(ExecInspect { exit_code })
            }
            Some(state) => Err(io::Error::other(format!(
                "exec {} has not finished ({:?})",
                exec.0, state
            ))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unknown exec {}", exec.0),
            )),
        }
    }

    fn get_archive(&self, container: &ContainerId, path: &str) -> io::Result<Box<dyn Read>> {
        let output = checked_output(self.get_archive_command(container, path), None)?;
        Ok(Box::new(Cursor::new(output.stdout)))
    }

    fn put_archive(&self, container: &ContainerId, dest_dir: &str, archive: &[u8]) -> io::Result<()> {
        checked_output(self.put_archive_command(container, dest_dir), Some(archive))?;
        Ok(())
    }

    fn build_image(&self, context_dir: &Path) -> io::Result<String> {
        let output = checked_output(self.build_command(context_dir), None)?;
        let image = stdout_line(&output);
        match image.lines().last() {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(io::Error::other("docker build printed no image id")),
        }
    }

    fn start_container(&self, image: &str) -> io::Result<ContainerId> {
        let created = checked_output(self.create_command(image), None)?;
        let container = ContainerId(stdout_line(&created));
        if let Err(e) = checked_output(self.start_command(&container), None) {
            if let Err(rm) = checked_output(self.remove_command(&container), None) {
                warn!(%container, error = %rm, "failed to remove unstarted container");
            }
            return Err(e);
        }
        Ok(container)
    }

    fn stop_container(&self, container: &ContainerId) -> io::Result<()> {
        checked_output(self.stop_command(container), None)?;
        Ok(())
    }
}
