//! Mock container engine for testing.
//!
//! Records every call in order and serves scripted exec output and
//! archives, so runner behaviour can be asserted without a docker daemon.

use super::{ContainerEngine, ContainerId, ExecId, ExecInspect, ExecStream};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exec(String),
    GetArchive(String),
    PutArchive { dest_dir: String, archive: Vec<u8> },
    BuildImage(PathBuf),
    StartContainer(String),
    StopContainer(String),
}

/// Scripted result of a command.
#[derive(Debug, Clone)]
pub struct ExecScript {
    pub chunks: Vec<Vec<u8>>,
    pub exit_code: i32,
}

impl ExecScript {
    pub fn ok(output: &str) -> Self {
        Self {
            chunks: vec![output.as_bytes().to_vec()],
            exit_code: 0,
        }
    }

    pub fn exit(exit_code: i32) -> Self {
        Self {
            chunks: Vec::new(),
            exit_code,
        }
    }
}

/// A test double that records calls and serves pre-configured responses.
///
/// Unscripted commands succeed with no output, except `pwd`, which answers
/// with the configured working directory.
pub struct MockEngine {
    cwd: String,
    scripts: HashMap<String, ExecScript>,
    archives: HashMap<String, Vec<u8>>,
    fail_stop: bool,
    calls: RefCell<Vec<Call>>,
    execs: RefCell<Vec<(String, Option<i32>)>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            cwd: "/".to_string(),
            scripts: HashMap::new(),
            archives: HashMap::new(),
            fail_stop: false,
            calls: RefCell::new(Vec::new()),
            execs: RefCell::new(Vec::new()),
        }
    }

    /// Working directory reported by `pwd`.
    pub fn with_cwd(mut self, cwd: &str) -> Self {
        self.cwd = cwd.to_string();
        self
    }

    /// Script the output and exit code of `command`.
    pub fn with_exec(mut self, command: &str, script: ExecScript) -> Self {
        self.scripts.insert(command.to_string(), script);
        self
    }

    /// Serve `archive` for `get_archive` on an absolute container path.
    pub fn with_archive(mut self, path: &str, archive: Vec<u8>) -> Self {
        self.archives.insert(path.to_string(), archive);
        self
    }

    /// Make `stop_container` fail.
    pub fn with_failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Commands executed so far, `pwd` lookups included.
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Exec(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    /// Commands executed so far, excluding working-directory lookups.
    pub fn user_commands(&self) -> Vec<String> {
        self.commands().into_iter().filter(|c| c.as_str() != "pwd").collect()
    }

    fn script_for(&self, command: &str) -> ExecScript {
        if let Some(script) = self.scripts.get(command) {
            return script.clone();
        }
        if command == "pwd" {
            return ExecScript::ok(&format!("{}\n", self.cwd));
        }
        ExecScript::ok("")
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn exec_index(exec: &ExecId) -> io::Result<usize> {
        exec.0
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, format!("unknown exec {}", exec.0)))
    }
}

impl ContainerEngine for MockEngine {
    fn create_exec(&self, _container: &ContainerId, command: &str) -> io::Result<ExecId> {
        let mut execs = self.execs.borrow_mut();
        execs.push((command.to_string(), None));
        Ok(ExecId((execs.len() - 1).to_string()))
    }

    fn start_exec(&self, exec: &ExecId) -> io::Result<ExecStream<'_>> {
        let index = Self::exec_index(exec)?;
        let command = self
            .execs
            .borrow()
            .get(index)
            .map(|(cmd, _)| cmd.clone())
            .ok_or_else(|| io::Error::other("exec not created"))?;
        self.record(Call::Exec(command.clone()));

        let script = self.script_for(&command);
        self.execs.borrow_mut()[index].1 = Some(script.exit_code);
        Ok(Box::new(script.chunks.into_iter().map(Ok::<_, io::Error>)))
    }

    fn inspect_exec(&self, exec: &ExecId) -> io::Result<ExecInspect> {
        let index = Self::exec_index(exec)?;
        match self.execs.borrow().get(index) {
            Some((_, Some(exit_code))) => Ok(ExecInspect {
                exit_code: *exit_code,
            }),
            _ => Err(io::Error::other("exec not started")),
        }
    }

    fn get_archive(&self, _container: &ContainerId, path: &str) -> io::Result<Box<dyn Read>> {
        self.record(Call::GetArchive(path.to_string()));
        match self.archives.get(path) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such container path: {}", path),
            )),
        }
    }

    fn put_archive(&self, _container: &ContainerId, dest_dir: &str, archive: &[u8]) -> io::Result<()> {
        self.record(Call::PutArchive {
            dest_dir: dest_dir.to_string(),
            archive: archive.to_vec(),
        });
        Ok(())
    }

    fn build_image(&self, context_dir: &Path) -> io::Result<String> {
        self.record(Call::BuildImage(context_dir.to_path_buf()));
        Ok("sha256:mock".to_string())
    }

    fn start_container(&self, image: &str) -> io::Result<ContainerId> {
        self.record(Call::StartContainer(image.to_string()));
        Ok(ContainerId("mock-container".to_string()))
    }

    fn stop_container(&self, container: &ContainerId) -> io::Result<()> {
        self.record(Call::StopContainer(container.0.clone()));
        if self.fail_stop {
            return Err(io::Error::other("container did not stop"));
        }
        Ok(())
    }
}
