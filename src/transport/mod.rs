//! MB-010: Container engine abstraction for exec, archive and lifecycle calls.
//!
//! The core never talks to docker directly. Every remote round-trip goes
//! through [`ContainerEngine`], which has a `docker` CLI implementation for
//! production and a recording mock for tests.

pub mod docker;
pub mod mock;
pub mod process;

use std::fmt;
use std::io::{self, Read};
use std::path::Path;

/// Opaque id of a running container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle of a created (not necessarily started) exec instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecId(pub String);

/// Exec status, available once its output stream is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecInspect {
    pub exit_code: i32,
}

/// Output of a started exec: byte chunks in arrival order, ending when the
/// command terminates.
pub type ExecStream<'a> = Box<dyn Iterator<Item = io::Result<Vec<u8>>> + 'a>;

/// Remote calls consumed by the environment runner.
///
/// All calls are blocking. Implementations are driven from a single thread
/// and never see overlapping requests.
pub trait ContainerEngine {
    /// Prepare `command` for execution inside `container`.
    fn create_exec(&self, container: &ContainerId, command: &str) -> io::Result<ExecId>;

    /// Start a created exec and stream its combined output.
    fn start_exec(&self, exec: &ExecId) -> io::Result<ExecStream<'_>>;

    /// Exit status of an exec whose stream has been fully consumed.
    fn inspect_exec(&self, exec: &ExecId) -> io::Result<ExecInspect>;

    /// Tar archive of the file or directory at an absolute container path.
    fn get_archive(&self, container: &ContainerId, path: &str) -> io::Result<Box<dyn Read>>;

    /// Extract a tar archive into a container directory.
    fn put_archive(&self, container: &ContainerId, dest_dir: &str, archive: &[u8]) -> io::Result<()>;

    /// Build an image from a build context directory, returning its id.
    fn build_image(&self, context_dir: &Path) -> io::Result<String>;

    /// Create and start an idle container from `image`.
    fn start_container(&self, image: &str) -> io::Result<ContainerId>;

    /// Stop a running container.
    fn stop_container(&self, container: &ContainerId) -> io::Result<()>;
}
