//! MB-011: Streaming child-process output.
//!
//! Turns a spawned command's stdout into an iterator of byte chunks so the
//! caller can log output while the command is still running. The exit code
//! is reported through a callback once stdout reaches EOF.

use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

/// Upper bound on a single chunk.
pub const CHUNK_SIZE: usize = 8192;

type ExitHook<'a> = Box<dyn FnOnce(i32) + 'a>;

/// Chunked stdout of a running child process.
pub struct ProcessStream<'a> {
    child: Child,
    stdout: ChildStdout,
    buf: Vec<u8>,
    on_exit: Option<ExitHook<'a>>,
}

impl<'a> ProcessStream<'a> {
    /// Spawn `cmd` with stdout piped. Stderr is inherited, stdin is closed.
    ///
    /// `on_exit` receives the exit code (`-1` when killed by a signal) after
    /// the last chunk has been yielded.
    pub fn spawn(mut cmd: Command, on_exit: impl FnOnce(i32) + 'a) -> io::Result<Self> {
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout was not piped"))?;
        Ok(Self {
            child,
            stdout,
            buf: vec![0; CHUNK_SIZE],
            on_exit: Some(Box::new(on_exit)),
        })
    }

    fn finish(&mut self) -> io::Result<()> {
        let Some(hook) = self.on_exit.take() else {
            return Ok(());
        };
        let status = self.child.wait()?;
        hook(status.code().unwrap_or(-1));
        Ok(())
    }
}

impl Iterator for ProcessStream<'_> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.on_exit.as_ref()?;
        loop {
            match self.stdout.read(&mut self.buf) {
                Ok(0) => return self.finish().err().map(Err),
                Ok(n) => return Some(Ok(self.buf[..n].to_vec())),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.on_exit = None;
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl Drop for ProcessStream<'_> {
    fn drop(&mut self) {
        // Abandoned before EOF: don't leave the child running.
        if self.on_exit.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
