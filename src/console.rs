//! MB-020: Product output (bold headers and streamed command output).
//!
//! Everything written here is what the user watches during a run. Nothing
//! appends line terminators: headers carry their own `\n`, and streamed
//! chunks are written exactly as the command produced them.
//!
//! Diagnostics go through `tracing` instead (see [`crate::logging`]).

use std::io::{self, Stdout, Write};

const BOLD: &str = "\x1b[1m";
const END: &str = "\x1b[0m";

/// Explicitly passed output sink for a run.
pub struct Console<W: Write = Stdout> {
    out: W,
}

impl Console<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Bold header line; `text` should end with its own newline.
    pub fn header(&mut self, text: &str) {
        self.write(&format!("{}{}{}", BOLD, text, END));
    }

    /// Header announcing a command about to run.
    pub fn running(&mut self, command: &str) {
        self.header(&format!("Running '{}':\n", command));
    }

    /// Forward a chunk of command output verbatim.
    pub fn chunk(&mut self, text: &str) {
        self.write(text);
    }

    // Console failures (closed pipe, full disk) never abort a run.
    fn write(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(f: impl FnOnce(&mut Console<Vec<u8>>)) -> String {
        let mut console = Console::new(Vec::new());
        f(&mut console);
        String::from_utf8(console.into_inner()).unwrap()
    }

    #[test]
    fn test_mb020_header_is_bold() {
        let out = captured(|c| c.header("Building image...\n"));
        assert_eq!(out, "\x1b[1mBuilding image...\n\x1b[0m");
    }

    #[test]
    fn test_mb020_running_header_quotes_command() {
        let out = captured(|c| c.running("make test"));
        assert_eq!(out, "\x1b[1mRunning 'make test':\n\x1b[0m");
    }

    #[test]
    fn test_mb020_chunks_verbatim() {
        let out = captured(|c| {
            c.chunk("partial ");
            c.chunk("line\n");
            c.chunk("no newline");
        });
        assert_eq!(out, "partial line\nno newline");
    }

    #[test]
    fn test_mb020_write_errors_ignored() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut console = Console::new(Broken);
        console.header("still fine\n");
        console.chunk("x");
    }
}
