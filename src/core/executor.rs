//! MB-003: Command executor. Runs one command in the container.
//!
//! create exec → start (streaming) → forward chunks to the console as they
//! arrive → inspect exit code. A nonzero exit becomes
//! [`MobyError::AbnormalExit`] and aborts the whole run.

use super::error::{MobyError, Result};
use super::types::CommandResult;
use crate::console::Console;
use crate::transport::{ContainerEngine, ContainerId};
use std::io::Write;
use tracing::debug;

/// Run `command` inside `container`.
///
/// Unless `silent`, a `Running '<command>':` header is written first and
/// every output chunk is forwarded to the console the moment it arrives.
/// Returns the full output with trailing whitespace trimmed.
pub fn run_command<E, W>(
    engine: &E,
    container: &ContainerId,
    command: &str,
    console: &mut Console<W>,
    silent: bool,
) -> Result<CommandResult>
where
    E: ContainerEngine + ?Sized,
    W: Write,
{
    if !silent {
        console.running(command);
    }

    let exec = engine.create_exec(container, command)?;
    let mut captured = Vec::new();
    let mut decoder = ChunkDecoder::default();
    {
        let stream = engine.start_exec(&exec)?;
        for chunk in stream {
            let chunk = chunk?;
            if !silent {
                console.chunk(&decoder.decode(&chunk));
            }
            captured.extend_from_slice(&chunk);
        }
    }
    if !silent {
        let tail = decoder.finish();
        if !tail.is_empty() {
            console.chunk(&tail);
        }
    }

    let exit_code = engine.inspect_exec(&exec)?.exit_code;
    debug!(command, exit_code, bytes = captured.len(), "command finished");
    if exit_code != 0 {
        return Err(MobyError::AbnormalExit(exit_code));
    }

    Ok(CommandResult {
        exit_code,
        output: String::from_utf8_lossy(&captured).trim_end().to_string(),
    })
}

/// Incremental UTF-8 decoding across chunk boundaries.
///
/// A multi-byte character split between two chunks is held back until its
/// remaining bytes arrive; genuinely invalid bytes decode lossily.
#[derive(Default)]
struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.pending.len(),
        };
        let rest = self.pending.split_off(complete);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = rest;
        text
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{Call, ExecScript, MockEngine};

    fn ctr() -> ContainerId {
        ContainerId("mock-container".to_string())
    }

    fn console() -> Console<Vec<u8>> {
        Console::new(Vec::new())
    }

    fn text(console: Console<Vec<u8>>) -> String {
        String::from_utf8(console.into_inner()).unwrap()
    }

    #[test]
    fn test_mb003_pwd_scenario() {
        let engine = MockEngine::new().with_cwd("/app");
        let mut out = console();
        let result = run_command(&engine, &ctr(), "pwd", &mut out, false).unwrap();
        assert_eq!(result.output, "/app");
        assert_eq!(result.exit_code, 0);
        assert_eq!(engine.calls(), vec![Call::Exec("pwd".to_string())]);
    }

    #[test]
    fn test_mb003_trailing_whitespace_trimmed() {
        let engine = MockEngine::new().with_exec("ls", ExecScript::ok("  a\nb \n\n\t"));
        let result = run_command(&engine, &ctr(), "ls", &mut console(), true).unwrap();
        // Leading whitespace is output; only the tail is trimmed.
        assert_eq!(result.output, "  a\nb");
    }

    #[test]
    fn test_mb003_chunks_concatenated() {
        let script = ExecScript {
            chunks: vec![b"one\n".to_vec(), b"two\n".to_vec(), b"three\n".to_vec()],
            exit_code: 0,
        };
        let engine = MockEngine::new().with_exec("count", script);
        let mut out = console();
        let result = run_command(&engine, &ctr(), "count", &mut out, false).unwrap();
        assert_eq!(result.output, "one\ntwo\nthree");
        assert_eq!(
            text(out),
            "\x1b[1mRunning 'count':\n\x1b[0mone\ntwo\nthree\n"
        );
    }

    #[test]
    fn test_mb003_silent_logs_nothing() {
        let engine = MockEngine::new().with_exec("ls", ExecScript::ok("file\n"));
        let mut out = console();
        let result = run_command(&engine, &ctr(), "ls", &mut out, true).unwrap();
        assert_eq!(result.output, "file");
        assert!(text(out).is_empty());
    }

    #[test]
    fn test_mb003_abnormal_exit_carries_code() {
        let script = ExecScript {
            chunks: vec![b"oops\n".to_vec()],
            exit_code: 3,
        };
        let engine = MockEngine::new().with_exec("false_cmd", script);
        let mut out = console();
        let err = run_command(&engine, &ctr(), "false_cmd", &mut out, false).unwrap_err();
        assert!(matches!(err, MobyError::AbnormalExit(3)));
        // Output was still streamed before the failure surfaced.
        assert!(text(out).ends_with("oops\n"));
    }

    #[test]
    fn test_mb003_exit_codes_preserved() {
        for code in [1, 2, 126, 127, 255] {
            let engine = MockEngine::new().with_exec("x", ExecScript::exit(code));
            let err = run_command(&engine, &ctr(), "x", &mut console(), true).unwrap_err();
            assert_eq!(err.exit_code(), code);
        }
    }

    #[test]
    fn test_mb003_split_utf8_logged_intact() {
        // "é" is 0xC3 0xA9; split it across two chunks.
        let script = ExecScript {
            chunks: vec![b"caf\xC3".to_vec(), b"\xA9\n".to_vec()],
            exit_code: 0,
        };
        let engine = MockEngine::new().with_exec("cafe", script);
        let mut out = console();
        let result = run_command(&engine, &ctr(), "cafe", &mut out, false).unwrap();
        assert_eq!(result.output, "café");
        assert!(text(out).ends_with("café\n"));
    }

    #[test]
    fn test_mb003_decoder_invalid_bytes_lossy() {
        let mut decoder = ChunkDecoder::default();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
        assert_eq!(decoder.decode(b"\xE2\x82"), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }
}
