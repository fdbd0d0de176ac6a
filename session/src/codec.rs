//! Line codec for the checker's stdin/stdout pipes.
//!
//! Requests are single lines (see [`crate::protocol`]). Responses come in two
//! shapes: a block of lines closed by a `#`-prefixed sentinel line (`run`,
//! `suggest`), or exactly one line (`inspect`). There is no length framing;
//! the reader trusts the sentinel.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::SessionError;
use crate::protocol::{self, Command, SENTINEL_PREFIX};

/// Reads response lines from the checker's stdout.
pub struct LineReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Next line without its terminator, or `None` on EOF.
    async fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        let mut line = String::new();
        let bytes_read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| SessionError::ProcessUnavailable(format!("reading checker output: {e}")))?;
        if bytes_read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Read lines up to the sentinel. The sentinel is consumed, not returned.
    ///
    /// EOF before the sentinel means the process died mid-response.
    pub async fn read_block(&mut self) -> Result<Vec<String>, SessionError> {
        let mut lines = Vec::new();
        loop {
            match self.next_line().await? {
                Some(line) if line.starts_with(SENTINEL_PREFIX) => return Ok(lines),
                Some(line) => lines.push(line),
                None => {
                    return Err(SessionError::ProcessUnavailable(format!(
                        "checker closed stdout after {} line(s) without an end marker",
                        lines.len()
                    )));
                }
            }
        }
    }

    /// Read exactly one answer line.
    ///
    /// Returns `Ok(None)` on EOF; callers treat that like an empty answer.
    pub async fn read_answer(&mut self) -> Result<Option<String>, SessionError> {
        self.next_line().await
    }
}

/// Writes request lines to the checker's stdin.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one request line carrying all `commands`, then flush.
    pub async fn write_commands(&mut self, commands: &[Command]) -> Result<(), SessionError> {
        let line = protocol::encode_line(commands);
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SessionError::ProcessUnavailable(format!("writing request: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| SessionError::ProcessUnavailable(format!("flushing request: {e}")))?;
        Ok(())
    }
}
