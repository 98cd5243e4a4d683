//! stdio transport for MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! The reader and writer halves are generic over Tokio's async I/O traits so
//! the serve loop can be driven by in-memory buffers as well as real stdio.

use std::io;
use std::string::FromUtf8Error;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::protocol::OutgoingMessage;

/// Reads newline-delimited messages.
///
/// Lines are read as bytes and decoded one at a time, so a line that is not
/// valid UTF-8 is reported to the caller instead of ending the stream.
pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    /// Wraps a buffered reader.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Reads the next message line, without its `\n` or `\r\n` terminator.
    ///
    /// Returns `None` at EOF and `Some(Err(_))` for a line that is not valid
    /// UTF-8. Cancel safe: bytes read before the future is dropped stay
    /// buffered for the next call.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<Result<String, FromUtf8Error>>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.buf);
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }

        Ok(Some(String::from_utf8(line)))
    }
}

/// Writes newline-delimited messages.
pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    /// Wraps a writer.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a JSON-RPC response or error.
    ///
    /// The message is serialised to JSON and terminated with a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_message(&mut self, message: &OutgoingMessage) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// The stdin reader used by the binary.
pub type StdinReader = LineReader<BufReader<tokio::io::Stdin>>;

/// The stdout writer used by the binary.
pub type StdoutWriter = MessageWriter<tokio::io::Stdout>;

/// Returns reader and writer halves bound to the process's stdin and stdout.
#[must_use]
pub fn stdio() -> (StdinReader, StdoutWriter) {
    (
        LineReader::new(BufReader::new(tokio::io::stdin())),
        MessageWriter::new(tokio::io::stdout()),
    )
}
