//! Content-Length framing for the language-server wire.
//!
//! The server speaks JSON-RPC framed as `Content-Length: N\r\n\r\n{json}`,
//! whether it sits behind a spawned child's stdio pair or a loopback socket.
//! [`MessageReader`] and [`MessageWriter`] are generic over the stream halves
//! so both transports share one codec.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Upper bound on a single frame. Initialization responses from a fully
/// loaded server run large, but nowhere near this.
const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_BYTES} byte limit")]
    Oversized(usize),
    #[error("malformed frame header: {0}")]
    BadHeader(String),
    #[error("frame body is not valid JSON: {0}")]
    BadJson(#[from] serde_json::Error),
}

/// Reads framed JSON values from the server.
pub struct MessageReader<R> {
    input: BufReader<R>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: BufReader::new(input),
        }
    }

    /// Next frame, or `None` once the peer cleanly closes the stream between
    /// frames. End-of-stream inside a frame is an error.
    pub async fn next_frame(&mut self) -> Result<Option<serde_json::Value>, WireError> {
        let Some(length) = self.frame_length().await? else {
            return Ok(None);
        };
        if length > MAX_FRAME_BYTES {
            return Err(WireError::Oversized(length));
        }
        let mut body = vec![0u8; length];
        self.input.read_exact(&mut body).await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }

    /// Consume the header block and return the announced body length.
    /// `None` only when the stream ends before any header byte.
    async fn frame_length(&mut self) -> Result<Option<usize>, WireError> {
        let mut length: Option<usize> = None;
        let mut line = String::new();
        let mut mid_headers = false;

        loop {
            line.clear();
            if self.input.read_line(&mut line).await? == 0 {
                if mid_headers {
                    return Err(WireError::BadHeader(
                        "end of stream inside a header block".to_string(),
                    ));
                }
                return Ok(None);
            }
            mid_headers = true;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            // Header names compare case-insensitively; anything that is not
            // Content-Length (Content-Type, mostly) is skipped.
            if let Some((name, value)) = trimmed.split_once(':')
                && name.eq_ignore_ascii_case("Content-Length")
            {
                length = Some(
                    value
                        .trim()
                        .parse()
                        .map_err(|_| WireError::BadHeader(trimmed.to_string()))?,
                );
            }
        }

        match length {
            Some(length) => Ok(Some(length)),
            None => Err(WireError::BadHeader(
                "missing Content-Length".to_string(),
            )),
        }
    }
}

/// Writes framed JSON values to the server.
pub struct MessageWriter<W> {
    output: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub async fn write_message(&mut self, message: &serde_json::Value) -> Result<(), WireError> {
        let body = serde_json::to_vec(message)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.output.write_all(header.as_bytes()).await?;
        self.output.write_all(&body).await?;
        self.output.flush().await?;
        Ok(())
    }
}
