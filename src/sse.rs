//! Stream decoding for chat responses.
//!
//! The backend streams newline-delimited frames; lines with a `data: ` prefix
//! carry a JSON [`StreamFragment`]. This module turns the raw byte stream
//! into a stream of fragments, buffering partial lines (and partial UTF-8
//! sequences) across chunk boundaries so decoding is insensitive to how the
//! transport splits the response.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::observability::{STREAM_BYTES, STREAM_FRAGMENTS, STREAM_FRAMES_SKIPPED};
use crate::types::StreamFragment;

/// Prefix marking a data frame.
const DATA_PREFIX: &str = "data: ";

/// Process a stream of bytes into a stream of data-frame fragments.
///
/// Malformed data frames are skipped, never fatal: a line whose payload fails
/// to parse is counted and dropped and decoding continues with the next line.
/// Lines without the `data: ` prefix (blank separators, other SSE fields) are
/// ignored. Transport and UTF-8 errors surface as stream items.
pub fn fragments<S>(byte_stream: S) -> impl Stream<Item = Result<StreamFragment>>
where
    S: Stream<Item = Result<Bytes>> + Unpin + 'static,
{
    let state = DecodeState {
        buffer: String::new(),
        carry: Vec::new(),
        eof: false,
    };

    stream::unfold(
        (byte_stream, state),
        move |(mut byte_stream, mut state)| async move {
            loop {
                // Drain any complete (or, at end of input, final partial)
                // line already buffered before reading more.
                if let Some(fragment) = state.next_fragment() {
                    STREAM_FRAGMENTS.click();
                    return Some((Ok(fragment), (byte_stream, state)));
                }
                if state.eof {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        if let Err(err) = state.push_bytes(&bytes) {
                            return Some((Err(err), (byte_stream, state)));
                        }
                    }
                    Some(Err(err)) => {
                        return Some((Err(err), (byte_stream, state)));
                    }
                    None => {
                        state.eof = true;
                        if !state.carry.is_empty() {
                            // The transport ended inside a multi-byte sequence.
                            return Some((
                                Err(Error::encoding("stream ended mid UTF-8 sequence", None)),
                                (byte_stream, state),
                            ));
                        }
                    }
                }
            }
        },
    )
}

struct DecodeState {
    /// Decoded text not yet consumed as complete lines.
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence from the last chunk.
    carry: Vec<u8>,
    eof: bool,
}

impl DecodeState {
    /// Appends a chunk, holding back an incomplete trailing UTF-8 sequence
    /// until the next chunk completes it.
    fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.carry.extend_from_slice(bytes);
        match std::str::from_utf8(&self.carry) {
            Ok(text) => {
                self.buffer.push_str(text);
                self.carry.clear();
                Ok(())
            }
            Err(err) => {
                if err.error_len().is_some() {
                    // Truly invalid bytes, not a chunk boundary.
                    return Err(Error::encoding(
                        format!("Invalid UTF-8 in stream: {err}"),
                        Some(Box::new(err)),
                    ));
                }
                let valid = err.valid_up_to();
                let text = std::str::from_utf8(&self.carry[..valid]).map_err(Error::from)?;
                self.buffer.push_str(text);
                self.carry.drain(..valid);
                Ok(())
            }
        }
    }

    /// Consumes buffered lines until a parseable data frame is found.
    ///
    /// Only complete lines are consumed, except at end of input where the
    /// final unterminated line is processed too.
    fn next_fragment(&mut self) -> Option<StreamFragment> {
        loop {
            let line = match self.buffer.find('\n') {
                Some(idx) => {
                    let line: String = self.buffer.drain(..=idx).collect();
                    line
                }
                None if self.eof && !self.buffer.is_empty() => std::mem::take(&mut self.buffer),
                None => return None,
            };
            let line = line.trim_end_matches(['\n', '\r']);
            let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            match serde_json::from_str::<StreamFragment>(payload) {
                Ok(fragment) => return Some(fragment),
                Err(_) => {
                    STREAM_FRAMES_SKIPPED.click();
                    continue;
                }
            }
        }
    }
}
