//! Incremental text decoding of streamed response bodies.
//!
//! Chunks coming off the wire can end in the middle of a multi-byte
//! character, so the decoder keeps the pending bytes between calls instead of
//! decoding each chunk on its own.

use bytes::Bytes;
use encoding_rs::{Decoder, Encoding, UTF_8};
use futures::stream::{self, Stream, StreamExt};

use crate::domain::error::{AppError, Result};

/// Stateful byte-to-text decoder for one response body. Not reusable once
/// [`ResponseDecoder::finish`] has been called.
pub struct ResponseDecoder {
    decoder: Decoder,
    encoding: &'static Encoding,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::for_encoding(UTF_8)
    }
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_encoding(encoding: &'static Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            encoding,
        }
    }

    /// Picks the encoding from a `Content-Type` charset parameter, falling back
    /// to UTF-8 when the header is missing or names an unknown label.
    pub fn for_content_type(content_type: Option<&str>) -> Self {
        let encoding = content_type
            .and_then(charset_param)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        Self::for_encoding(encoding)
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Decodes as much of `bytes` as forms complete characters.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.decode_inner(bytes, false)
    }

    /// Flushes whatever is still pending at end of stream.
    pub fn finish(&mut self) -> String {
        self.decode_inner(&[], true)
    }

    fn decode_inner(&mut self, bytes: &[u8], last: bool) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 16);
        let mut text = String::with_capacity(capacity);
        // capacity comes from max_utf8_buffer_length, so the whole input fits
        let (_result, _read, _had_replacements) =
            self.decoder.decode_to_string(bytes, &mut text, last);
        text
    }
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

/// Turns a body byte stream into a lazy stream of decoded text chunks.
///
/// Empty chunks are skipped and the pending remainder is flushed when the
/// source ends. A source error is surfaced as [`AppError::StreamRead`] and
/// ends the stream.
pub fn decode_stream<S>(
    body: S,
    decoder: ResponseDecoder,
) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
{
    stream::unfold(Some((body, decoder)), |state| async move {
        let (mut body, mut decoder) = state?;
        loop {
            match body.next().await {
                Some(Ok(bytes)) => {
                    let text = decoder.decode(&bytes);
                    if !text.is_empty() {
                        return Some((Ok(text), Some((body, decoder))));
                    }
                }
                Some(Err(err)) => {
                    let err = match err {
                        AppError::StreamRead(_) => err,
                        other => AppError::StreamRead(other.to_string()),
                    };
                    return Some((Err(err), None));
                }
                None => {
                    let tail = decoder.finish();
                    return if tail.is_empty() {
                        None
                    } else {
                        Some((Ok(tail), None))
                    };
                }
            }
        }
    })
}
