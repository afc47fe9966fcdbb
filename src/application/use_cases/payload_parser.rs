//! Incremental parser for streamed highlight envelopes.
//!
//! The response body is a sequence of JSON envelopes `{"highlights": [...]}`
//! separated by optional whitespace. A single envelope, newline-delimited
//! envelopes and back-to-back envelopes are all the same case here. Every
//! envelope is emitted as one batch as soon as its closing brace arrives; an
//! unfinished envelope stays in the buffer until more text comes in.

use serde_json::Deserializer;
use tracing::debug;

use crate::domain::error::{AppError, Result};
use crate::domain::highlight::{HighlightEnvelope, RawHighlight};

/// How much of the offending text is kept in an error message.
const EXCERPT_CHARS: usize = 200;

pub type HighlightBatch = Vec<RawHighlight>;

/// Per-call parsing state. Owned by a single analysis and dropped with it.
#[derive(Debug, Default)]
pub struct IncrementalPayloadParser {
    buffer: String,
    envelopes_parsed: usize,
    records_emitted: usize,
}

impl IncrementalPayloadParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn envelopes_parsed(&self) -> usize {
        self.envelopes_parsed
    }

    pub fn records_emitted(&self) -> usize {
        self.records_emitted
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Appends decoded text. Batches completed before a parse error are kept
    /// in the returned progress next to the error.
    pub fn push(&mut self, text: &str) -> ParseProgress {
        self.buffer.push_str(text);
        self.drain_complete()
    }

    /// Ends the stream. Anything left that is not whitespace is an error, and
    /// so is a body that never contained an envelope.
    pub fn finish(mut self) -> ParseProgress {
        let mut progress = self.drain_complete();
        if progress.error.is_some() {
            return progress;
        }
        let leftover = self.buffer.trim();
        if !leftover.is_empty() {
            progress.error = Some(AppError::InvalidServerResponse(format!(
                "response ended inside an unfinished payload: {}",
                excerpt(leftover)
            )));
        } else if self.envelopes_parsed == 0 {
            progress.error = Some(AppError::InvalidServerResponse(
                "response body was empty".to_string(),
            ));
        } else {
            debug!(
                envelopes = self.envelopes_parsed,
                records = self.records_emitted,
                "Highlight stream finished"
            );
        }
        progress
    }

    fn drain_complete(&mut self) -> ParseProgress {
        let mut progress = ParseProgress::default();
        let mut consumed = 0;
        {
            let mut envelopes =
                Deserializer::from_str(&self.buffer).into_iter::<HighlightEnvelope>();
            loop {
                match envelopes.next() {
                    Some(Ok(envelope)) => {
                        consumed = envelopes.byte_offset();
                        self.envelopes_parsed += 1;
                        if !envelope.highlights.is_empty() {
                            self.records_emitted += envelope.highlights.len();
                            progress.batches.push(envelope.highlights);
                        }
                    }
                    // the envelope is cut off; wait for the next chunk
                    Some(Err(err)) if err.is_eof() => break,
                    Some(Err(err)) => {
                        progress.error = Some(AppError::InvalidServerResponse(format!(
                            "{} near: {}",
                            err,
                            excerpt(&self.buffer[consumed..])
                        )));
                        break;
                    }
                    None => {
                        consumed = envelopes.byte_offset();
                        break;
                    }
                }
            }
        }
        self.buffer.drain(..consumed);
        progress
    }
}

/// Outcome of feeding text to the parser: the batches completed, in order,
/// and the parse error that stopped it, if any.
#[derive(Debug, Default)]
pub struct ParseProgress {
    pub batches: Vec<HighlightBatch>,
    pub error: Option<AppError>,
}

impl ParseProgress {
    /// Drops the completed batches when an error is present.
    pub fn into_result(self) -> Result<Vec<HighlightBatch>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.batches),
        }
    }
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn ids(batches: &[HighlightBatch]) -> Vec<Value> {
        batches
            .iter()
            .flatten()
            .map(|record| record.get("id").cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn parse_in_two(payload: &str, offset: usize) -> Vec<HighlightBatch> {
        let mut parser = IncrementalPayloadParser::new();
        let mut batches = parser.push(&payload[..offset]).into_result().unwrap();
        batches.extend(parser.push(&payload[offset..]).into_result().unwrap());
        batches.extend(parser.finish().into_result().unwrap());
        batches
    }

    #[test]
    fn test_single_envelope_in_one_chunk() {
        let mut parser = IncrementalPayloadParser::new();
        let batches = parser.push(r#"{"highlights": [{"id":1}]}"#).into_result().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(ids(&batches), vec![json!(1)]);
        assert!(parser.finish().into_result().unwrap().is_empty());
    }

    #[test]
    fn test_envelope_emitted_before_stream_end() {
        let mut parser = IncrementalPayloadParser::new();
        assert!(parser.push(r#"{"highlights":[{"id":1},"#).into_result().unwrap().is_empty());
        let batches = parser.push(r#"{"id":2}]}"#).into_result().unwrap();
        assert_eq!(ids(&batches), vec![json!(1), json!(2)]);
        assert_eq!(parser.buffered_len(), 0);
    }

    #[test]
    fn test_newline_delimited_envelopes() {
        let mut parser = IncrementalPayloadParser::new();
        let batches = parser
            .push("{\"highlights\":[{\"id\":1}]}\n{\"highlights\":[{\"id\":2}]}\n{\"highl")
            .into_result()
            .unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(ids(&batches), vec![json!(1), json!(2)]);

        let rest = parser.push("ights\":[{\"id\":\"three\"}]}\n").into_result().unwrap();
        assert_eq!(ids(&rest), vec![json!("three")]);
        assert_eq!(parser.records_emitted(), 3);
        assert!(parser.finish().into_result().unwrap().is_empty());
    }

    #[test]
    fn test_every_split_offset_yields_same_records() {
        let payload = concat!(
            "{\"highlights\":[{\"id\":1,\"title\":\"Пик продаж\"},{\"id\":\"b-2\",\"score\":0.75}]}\n",
            "{\"highlights\":[]}",
            "{\"highlights\":[{\"id\":3,\"description\":\"escaped \\\"quote\\\" }\"}]}"
        );
        let whole = parse_in_two(payload, payload.len());
        assert_eq!(ids(&whole), vec![json!(1), json!("b-2"), json!(3)]);

        for offset in 0..=payload.len() {
            if !payload.is_char_boundary(offset) {
                continue;
            }
            assert_eq!(parse_in_two(payload, offset), whole, "split at {}", offset);
        }
    }

    #[test]
    fn test_empty_highlights_envelope_is_not_a_batch() {
        let mut parser = IncrementalPayloadParser::new();
        assert!(parser.push(r#"{"highlights":[]}"#).into_result().unwrap().is_empty());
        assert_eq!(parser.envelopes_parsed(), 1);
        assert!(parser.finish().into_result().unwrap().is_empty());
    }

    #[test]
    fn test_empty_body_is_invalid() {
        let parser = IncrementalPayloadParser::new();
        let err = parser.finish().into_result().unwrap_err();
        assert!(matches!(err, AppError::InvalidServerResponse(_)));

        let mut whitespace = IncrementalPayloadParser::new();
        whitespace.push("  \n").into_result().unwrap();
        assert!(whitespace.finish().error.is_some());
    }

    #[test]
    fn test_truncated_body_is_invalid_at_end() {
        let mut parser = IncrementalPayloadParser::new();
        assert!(parser.push(r#"{"highlights":[{"id":1}"#).into_result().unwrap().is_empty());
        match parser.finish().into_result() {
            Err(AppError::InvalidServerResponse(msg)) => {
                assert!(msg.contains(r#"{"highlights":[{"id":1}"#));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_fails_immediately() {
        let mut parser = IncrementalPayloadParser::new();
        let err = parser.push("<html>502 Bad Gateway</html>").into_result().unwrap_err();
        match err {
            AppError::InvalidServerResponse(msg) => assert!(msg.contains("<html>")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_envelope_shape_is_invalid() {
        let mut parser = IncrementalPayloadParser::new();
        assert!(parser.push(r#"{"results":[{"id":1}]}"#).error.is_some());

        let mut parser = IncrementalPayloadParser::new();
        assert!(parser.push(r#"{"highlights":[1,2]}"#).error.is_some());
    }

    #[test]
    fn test_error_after_valid_envelope_in_later_chunk() {
        let mut parser = IncrementalPayloadParser::new();
        let first = parser.push(r#"{"highlights":[{"id":1}]}"#);
        assert_eq!(first.batches.len(), 1);
        assert!(first.error.is_none());

        let second = parser.push("garbage");
        assert!(second.batches.is_empty());
        assert!(matches!(second.error, Some(AppError::InvalidServerResponse(_))));
    }

    #[test]
    fn test_completed_envelope_survives_error_in_same_chunk() {
        let mut parser = IncrementalPayloadParser::new();
        let progress =
            parser.push("{\"highlights\":[{\"id\":1}]}\n{\"highlights\":[{\"id\":2}]}garbage");
        assert_eq!(ids(&progress.batches), vec![json!(1), json!(2)]);
        match progress.error {
            Some(AppError::InvalidServerResponse(msg)) => assert!(msg.contains("garbage")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_excerpt_truncates_long_text() {
        let long = "x".repeat(EXCERPT_CHARS + 10);
        let short = excerpt(&long);
        assert_eq!(short.chars().count(), EXCERPT_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(excerpt("abc"), "abc");
    }
}
