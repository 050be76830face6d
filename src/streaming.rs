//! Decoder for agent replies.
//!
//! The backend answers a streaming request in one of two framings and does
//! not say which: a single JSON array of fragments, or Server-Sent Events whose
//! `data: ` payloads are fragment arrays. Every chunk is first tried as a whole
//! array; only when that fails does it join the SSE buffer.

use crate::models::{resolve_final, Fragment};
use tracing::debug;

const EVENT_DELIMITER: &str = "\n\n";
const DATA_PREFIX: &str = "data: ";

/// Which framing produced a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    DirectArray,
    SseFrames,
}

/// One parsed fragment array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub strategy: Strategy,
    pub fragments: Vec<Fragment>,
}

impl Batch {
    pub fn final_fragment(&self) -> Option<&Fragment> {
        resolve_final(&self.fragments)
    }

    /// Text of the resolved fragment, if non-empty.
    pub fn final_text(&self) -> Option<&str> {
        self.final_fragment().and_then(Fragment::usable_text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Reading,
    Complete,
}

/// Incremental decoder fed with raw body chunks in arrival order.
#[derive(Debug)]
pub struct ResponseDecoder {
    state: DecoderState,
    pending: String,
    utf8_tail: Vec<u8>,
    last_batch: Option<Batch>,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Reading,
            pending: String::new(),
            utf8_tail: Vec::new(),
            last_batch: None,
        }
    }

    /// True once a direct array arrived or the stream was finished.
    pub fn is_complete(&self) -> bool {
        self.state == DecoderState::Complete
    }

    /// Most recent batch seen, which carries the authoritative reply.
    pub fn last_batch(&self) -> Option<&Batch> {
        self.last_batch.as_ref()
    }

    pub fn final_text(&self) -> Option<&str> {
        self.last_batch.as_ref().and_then(Batch::final_text)
    }

    /// Consume one raw chunk and return the batches it completed.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Batch> {
        if self.is_complete() {
            return Vec::new();
        }

        let chunk = self.decode_utf8(bytes);
        if chunk.is_empty() {
            return Vec::new();
        }

        if let Some(fragments) = parse_direct(&chunk) {
            self.state = DecoderState::Complete;
            return self.record(vec![Batch {
                strategy: Strategy::DirectArray,
                fragments,
            }]);
        }

        self.pending.push_str(&chunk);
        let events = self.take_complete_events();
        let batches = events.iter().filter_map(|event| parse_event(event)).collect();
        self.record(batches)
    }

    /// Flush whatever is left once the transport signals end of body.
    ///
    /// The remainder is tried as a direct array first, which recovers an array
    /// split over several chunks, then as a final unterminated SSE event.
    pub fn finish(&mut self) -> Vec<Batch> {
        if self.is_complete() {
            return Vec::new();
        }
        self.state = DecoderState::Complete;

        if !self.utf8_tail.is_empty() {
            let tail = String::from_utf8_lossy(&self.utf8_tail).into_owned();
            self.utf8_tail.clear();
            self.pending.push_str(&tail);
        }

        let rest = std::mem::take(&mut self.pending);
        if rest.trim().is_empty() {
            return Vec::new();
        }

        if let Some(fragments) = parse_direct(&rest) {
            return self.record(vec![Batch {
                strategy: Strategy::DirectArray,
                fragments,
            }]);
        }

        let batches = rest
            .split(EVENT_DELIMITER)
            .filter_map(parse_event)
            .collect();
        self.record(batches)
    }

    fn record(&mut self, batches: Vec<Batch>) -> Vec<Batch> {
        if let Some(last) = batches.last() {
            self.last_batch = Some(last.clone());
        }
        batches
    }

    /// Split off every delimiter-terminated event, keeping the trailing
    /// partial segment buffered.
    fn take_complete_events(&mut self) -> Vec<String> {
        let Some(cut) = self.pending.rfind(EVENT_DELIMITER) else {
            return Vec::new();
        };
        let rest = self.pending.split_off(cut + EVENT_DELIMITER.len());
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(EVENT_DELIMITER)
            .map(str::to_string)
            .collect()
    }

    /// Decode bytes as UTF-8, holding back a code point cut at the chunk edge.
    fn decode_utf8(&mut self, bytes: &[u8]) -> String {
        self.utf8_tail.extend_from_slice(bytes);

        match std::str::from_utf8(&self.utf8_tail) {
            Ok(text) => {
                let text = text.to_string();
                self.utf8_tail.clear();
                text
            }
            Err(err) if err.error_len().is_none() => {
                let valid = err.valid_up_to();
                let text = String::from_utf8_lossy(&self.utf8_tail[..valid]).into_owned();
                self.utf8_tail.drain(..valid);
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.utf8_tail).into_owned();
                self.utf8_tail.clear();
                text
            }
        }
    }
}

/// Direct-array strategy: the whole chunk is one fragment array.
fn parse_direct(chunk: &str) -> Option<Vec<Fragment>> {
    serde_json::from_str::<Vec<Fragment>>(chunk).ok()
}

/// SSE strategy for a single event block.
fn parse_event(event: &str) -> Option<Batch> {
    if event.trim().is_empty() {
        return None;
    }
    let data = event.strip_prefix(DATA_PREFIX)?;

    match serde_json::from_str::<Vec<Fragment>>(data) {
        Ok(fragments) => Some(Batch {
            strategy: Strategy::SseFrames,
            fragments,
        }),
        Err(err) => {
            debug!(event, error = %err, "skipping unparseable SSE event");
            None
        }
    }
}
