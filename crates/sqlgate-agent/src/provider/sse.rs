//! Incremental decoder for `text/event-stream` bodies.
//!
//! Only `data:` fields are kept; `event:`, `id:`, `retry:` and comment lines
//! are dropped. Bytes are buffered until a full line is available, so
//! multi-byte characters split across network chunks decode correctly.

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed one network chunk; returns the data payloads of every event the
    /// chunk completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_owned());
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_events_on_blank_lines() {
        let mut dec = SseDecoder::default();
        let events = dec.push(b"data: {\"a\":1}\n\ndata: {\"a\":2}\n\n");
        assert_eq!(events, vec!["{\"a\":1}", "{\"a\":2}"]);
    }

    #[test]
    fn holds_partial_lines_until_complete() {
        let mut dec = SseDecoder::default();
        assert!(dec.push(b"data: hel").is_empty());
        assert!(dec.push(b"lo\n").is_empty());
        assert_eq!(dec.push(b"\n"), vec!["hello"]);
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let text = "data: caf\u{e9}\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let mut dec = SseDecoder::default();
        assert!(dec.push(&text[..split]).is_empty());
        assert_eq!(dec.push(&text[split..]), vec!["caf\u{e9}"]);
    }

    #[test]
    fn ignores_comments_and_other_fields() {
        let mut dec = SseDecoder::default();
        let events = dec.push(b": keep-alive\nevent: message\nid: 7\ndata: x\r\n\r\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn joins_multi_line_data() {
        let mut dec = SseDecoder::default();
        assert_eq!(dec.push(b"data: a\ndata: b\n\n"), vec!["a\nb"]);
    }
}
