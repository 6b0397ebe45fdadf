/// Incremental decoder from raw transport bytes to SSE `data:` payloads.
///
/// Raw bytes are buffered until a full `\n`-terminated line is available, so
/// both logical events and multi-byte UTF-8 sequences may be split across
/// read boundaries arbitrarily. Lines without the `data: ` prefix (comments,
/// `event:` headers, blank keep-alives) are discarded.
#[derive(Default)]
pub struct SseLineDecoder {
    buf: Vec<u8>,
}

impl SseLineDecoder {
    /// Appends one raw chunk and returns every `data:` payload whose line is
    /// now fully delimited. The trailing unterminated segment stays buffered.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(idx) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=idx).collect();
            if let Some(payload) = data_payload(&line[..line.len() - 1]) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes the retained segment at end-of-stream as one final line.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        if rest.is_empty() {
            return None;
        }
        data_payload(&rest)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(line);
    let line = text.strip_suffix('\r').unwrap_or(&text);
    line.strip_prefix("data: ").map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_in_chunks(input: &[u8], chunk_size: usize) -> Vec<String> {
        let mut decoder = SseLineDecoder::default();
        let mut lines = Vec::new();
        for chunk in input.chunks(chunk_size) {
            lines.extend(decoder.push_chunk(chunk));
        }
        lines.extend(decoder.finish());
        lines
    }

    #[test]
    fn chunk_partition_does_not_change_decoded_lines() {
        let input = b"data: {\"a\":1}\nevent: ping\n\ndata: {\"b\":2}\ndata: tail";
        let whole = decode_in_chunks(input, input.len());
        for chunk_size in 1..=input.len() {
            assert_eq!(
                decode_in_chunks(input, chunk_size),
                whole,
                "partition with chunk size {chunk_size} diverged"
            );
        }
        assert_eq!(whole, vec!["{\"a\":1}", "{\"b\":2}", "tail"]);
    }

    #[test]
    fn multibyte_character_split_across_chunks_survives() {
        let input = "data: héllo wörld\n".as_bytes();
        // Split inside the two-byte encoding of 'é'.
        let mut decoder = SseLineDecoder::default();
        assert!(decoder.push_chunk(&input[..7]).is_empty());
        let lines = decoder.push_chunk(&input[7..]);
        assert_eq!(lines, vec!["héllo wörld"]);
    }

    #[test]
    fn non_data_lines_are_discarded() {
        let mut decoder = SseLineDecoder::default();
        let lines = decoder.push_chunk(b": comment\nevent: delta\n\ndata: kept\n");
        assert_eq!(lines, vec!["kept"]);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let mut decoder = SseLineDecoder::default();
        let lines = decoder.push_chunk(b"data: one\r\ndata: two\r\n");
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn finish_flushes_unterminated_data_line_once() {
        let mut decoder = SseLineDecoder::default();
        assert!(decoder.push_chunk(b"data: partial").is_empty());
        assert_eq!(decoder.finish(), Some("partial".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn finish_is_empty_for_fully_consumed_input() {
        let mut decoder = SseLineDecoder::default();
        let _ = decoder.push_chunk(b"data: full\n");
        assert_eq!(decoder.finish(), None);
    }
}
