use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading newline-delimited JSON documents from a chunk
/// stream.
///
/// Ollama answers with one document per line when streaming and a single
/// document (not always newline-terminated) otherwise, so the trailing
/// bytes at end of stream are treated as a final line.
pub struct NdJson {
    buf: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl NdJson {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    /// Returns the next non-blank line, without the line terminator.
    pub async fn next_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(line) = self.try_take_line()? {
                return Ok(Some(line));
            }

            if self.exhausted {
                let rest = std::mem::take(&mut self.buf);
                return decode_line(&rest);
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }
    }

    fn try_take_line(&mut self) -> Result<Option<String>, Error> {
        // Blank lines are skipped, keep going until a line has content
        // or no complete line is left.
        while let Some(eol_idx) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=eol_idx).collect();
            if let Some(line) = decode_line(&line[..eol_idx])? {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }
}

fn decode_line(bytes: &[u8]) -> Result<Option<String>, Error> {
    let Ok(line) = str::from_utf8(bytes) else {
        return Err(Error::InvalidPayload);
    };
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(line.to_owned()))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn test_normal_lines() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"{\"a\":1}\n"),
                Bytes::from_static(b"{\"b\":2}\n"),
            ]
            .into(),
        );
        let mut lines = NdJson::new(chunks);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"b\":2}");
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_chunks_and_missing_terminator() {
        let chunks = Chunks::from_vec_deque(
            vec![
                Bytes::from_static(b"{\"a\""),
                Bytes::from_static(b":1}\r\n\n"),
                Bytes::from_static(b"{\"done\":true}"),
            ]
            .into(),
        );
        let mut lines = NdJson::new(chunks);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "{\"done\":true}"
        );
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        let text = "{\"content\":\"héllo\"}\n".as_bytes();
        let (head, tail) = text.split_at(14);
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::copy_from_slice(head), Bytes::copy_from_slice(tail)]
                .into(),
        );
        let mut lines = NdJson::new(chunks);
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "{\"content\":\"héllo\"}"
        );
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(b"\xff\xfe\n")].into(),
        );
        let mut lines = NdJson::new(chunks);
        assert_eq!(lines.next_line().await.unwrap_err(), Error::InvalidPayload);
    }
}
