use std::{collections::VecDeque, io};

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

const READ_CHUNK: usize = 256;

/// Splits a byte stream into lines terminated by CR, LF or CRLF.
///
/// Bytes of an unterminated line stay buffered until a later chunk supplies
/// the terminator. Empty segments between terminators are skipped, so `\r\n`
/// yields a single line.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    /// Create an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\r' || byte == b'\n' {
                if !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Bytes of the line still waiting for its terminator.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    fn discard(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }
}

/// Lazy sequence of complete lines read from an async byte source.
///
/// Not restartable: once the source reports end of stream, `next_line`
/// keeps returning `Ok(None)`.
pub struct FramedLines<R> {
    reader: R,
    framer: LineFramer,
    ready: VecDeque<String>,
    finished: bool,
}

impl<R> FramedLines<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framer: LineFramer::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    /// Next complete line, or `None` at end of stream.
    ///
    /// A trailing partial line left when the stream ends is dropped.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.finished {
                return Ok(None);
            }

            let read = self.reader.read(&mut chunk).await?;
            if read == 0 {
                let discarded = self.framer.discard();
                if discarded > 0 {
                    debug!(discarded, "stream ended inside a line; dropping partial bytes");
                }
                self.finished = true;
                continue;
            }
            self.ready.extend(self.framer.push(&chunk[..read]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn split_line_is_reassembled() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"Button 2 PRE").is_empty());
        assert_eq!(framer.pending(), b"Button 2 PRE");
        assert_eq!(framer.push(b"SSED\n"), vec!["Button 2 PRESSED".to_string()]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn any_terminator_combination_yields_one_line_each() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"a\r\nb\rc\n\n\r\nd");
        assert_eq!(lines, vec!["a", "b", "c"]);
        assert_eq!(framer.pending(), b"d");
    }

    #[test]
    fn crlf_split_across_reads_does_not_emit_empty_line() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b"Button 1 RELEASED\r"), vec!["Button 1 RELEASED"]);
        assert!(framer.push(b"\n").is_empty());
    }

    #[test]
    fn multibyte_character_split_across_reads_survives() {
        let mut framer = LineFramer::new();
        let bytes = "é\n".as_bytes();
        assert!(framer.push(&bytes[..1]).is_empty());
        assert_eq!(framer.push(&bytes[1..]), vec!["é".to_string()]);
    }

    #[tokio::test]
    async fn framed_lines_drop_trailing_partial_on_eof() {
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"Button 1 PRESSED\nButton 1 REL").await.unwrap();
        drop(tx);

        let mut lines = FramedLines::new(rx);
        assert_eq!(
            lines.next_line().await.unwrap(),
            Some("Button 1 PRESSED".to_string())
        );
        assert_eq!(lines.next_line().await.unwrap(), None);
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn framed_lines_wait_for_terminator_across_writes() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut lines = FramedLines::new(rx);

        tx.write_all(b"Button 2 PRE").await.unwrap();
        tx.write_all(b"SSED\n").await.unwrap();
        assert_eq!(
            lines.next_line().await.unwrap(),
            Some("Button 2 PRESSED".to_string())
        );
    }
}
