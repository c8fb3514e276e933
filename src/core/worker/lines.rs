// ─── Lossy Lines ───
// Line reader for child-process output. Bytes that are not valid UTF-8
// (legacy code pages on Windows, Latin-1 locales) are replaced, never
// treated as end of stream.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

pub struct LossyLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Next line without its `\n` / `\r\n`. `Ok(None)` at end of stream.
    ///
    /// Cancel safe: bytes read before a cancellation stay buffered for the
    /// next call.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let mut raw = std::mem::take(&mut self.buf);
        while matches!(raw.last(), Some(b'\n' | b'\r')) {
            raw.pop();
        }
        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }
}
