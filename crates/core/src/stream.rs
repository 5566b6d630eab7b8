//! One-shot readers over fetched content

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, ReadBuf};

/// Boxed sequential reader returned by `get_content_stream`
pub type ContentStream = Pin<Box<dyn AsyncRead + Send>>;

/// Sequential reader over an in-memory buffer
///
/// Bytes are consumed as they are read; once exhausted every read
/// returns zero bytes. The reader cannot be rewound.
#[derive(Debug, Default)]
pub struct ContentReader {
    data: Bytes,
}

impl ContentReader {
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Bytes not yet read
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn into_stream(self) -> ContentStream {
        Box::pin(self)
    }
}

impl AsyncRead for ContentReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let n = buf.remaining().min(self.data.len());
        buf.put_slice(&self.data[..n]);
        self.data.advance(n);
        Poll::Ready(Ok(()))
    }
}

impl io::Read for ContentReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data.advance(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_read_to_end() {
        use tokio::io::AsyncReadExt;

        let mut stream = ContentReader::new(Bytes::from_static(b"hello world")).into_stream();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");

        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
    }

    #[test]
    fn test_sync_read_in_chunks() {
        use std::io::Read;

        let mut reader = ContentReader::new(Bytes::from_static(b"abcdef"));
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.remaining(), 2);
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }
}
