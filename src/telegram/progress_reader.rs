//! Byte counting reader used to observe upload progress

use crate::telegram::ProgressSender;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Wraps a reader and reports the running byte count after every read
pub struct ProgressReader<R> {
    inner: R,
    read: u64,
    progress: ProgressSender,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, progress: ProgressSender) -> Self {
        ProgressReader {
            inner,
            read: 0,
            progress,
        }
    }

    /// Bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.read
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = &poll {
            let n = buf.filled().len() - before;
            if n > 0 {
                self.read += n as u64;
                // Receiver gone just means nobody is watching anymore
                let _ = self.progress.send(self.read);
            }
        }

        poll
    }
}
