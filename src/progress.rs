use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::info;

/// Size of the frames handed to the HTTP client.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Logs upload progress in steps of a tenth of a percent.
#[derive(Debug)]
pub struct Progress {
    total: u64,
    done: u64,
    reported: Option<u64>,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total: total as u64,
            done: 0,
            reported: None,
        }
    }

    /// Records `bytes` more transferred. Returns the percentage when a line was logged.
    pub fn advance(&mut self, bytes: usize) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        self.done = (self.done + bytes as u64).min(self.total);
        let per_mille = (self.done * 1000 + self.total / 2) / self.total;
        if per_mille == 0 || self.reported.is_some_and(|last| per_mille <= last) {
            return None;
        }
        self.reported = Some(per_mille);

        let percent = per_mille as f64 / 10.0;
        info!("Upload {:.1}% complete", percent);
        Some(percent)
    }
}

/// In-memory request body that advances a [`Progress`] as the client pulls frames.
#[derive(Debug)]
pub struct ProgressBody {
    remaining: Bytes,
    progress: Progress,
}

impl ProgressBody {
    pub fn new(payload: Bytes) -> Self {
        let progress = Progress::new(payload.len());
        Self {
            remaining: payload,
            progress,
        }
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}

impl Body for ProgressBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        let this = self.get_mut();
        if this.is_empty() {
            return Poll::Ready(None);
        }
        let n = this.remaining.len().min(CHUNK_SIZE);
        let chunk = this.remaining.split_to(n);
        this.progress.advance(n);
        Poll::Ready(Some(Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tracing_test::traced_test;

    #[test]
    fn test_reports_one_decimal_steps() {
        let mut progress = Progress::new(2000);
        assert_eq!(progress.advance(1), Some(0.1));
        assert_eq!(progress.advance(1), None);
        assert_eq!(progress.advance(998), Some(50.0));
        assert_eq!(progress.advance(1000), Some(100.0));
        assert_eq!(progress.advance(10), None);
    }

    #[test]
    fn test_tiny_steps_are_suppressed() {
        let mut progress = Progress::new(1_000_000);
        let logged = (0..1000)
            .filter_map(|_| progress.advance(1000))
            .count();
        assert_eq!(logged, 1000);

        let mut progress = Progress::new(1_000_000);
        let logged = (0..10_000).filter_map(|_| progress.advance(100)).count();
        assert_eq!(logged, 1000);
    }

    #[test]
    fn test_empty_total() {
        let mut progress = Progress::new(0);
        assert_eq!(progress.advance(0), None);
    }

    #[tokio::test]
    async fn test_body_yields_whole_payload_in_chunks() {
        let payload: Vec<u8> = (0..CHUNK_SIZE * 3 + 5).map(|i| (i % 7) as u8).collect();
        let mut body = ProgressBody::new(Bytes::from(payload.clone()));
        assert_eq!(body.size_hint().exact(), Some(payload.len() as u64));

        let mut frames = 0;
        let mut collected = Vec::new();
        while let Some(frame) = body.frame().await {
            let data = frame.unwrap().into_data().unwrap();
            assert!(data.len() <= CHUNK_SIZE);
            collected.extend_from_slice(&data);
            frames += 1;
        }
        assert_eq!(frames, 4);
        assert_eq!(collected, payload);
        assert!(body.is_end_stream());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_body_logs_progress_while_read() {
        let body = ProgressBody::new(Bytes::from(vec![0u8; CHUNK_SIZE * 4]));
        body.collect().await.unwrap();

        assert!(logs_contain("Upload 25.0% complete"));
        assert!(logs_contain("Upload 50.0% complete"));
        assert!(logs_contain("Upload 100.0% complete"));
    }
}
