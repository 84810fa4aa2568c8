use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use shared::error::Result;
use tokio::sync::watch;

/// One encoded media frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub content: Bytes,
    pub duration: Duration,
    /// Target the encoder was following when it produced this frame.
    pub target_bitrate: u64,
}

/// Where encoded frames end up, typically a local media track.
#[async_trait]
pub trait MediaWriter: Send + Sync {
    async fn write_frame(&self, frame: &Frame) -> Result<()>;
}

/// The encoder facing end of rate control.
///
/// Holds the most recent target bitrate. The encoder reads it before each
/// frame, the rate controller replaces it on every accepted estimate.
pub struct EncodingSink {
    target: watch::Sender<u64>,
    writer: Arc<dyn MediaWriter>,
}

impl EncodingSink {
    pub fn new(initial_bitrate: u64, writer: Arc<dyn MediaWriter>) -> Self {
        let (target, _) = watch::channel(initial_bitrate);
        Self { target, writer }
    }

    pub fn set_target_bitrate(&self, bps: u64) {
        self.target.send_replace(bps);
    }

    pub fn target_bitrate(&self) -> u64 {
        *self.target.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.target.subscribe()
    }

    pub async fn write_frame(&self, frame: &Frame) -> Result<()> {
        self.writer.write_frame(frame).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<usize>>);

    #[async_trait]
    impl MediaWriter for Collect {
        async fn write_frame(&self, frame: &Frame) -> Result<()> {
            self.0.lock()?.push(frame.content.len());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_forwards_frames_and_targets() -> Result<()> {
        let writer = Arc::new(Collect::default());
        let sink = EncodingSink::new(800_000, writer.clone());
        let mut target_rx = sink.subscribe();

        assert_eq!(sink.target_bitrate(), 800_000);
        sink.set_target_bitrate(300_000);
        assert!(target_rx.has_changed().unwrap_or(false));
        assert_eq!(*target_rx.borrow_and_update(), 300_000);

        sink.write_frame(&Frame {
            content: Bytes::from_static(&[0u8; 42]),
            duration: Duration::from_millis(40),
            target_bitrate: 300_000,
        })
        .await?;
        assert_eq!(*writer.0.lock()?, vec![42]);
        Ok(())
    }
}
