use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

const DEFAULT_CHANNEL_CAPACITY: usize = 4;

type SendError = Box<dyn std::error::Error + Send + Sync>;
type ReadResult = Result<Option<Frame>, SendError>;

/// Reads frames on a dedicated thread so decoding overlaps detection.
///
/// Frames arrive in read order through a bounded channel; read failures are
/// forwarded unchanged so the session still sees them as failed reads.
/// Dropping the source stops the reader thread and closes the inner source.
pub struct ThreadedFrameSource {
    receiver: Option<crossbeam_channel::Receiver<ReadResult>>,
    cancelled: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
    finished: bool,
}

impl ThreadedFrameSource {
    pub fn spawn(source: Box<dyn FrameSource>) -> Self {
        Self::with_capacity(source, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(source: Box<dyn FrameSource>, capacity: usize) -> Self {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(capacity.max(1));
        let cancelled = Arc::new(AtomicBool::new(false));
        let handle = spawn_reader(source, frame_tx, cancelled.clone());
        Self {
            receiver: Some(frame_rx),
            cancelled,
            handle: Some(handle),
            finished: false,
        }
    }

    fn shutdown(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
        // Unblocks a reader waiting on a full channel.
        self.receiver = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Frame reader thread panicked");
            }
        }
        self.finished = true;
    }
}

fn spawn_reader(
    mut source: Box<dyn FrameSource>,
    frame_tx: crossbeam_channel::Sender<ReadResult>,
    cancelled: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while !cancelled.load(Ordering::Relaxed) {
            let result = source
                .next_frame()
                .map_err(|e| -> SendError { e.to_string().into() });
            let end_of_stream = matches!(result, Ok(None));
            if frame_tx.send(result).is_err() || end_of_stream {
                break;
            }
        }
        source.close();
    })
}

impl FrameSource for ThreadedFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.finished {
            return Ok(None);
        }
        let Some(receiver) = self.receiver.as_ref() else {
            return Ok(None);
        };
        match receiver.recv() {
            Ok(Ok(Some(frame))) => Ok(Some(frame)),
            Ok(Ok(None)) | Err(_) => {
                self.finished = true;
                Ok(None)
            }
            Ok(Err(e)) => Err(e),
        }
    }

    fn close(&mut self) {
        self.shutdown();
    }
}

impl Drop for ThreadedFrameSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}
