//! Channel-fed backend for adapters that receive frames on their own thread.
//!
//! A producer (network receive loop, SDK callback, device reader) pushes
//! complete frames through a `FrameSender`; the session pulls them with
//! `next_frame`. The producer signals a broken transport with
//! `FrameSender::fail`, or simply by dropping every sender.

use crate::backend::Backend;
use crate::capabilities::Capabilities;
use crate::error::BackendError;
use crate::frame::Frame;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Why a stream backend stopped delivering frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("all frame producers disconnected")]
    Disconnected,

    #[error("no frame received within {0:?}")]
    Timeout(Duration),

    #[error("stream backend closed")]
    Closed,

    #[error("failed to spawn producer thread: {0}")]
    Spawn(String),
}

enum Message {
    Frame(Frame),
    Failed(BackendError),
}

/// Producer side of a stream backend. Cheap to clone.
#[derive(Clone)]
pub struct FrameSender {
    sender: Sender<Message>,
    stop_flag: Arc<AtomicBool>,
}

impl FrameSender {
    /// Queue a frame, blocking while the queue is full.
    pub fn send(&self, frame: Frame) -> Result<(), StreamError> {
        self.sender
            .send(Message::Frame(frame))
            .map_err(|_| StreamError::Closed)
    }

    /// Queue a frame without blocking. Returns `Ok(false)` and drops the
    /// frame if the consumer is behind.
    pub fn offer(&self, frame: Frame) -> Result<bool, StreamError> {
        match self.sender.try_send(Message::Frame(frame)) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                log::trace!("Frame queue full, dropping frame");
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(StreamError::Closed),
        }
    }

    /// Report a transport failure. The consumer sees it after any frames
    /// already queued.
    pub fn fail(&self, cause: impl Into<BackendError>) {
        if self.sender.send(Message::Failed(cause.into())).is_err() {
            log::debug!("Failure reported after stream backend was closed");
        }
    }

    /// True once the consuming backend has been dropped. Producer loops
    /// should exit when this turns true.
    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }
}

/// Backend that yields frames received from one or more `FrameSender`s.
pub struct StreamBackend {
    name: String,
    capabilities: Capabilities,
    receiver: Receiver<Message>,
    frame_timeout: Option<Duration>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Create a sender/backend pair with a queue of `capacity` frames.
pub fn channel(
    name: impl Into<String>,
    capabilities: Capabilities,
    capacity: usize,
) -> (FrameSender, StreamBackend) {
    let (sender, receiver) = crossbeam_channel::bounded(capacity);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let backend = StreamBackend {
        name: name.into(),
        capabilities,
        receiver,
        frame_timeout: None,
        stop_flag: stop_flag.clone(),
        thread: None,
    };
    (FrameSender { sender, stop_flag }, backend)
}

impl StreamBackend {
    /// Run `producer` on a dedicated thread that feeds this backend.
    ///
    /// The thread is joined when the backend is dropped, so the producer must
    /// return once `FrameSender::is_stopped` is true or a send fails.
    pub fn spawn<F>(
        name: impl Into<String>,
        capabilities: Capabilities,
        capacity: usize,
        producer: F,
    ) -> Result<StreamBackend, StreamError>
    where
        F: FnOnce(FrameSender) + Send + 'static,
    {
        let (sender, mut backend) = channel(name, capabilities, capacity);
        let thread = std::thread::Builder::new()
            .name(format!("mocap-{}", backend.name))
            .spawn(move || producer(sender))
            .map_err(|e| StreamError::Spawn(e.to_string()))?;
        backend.thread = Some(thread);
        log::info!("Stream backend '{}' producer started", backend.name);
        Ok(backend)
    }

    /// Treat a gap longer than `timeout` between frames as a lost transport.
    pub fn with_frame_timeout(mut self, timeout: Duration) -> Self {
        self.frame_timeout = Some(timeout);
        self
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        // Dropping the receiver unblocks a producer stuck in `send`.
        self.receiver = crossbeam_channel::never();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Stream backend '{}' producer panicked", self.name);
            }
        }
    }
}

impl Backend for StreamBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn next_frame(&mut self) -> Result<Frame, BackendError> {
        let message = match self.frame_timeout {
            None => self
                .receiver
                .recv()
                .map_err(|_| StreamError::Disconnected)?,
            Some(timeout) => self.receiver.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => StreamError::Timeout(timeout),
                RecvTimeoutError::Disconnected => StreamError::Disconnected,
            })?,
        };
        match message {
            Message::Frame(frame) => Ok(frame),
            Message::Failed(cause) => Err(cause),
        }
    }
}

impl Drop for StreamBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CaptureSession;
    use crate::types::{Pose, Quaternion, Timestamp};
    use crate::MocapError;
    use std::error::Error;

    fn frame(seq: u64) -> Frame {
        Frame::builder(seq)
            .rigid_body(Pose::new(
                "robot1",
                [seq as f32, 0.0, 0.0],
                Quaternion::IDENTITY,
                Timestamp::from_micros(seq * 1_000),
            ))
            .timestamp(Timestamp::from_micros(seq * 1_000))
            .build()
    }

    #[test]
    fn test_producer_thread_then_failure() {
        let backend = StreamBackend::spawn(
            "net",
            Capabilities::RIGID_BODY_TRACKING | Capabilities::TIMESTAMP,
            8,
            |tx| {
                for seq in 1..=3 {
                    tx.send(frame(seq)).unwrap();
                }
                tx.fail(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "peer reset",
                ));
            },
        )
        .unwrap();

        let mut session = CaptureSession::new(backend);
        for seq in 1..=3 {
            session.wait_for_next_frame().unwrap();
            assert_eq!(session.timestamp().as_micros(), seq * 1_000);
            assert_eq!(
                session.rigid_body_by_name("robot1").unwrap().position()[0],
                seq as f32
            );
        }

        let err = session.wait_for_next_frame().unwrap_err();
        let io = err
            .source()
            .and_then(|s| s.downcast_ref::<std::io::Error>())
            .unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionReset);
        assert!(!session.is_connected());
    }

    #[test]
    fn test_all_senders_dropped() {
        let (tx, backend) = channel("net", Capabilities::empty(), 1);
        drop(tx);
        let mut session = CaptureSession::new(backend);
        let err = session.wait_for_next_frame().unwrap_err();
        assert!(matches!(err, MocapError::ConnectionLost { .. }));
        let cause = err.source().unwrap().downcast_ref::<StreamError>();
        assert_eq!(cause, Some(&StreamError::Disconnected));
    }

    #[test]
    fn test_frame_timeout() {
        let (_tx, backend) = channel("net", Capabilities::empty(), 1);
        let mut backend = backend.with_frame_timeout(Duration::from_millis(20));
        let err = backend.next_frame().unwrap_err();
        assert_eq!(
            err.downcast_ref::<StreamError>(),
            Some(&StreamError::Timeout(Duration::from_millis(20)))
        );
    }

    #[test]
    fn test_offer_drops_when_full() {
        let (tx, mut backend) = channel("net", Capabilities::empty(), 1);
        assert!(tx.offer(frame(1)).unwrap());
        assert!(!tx.offer(frame(2)).unwrap());
        assert_eq!(backend.next_frame().unwrap().sequence(), 1);
        drop(backend);
        assert!(tx.is_stopped());
        assert_eq!(tx.offer(frame(3)), Err(StreamError::Closed));
    }

    #[test]
    fn test_drop_stops_producer() {
        let backend = StreamBackend::spawn("loop", Capabilities::empty(), 1, |tx| {
            let mut seq = 0;
            while !tx.is_stopped() {
                seq += 1;
                if tx.send(frame(seq)).is_err() {
                    break;
                }
            }
        })
        .unwrap();
        // Must not hang: the producer is blocked on a full queue.
        std::thread::sleep(Duration::from_millis(10));
        drop(backend);
    }
}
