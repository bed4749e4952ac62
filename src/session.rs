use crate::backend::Backend;
use crate::capabilities::Capabilities;
use crate::frame::Frame;
use crate::types::{Latency, PointCloud, Pose, Timestamp};
use crate::{MocapError, Result};
use std::collections::BTreeMap;

/// Consecutive non-advancing frames tolerated within one wait before the
/// backend is treated as broken.
pub const MAX_STALE_FRAMES: u32 = 64;

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no frame received yet.
    Connected,
    /// Blocked inside `wait_for_next_frame`.
    AwaitingFrame,
    /// A frame is available through the accessors.
    FrameReady,
    /// The backend failed. Terminal.
    Disconnected,
}

/// A live connection to one motion-capture backend.
///
/// Drive it from a single thread: call `wait_for_next_frame`, then read the
/// accessors. The snapshot only changes inside `wait_for_next_frame`, which
/// takes `&mut self`, so reads between two waits always see the same frame.
pub struct CaptureSession {
    backend: Box<dyn Backend>,
    capabilities: Capabilities,
    state: SessionState,
    frame: Frame,
    last_sequence: Option<u64>,
    lost_reason: Option<String>,
}

impl CaptureSession {
    /// Wrap an already connected backend.
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::from_boxed(Box::new(backend))
    }

    pub fn from_boxed(backend: Box<dyn Backend>) -> Self {
        let capabilities = backend.capabilities();
        log::info!(
            "Capture session on '{}' connected, capabilities={:?}",
            backend.name(),
            capabilities
        );
        Self {
            backend,
            capabilities,
            state: SessionState::Connected,
            frame: Frame::default().conform(capabilities),
            last_sequence: None,
            lost_reason: None,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state != SessionState::Disconnected
    }

    /// Block until the backend delivers a new frame and make it current.
    ///
    /// Frames whose sequence does not advance are discarded. More than
    /// `MAX_STALE_FRAMES` of them in a row is a broken backend and ends the
    /// session with `ConnectionLost`. There is no timeout; a stalled backend
    /// blocks until it fails or delivers.
    pub fn wait_for_next_frame(&mut self) -> Result<&Frame> {
        self.ensure_connected()?;
        self.state = SessionState::AwaitingFrame;

        let mut stale = 0u32;
        let frame = loop {
            let frame = match self.backend.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    let reason = e.to_string();
                    log::warn!(
                        "Backend '{}' lost connection: {}",
                        self.backend.name(),
                        reason
                    );
                    self.disconnect(reason.clone());
                    return Err(MocapError::ConnectionLost {
                        reason,
                        source: Some(e),
                    });
                }
            };

            match self.last_sequence {
                Some(last) if frame.sequence() <= last => {
                    stale += 1;
                    if stale > MAX_STALE_FRAMES {
                        let reason = format!(
                            "frame sequence stuck at {} for {} frames (last {})",
                            frame.sequence(),
                            stale,
                            last
                        );
                        log::warn!("Backend '{}': {}", self.backend.name(), reason);
                        self.disconnect(reason.clone());
                        return Err(MocapError::ConnectionLost {
                            reason,
                            source: None,
                        });
                    }
                    log::debug!(
                        "Discarding stale frame {} from '{}' (last {})",
                        frame.sequence(),
                        self.backend.name(),
                        last
                    );
                }
                _ => break frame,
            }
        };

        self.last_sequence = Some(frame.sequence());
        self.frame = frame.conform(self.capabilities);
        self.state = SessionState::FrameReady;
        log::trace!("Frame {} ready", self.frame.sequence());
        Ok(&self.frame)
    }

    /// The current frame snapshot.
    pub fn frame(&self) -> Result<&Frame> {
        self.ensure_connected()?;
        Ok(&self.frame)
    }

    /// Poses of the current frame; empty if unsupported, and empty once the
    /// session is disconnected (check `is_connected`).
    pub fn rigid_bodies(&self) -> &BTreeMap<String, Pose> {
        self.frame.rigid_bodies()
    }

    /// Copy of the named pose from the current frame.
    pub fn rigid_body_by_name(&self, name: &str) -> Result<Pose> {
        self.ensure_connected()?;
        self.frame.rigid_body_by_name(name)
    }

    /// Unlabeled markers; zero rows if unsupported or disconnected.
    pub fn point_cloud(&self) -> &PointCloud {
        self.frame.point_cloud()
    }

    /// Empty if unsupported or disconnected.
    pub fn latency(&self) -> &[Latency] {
        self.frame.latency()
    }

    /// Current frame time in microseconds; zero if unsupported or
    /// disconnected.
    pub fn timestamp(&self) -> Timestamp {
        self.frame.timestamp()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn supports_rigid_body_tracking(&self) -> bool {
        self.capabilities.rigid_body_tracking()
    }

    pub fn supports_latency_estimate(&self) -> bool {
        self.capabilities.latency_estimate()
    }

    pub fn supports_point_cloud(&self) -> bool {
        self.capabilities.point_cloud()
    }

    pub fn supports_timestamp(&self) -> bool {
        self.capabilities.timestamp()
    }

    fn ensure_connected(&self) -> Result<()> {
        match &self.lost_reason {
            Some(reason) => Err(MocapError::ConnectionLost {
                reason: format!("session already disconnected ({})", reason),
                source: None,
            }),
            None => Ok(()),
        }
    }

    /// Enter the terminal state. The stale snapshot is dropped so the
    /// reference accessors return empty data from here on.
    fn disconnect(&mut self, reason: String) {
        self.state = SessionState::Disconnected;
        self.frame = Frame::default();
        self.lost_reason = Some(reason);
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("backend", &self.backend.name())
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .field("sequence", &self.last_sequence)
            .finish()
    }
}
