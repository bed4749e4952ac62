use crate::capabilities::Capabilities;
use crate::error::BackendError;
use crate::frame::Frame;

/// A motion-capture system behind the common capture interface.
///
/// Implementations own their transport (socket, SDK handle, device) and may
/// read it from background threads, but frames reach the session only
/// through `next_frame`.
pub trait Backend: Send {
    /// Identifier used in log messages.
    fn name(&self) -> &str;

    /// What this backend produces. Must not change after construction.
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Block until the next frame is available.
    ///
    /// An error means the transport is gone; the session will not call this
    /// again.
    fn next_frame(&mut self) -> Result<Frame, BackendError>;
}
