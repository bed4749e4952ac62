//! Backends shipped with the crate. Vendor adapters live outside and
//! implement `Backend` directly or feed a `stream::StreamBackend`.

pub mod mock;
pub mod stream;

pub use mock::MockBackend;
pub use stream::{FrameSender, StreamBackend, StreamError};
