//! # motioncapture - one polling interface over motion-capture backends
//!
//! Optical rigs, VR trackers and marker systems all end up behind the same
//! [`CaptureSession`]: wait for a frame, then read rigid-body poses, the
//! unlabeled marker cloud, latency estimates and the frame timestamp.
//!
//! ## Quick Start
//! ```no_run
//! use motioncapture::{Config, Registry};
//!
//! let registry = Registry::with_defaults();
//! let config = Config::new().with("rigid_bodies", "robot1(1,2,3)");
//! let mut session = registry.connect("mock", &config).unwrap();
//!
//! for _ in 0..100 {
//!     session.wait_for_next_frame().unwrap();
//!     for (name, pose) in session.rigid_bodies() {
//!         println!("{}: {:?}", name, pose.position());
//!     }
//! }
//! ```

pub mod backend;
pub mod backends;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod frame;
pub mod registry;
pub mod session;
pub mod types;

pub use backend::Backend;
pub use capabilities::Capabilities;
pub use config::Config;
pub use error::{BackendError, ConfigError, MocapError};
pub use frame::{Frame, FrameBuilder};
pub use registry::{BackendFactory, FactoryResult, Registry};
pub use session::{CaptureSession, SessionState, MAX_STALE_FRAMES};
pub use types::*;

/// Result type alias for motioncapture operations.
pub type Result<T> = std::result::Result<T, MocapError>;

/// Crate version string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
