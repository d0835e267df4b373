//! Host integration traits for wardend
//!
//! The enforcement core talks to the host operating system through two
//! seams:
//! - `ForegroundMonitor`: a stream of "which app is frontmost" events
//! - `OverlayPresenter`: renders/removes the full-screen blocking surface
//!   and reports the user's acknowledgement
//!
//! Platform adapters implement these traits; tests use the mock
//! implementations in this crate.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
