//! Enforcement engine for wardend
//!
//! This crate is the heart of wardend, containing:
//! - The session state machine (Idle -> Watching -> Blocked)
//! - The timer registry (at most one countdown per app, generation-checked
//!   cancellation)
//! - The tagged event type the daemon's select loop folds into the engine,
//!   and the effects the engine emits back (overlay show/hide, blocked-flag
//!   write-back, home navigation)

mod engine;
mod events;
mod registry;

pub use engine::*;
pub use events::*;
pub use registry::*;
