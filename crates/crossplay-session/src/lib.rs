//! Live session management for Crossplay.
//!
//! This crate tracks who is connected and how to reach them:
//!
//! 1. **Sessions** — a cloneable handle per client with a non-blocking
//!    send ([`Session`])
//! 2. **Registry** — the thread-safe set of broadcast-eligible sessions
//!    ([`SessionRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub (above)  ← broadcasts to and replies through sessions
//!     ↕
//! Session Layer (this crate)  ← membership and per-client send queues
//!     ↕
//! Transport Layer (below)  ← provides ConnectionId
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::{SessionRegistry, Visit};
pub use session::{Session, SessionOutbound};
