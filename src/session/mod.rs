//! Session correlation and idle eviction.
//!
//! An inbound message records which platform user a conversation belongs to;
//! the asynchronous reply arriving later is routed through that record.
//!
//! # Architecture
//!
//! - [`Session`]: Snapshot of one tracked conversation
//! - [`SessionStore`]: Thread-safe store for all active sessions
//! - [`SessionSweeper`]: Background task evicting idle sessions
//!
//! # Example
//!
//! ```rust
//! use messenger_dx_relay::session::SessionStore;
//!
//! let store = SessionStore::new();
//! store.put("C1", "U1");
//!
//! let session = store.get("C1").unwrap();
//! assert_eq!(session.user_id, "U1");
//! ```

mod store;
mod sweeper;

pub use store::{Session, SessionStore};
pub use sweeper::{SessionSweeper, SweeperHandle};
