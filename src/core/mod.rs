//! The scheduling decision engine.
//!
//! Everything that moves an event through its lifecycle lives here: quota
//! evaluation over recorded responses, date consensus over availability
//! votes, random activity selection per topic, the state machine driving
//! pending → confirmed/cancelled → deleted, and the expiry sweep. The
//! HTTP handlers only ever call the entry points exposed by these
//! modules; every operation takes an explicit connection or pool, never
//! an ambient one.

pub mod activity;
pub mod consensus;
pub mod error;
pub mod lifecycle;
pub mod quota;
pub mod sweep;
pub mod validate;

pub use error::CoreError;
