//! The sign-in dispatch engine.
//!
//! [`scheduler::Scheduler`] polls the store for tracked identities on a
//! fixed interval and fans out one [`dispatcher::Dispatcher`] invocation
//! per (identity, session) as a detached task. Each invocation runs the
//! classify / cooldown / submit state machine on its own; there is no
//! supervisor, no join, and no cross-worker ordering beyond last-write-wins
//! on individual store keys.

pub mod cooldown;
pub mod dispatcher;
pub mod gps;
pub mod scheduler;
