//! Live collection integration tests.
//!
//! Exercises a `LiveCollection` against an in-memory backend and an
//! in-process push channel:
//! - Push events merged with snapshots (duplicates, out-of-order, partial)
//! - Refreshes racing push events, local state across snapshots
//! - Writes routed through the store and echoed back over the channel

#[path = "../support/mod.rs"]
mod support;

mod logs;
mod refresh;
mod writes;
