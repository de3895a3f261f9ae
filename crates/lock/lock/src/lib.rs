//! Distributed singleton lock contract.
//!
//! A singleton lock makes sure only one instance of a logically identical
//! unit of work runs at a time across a fleet of workers. The
//! [`LockBackend`] trait is the seam between the caller that decides what
//! needs locking and the store that records who holds each lock; backends
//! live in their own crates.

pub mod backend;
pub mod error;
pub mod testing;

pub use backend::{LockBackend, validate_lock_name, validate_ttl};
pub use error::LockError;
