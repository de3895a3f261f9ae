//! In-memory singleton lock backend.
//!
//! Useful in tests and single-process deployments where every worker shares
//! one address space. Locks do not survive the process.

mod backend;

pub use backend::MemoryLockBackend;
