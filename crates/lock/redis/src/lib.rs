//! Redis singleton lock backend.
//!
//! This crate provides a Redis-backed implementation of the [`LockBackend`]
//! trait from `singleton-lock`.
//!
//! # Features
//!
//! - **Atomic acquisition**: one `SET NX PX` per attempt, no read-then-write.
//! - **Sentinel discovery**: a `sentinel://h1;sentinel://h2` address is
//!   resolved to the current master at construction.
//! - **Connection pooling**: uses `deadpool-redis` for connection management.
//! - **Incremental clearing**: prefix clears walk the key space with `SCAN`.
//!
//! # Lock Consistency
//!
//! | Deployment | Mutual Exclusion | Notes |
//! |------------|------------------|-------|
//! | Single instance | Strong | Full mutual exclusion guaranteed |
//! | Sentinel | Weak | Lock may be lost during failover |
//!
//! See the [`backend`] module documentation for details.
//!
//! # Example
//!
//! ```ignore
//! use singleton_lock::LockBackend;
//! use singleton_lock_redis::{BackendOptions, RedisConfig, RedisLockBackend};
//!
//! let config = RedisConfig::new("sentinel://10.0.0.1;sentinel://10.0.0.2")
//!     .with_options(BackendOptions {
//!         master_name: Some("mymaster".into()),
//!         ..BackendOptions::default()
//!     });
//! let locks = RedisLockBackend::connect(&config).await?;
//!
//! if locks.acquire("report:daily", &task_id, Some(Duration::from_secs(600))).await? {
//!     // run the report...
//!     locks.release("report:daily").await?;
//! }
//! ```
//!
//! [`LockBackend`]: singleton_lock::LockBackend

pub mod address;
pub mod backend;
mod config;
mod error;
mod resolver;

pub use address::{SentinelEndpoint, StoreAddress, TopologyDescriptor};
pub use backend::RedisLockBackend;
pub use config::{BackendOptions, RedisConfig, SentinelCredentials};
