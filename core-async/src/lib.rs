//! Executor and threading primitives for the speaker output core.
//!
//! Every other crate in the workspace goes through this crate instead of
//! depending on tokio directly, so the executor can be swapped in one place.
//!
//! # Modules
//!
//! - `runtime`: Building the background worker pool and one-off `block_on`
//! - `task`: Spawning blocking bodies and async tasks
//! - `sync`: Channels used to hand results between threads
//!
//! # Examples
//!
//! ```rust
//! use core_async::runtime::WorkerPoolBuilder;
//!
//! let pool = WorkerPoolBuilder::new("example-worker", 2).build().unwrap();
//! let handle = pool.handle().spawn_blocking(|| 40 + 2);
//! assert_eq!(core_async::runtime::block_on(handle).unwrap(), 42);
//! ```

pub mod runtime;
pub mod sync;
pub mod task;

pub use task::{spawn, spawn_blocking};
