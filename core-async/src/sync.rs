//! Synchronization primitives.
//!
//! Channels here are the only hand-off points between the worker pool and the
//! controlling thread. Sending on a channel happens-before the matching
//! receive, which is what lets a worker write a result without any lock and
//! the receiver read it afterwards.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::mpsc;
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! std::thread::spawn(move || tx.send(7).unwrap());
//! assert_eq!(rx.blocking_recv(), Some(7));
//! ```

pub use tokio::sync::{broadcast, mpsc, oneshot, Notify};
