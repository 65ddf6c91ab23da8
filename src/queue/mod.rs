//! Bounded producer/consumer queue.
//!
//! - [`BoundedBlockingQueue`]: fixed-capacity FIFO queue with blocking,
//!   timed and non-blocking insert/remove
//! - [`InterruptToken`]: cancels blocking calls from another thread
//!
//! # Examples
//!
//! ```rust
//! use itersafe::queue::{BoundedBlockingQueue, InterruptToken};
//! use itersafe::CollectionError;
//! use std::thread;
//! use std::time::Duration;
//!
//! let queue: BoundedBlockingQueue<i32> = BoundedBlockingQueue::new(2).unwrap();
//! let token = InterruptToken::new();
//!
//! let consumer = {
//!     let queue = queue.clone();
//!     let token = token.clone();
//!     thread::spawn(move || queue.take(&token))
//! };
//!
//! thread::sleep(Duration::from_millis(20));
//! token.interrupt();
//! assert_eq!(consumer.join().unwrap(), Err(CollectionError::OperationInterrupted));
//! ```

mod blocking;
mod interrupt;

pub use blocking::BoundedBlockingQueue;
pub use interrupt::InterruptToken;
