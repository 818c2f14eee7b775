#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(missing_docs)]

//! This crate provides an LFU cache with constant time insertion, fetching,
//! and eviction, no matter how many entries it holds or how far apart their
//! access counts are.
//!
//! Entries are grouped into frequency buckets, one per distinct access count,
//! and the buckets form a chain in ascending frequency order. Each bucket
//! keeps its own recency chain, so the eviction victim is always the oldest
//! entry of the lowest bucket. Reading an entry moves it into the bucket for
//! the next frequency, which is either its current bucket's neighbour or a new
//! bucket spliced in right after it.
//!
//! Entries and buckets are stored in arenas and linked by index handles
//! rather than pointers. Removing a bucket or an entry frees its slot, which
//! is reused by the next allocation.
//!
//! ```
//! use bucket_lfu::LfuCache;
//!
//! let mut cache = LfuCache::new(2).unwrap();
//! cache.put("a", 1);
//! cache.put("b", 2);
//!
//! // Reads are counted, overwrites are not.
//! assert_eq!(cache.get(&"a"), Some(&1));
//! cache.put("b", 20);
//! assert_eq!(cache.frequency(&"a"), Some(1));
//! assert_eq!(cache.frequency(&"b"), Some(0));
//!
//! // "b" has the lowest access count, so it makes room for "c".
//! cache.put("c", 3);
//! assert!(cache.get(&"b").is_none());
//! assert_eq!(cache.frequencies().collect::<Vec<_>>(), vec![0, 1]);
//! ```
//!
//! The cache is not internally synchronized. It is [`Send`], so sharing it
//! between threads means wrapping it in a lock such as
//! [`Mutex`](std::sync::Mutex).

mod arena;
mod error;
mod lfu;

pub use error::{ConfigError, InvariantError};
pub use lfu::{Frequencies, IntoIter, Iter, LfuCache};
