use std::fmt::{Display, Formatter};
use std::rc::Rc;

use super::{BucketId, EntryId};

/// A cached key/value pair, linked into exactly one bucket's recency chain.
#[derive(Debug)]
pub(super) struct Entry<Key, Value> {
    /// The entry that was in this bucket before this one, towards the tail.
    pub(super) prev: Option<EntryId<Key, Value>>,
    /// The entry that arrived in this bucket after this one, towards the head.
    pub(super) next: Option<EntryId<Key, Value>>,
    /// Instead of searching for the owning bucket, we keep a handle to it.
    /// This keeps promotion an O(1) operation.
    pub(super) bucket: BucketId<Key, Value>,
    /// Shared with the lookup table so eviction can remove the table entry
    /// without requiring `Key: Clone`.
    pub(super) key: Rc<Key>,
    pub(super) value: Value,
}

impl<Key, Value> Entry<Key, Value> {
    pub(super) const fn new(key: Rc<Key>, value: Value, bucket: BucketId<Key, Value>) -> Self {
        Self {
            prev: None,
            next: None,
            bucket,
            key,
            value,
        }
    }
}

impl<Key: Display, Value: Display> Display for Entry<Key, Value> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}
