use std::hash::Hash;
use std::iter::FusedIterator;

use crate::arena::Arena;

use super::{BucketId, Entry, EntryId, FrequencyBucket, LfuCache};

/// An iterator over the frequencies of the live buckets, lowest first. Calling
/// [`Iterator::rev`] walks the chain from the highest bucket downward.
///
/// This is constructed by calling [`LfuCache::frequencies`].
pub struct Frequencies<'a, Key, Value> {
    buckets: &'a Arena<FrequencyBucket<Key, Value>>,
    front: Option<BucketId<Key, Value>>,
    back: Option<BucketId<Key, Value>>,
    remaining: usize,
}

impl<'a, Key, Value> Frequencies<'a, Key, Value> {
    pub(super) const fn new(
        buckets: &'a Arena<FrequencyBucket<Key, Value>>,
        front: Option<BucketId<Key, Value>>,
        back: Option<BucketId<Key, Value>>,
    ) -> Self {
        Self {
            buckets,
            front,
            back,
            remaining: buckets.len(),
        }
    }
}

impl<'a, Key, Value> Iterator for Frequencies<'a, Key, Value> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let bucket = self.buckets.get(self.front?)?;
        self.front = bucket.next;
        self.remaining -= 1;
        Some(bucket.frequency)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, Key, Value> DoubleEndedIterator for Frequencies<'a, Key, Value> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let bucket = self.buckets.get(self.back?)?;
        self.back = bucket.prev;
        self.remaining -= 1;
        Some(bucket.frequency)
    }
}

impl<'a, Key, Value> ExactSizeIterator for Frequencies<'a, Key, Value> {}

impl<'a, Key, Value> FusedIterator for Frequencies<'a, Key, Value> {}

/// A borrowing iterator over the keys, values, and frequencies of an LFU
/// cache, in the order they would be evicted. This does **not** count as an
/// access for any of the entries.
///
/// This is constructed by calling [`LfuCache::iter`].
pub struct Iter<'a, Key, Value> {
    buckets: &'a Arena<FrequencyBucket<Key, Value>>,
    entries: &'a Arena<Entry<Key, Value>>,
    bucket: Option<BucketId<Key, Value>>,
    entry: Option<EntryId<Key, Value>>,
    remaining: usize,
}

impl<'a, Key, Value> Iter<'a, Key, Value> {
    pub(super) const fn new(
        buckets: &'a Arena<FrequencyBucket<Key, Value>>,
        entries: &'a Arena<Entry<Key, Value>>,
        lowest: Option<BucketId<Key, Value>>,
    ) -> Self {
        Self {
            buckets,
            entries,
            bucket: lowest,
            entry: None,
            remaining: entries.len(),
        }
    }
}

impl<'a, Key, Value> Iterator for Iter<'a, Key, Value> {
    type Item = (&'a Key, &'a Value, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let buckets = self.buckets;
        let entries = self.entries;

        loop {
            if let Some(id) = self.entry {
                let entry = entries.get(id)?;
                let frequency = buckets.get(entry.bucket)?.frequency;
                self.entry = entry.next;
                self.remaining = self.remaining.saturating_sub(1);
                return Some((&*entry.key, &entry.value, frequency));
            }

            // Current bucket exhausted, move up to the next frequency and
            // start from its oldest entry.
            let bucket = buckets.get(self.bucket?)?;
            self.entry = bucket.tail;
            self.bucket = bucket.next;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, Key, Value> ExactSizeIterator for Iter<'a, Key, Value> {}

impl<'a, Key, Value> FusedIterator for Iter<'a, Key, Value> {}

/// A consuming iterator over the keys and values of an LFU cache, in order of
/// least frequently used first.
///
/// This is constructed by calling [`LfuCache::into_iter`].
pub struct IntoIter<Key: Hash + Eq, Value>(pub(super) LfuCache<Key, Value>);

impl<Key: Hash + Eq, Value> Iterator for IntoIter<Key, Value> {
    type Item = (Key, Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.pop_lfu().map(|(key, value, _)| (key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.0.len(), Some(self.0.len()))
    }
}

impl<Key: Hash + Eq, Value> FusedIterator for IntoIter<Key, Value> {}

impl<Key: Hash + Eq, Value> ExactSizeIterator for IntoIter<Key, Value> {
    fn len(&self) -> usize {
        self.0.len()
    }
}
