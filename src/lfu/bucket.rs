use crate::arena::Arena;
use crate::error::InvariantError;

use super::{BucketId, Entry, EntryId};

/// Every entry sharing one access count. A bucket is both the owner of a
/// recency chain and a node in the ascending frequency chain.
///
/// Within the recency chain, `head` is the entry that arrived last and `tail`
/// is the one that has been here longest, which makes it the eviction
/// candidate for this frequency.
#[derive(Debug)]
pub(super) struct FrequencyBucket<Key, Value> {
    pub(super) frequency: usize,
    pub(super) head: Option<EntryId<Key, Value>>,
    pub(super) tail: Option<EntryId<Key, Value>>,
    pub(super) len: usize,
    /// The bucket with the next lower frequency.
    pub(super) prev: Option<BucketId<Key, Value>>,
    /// The bucket with the next higher frequency.
    pub(super) next: Option<BucketId<Key, Value>>,
}

impl<Key, Value> FrequencyBucket<Key, Value> {
    pub(super) const fn new(
        frequency: usize,
        prev: Option<BucketId<Key, Value>>,
        next: Option<BucketId<Key, Value>>,
    ) -> Self {
        Self {
            frequency,
            head: None,
            tail: None,
            len: 0,
            prev,
            next,
        }
    }

    pub(super) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Places the entry at the head of the recency chain. The entry's own
    /// links are reset first, so it must already be detached from any other
    /// bucket.
    pub(super) fn insert(&mut self, entries: &mut Arena<Entry<Key, Value>>, id: EntryId<Key, Value>) {
        let entry = &mut entries[id];
        entry.prev = self.head;
        entry.next = None;

        match self.head {
            Some(old_head) => entries[old_head].next = Some(id),
            None => self.tail = Some(id),
        }

        self.head = Some(id);
        self.len += 1;
    }

    /// Unlinks the entry from the recency chain. There are four links to fix:
    /// ┌──────┐ (1) ┌───────┐ (2) ┌──────┐
    /// │      ├────►│       ├────►│      │
    /// │ prev │     │ entry │     │ next │
    /// │      │◄────┤       │◄────┤      │
    /// └──────┘ (3) └───────┘ (4) └──────┘
    pub(super) fn remove(&mut self, entries: &mut Arena<Entry<Key, Value>>, id: EntryId<Key, Value>) {
        let entry = &mut entries[id];
        let prev = entry.prev.take();
        let next = entry.next.take();

        if let Some(prev) = prev {
            entries[prev].next = next; // Fixes (1)
        }

        if let Some(next) = next {
            entries[next].prev = prev; // Fixes (4)
        }

        if self.tail == Some(id) {
            self.tail = next;
        }

        if self.head == Some(id) {
            self.head = prev;
        }

        self.len -= 1;
    }

    /// Walks the recency chain from tail to head, checking that every link
    /// agrees with its neighbour and that every entry points back at `own_id`.
    /// Returns the number of entries walked.
    pub(super) fn check_recency(
        &self,
        own_id: BucketId<Key, Value>,
        entries: &Arena<Entry<Key, Value>>,
    ) -> Result<usize, InvariantError> {
        let mut walked = 0;
        let mut previous = None;
        let mut cursor = self.tail;

        while let Some(id) = cursor {
            let entry = entries.get(id).ok_or_else(|| {
                InvariantError::new(format!(
                    "bucket {} links to freed entry {id:?}",
                    self.frequency
                ))
            })?;

            if entry.bucket != own_id {
                return Err(InvariantError::new(format!(
                    "entry {id:?} in bucket {} points at another bucket",
                    self.frequency
                )));
            }

            if entry.prev != previous {
                return Err(InvariantError::new(format!(
                    "entry {id:?} in bucket {} has a broken prev link",
                    self.frequency
                )));
            }

            walked += 1;
            if walked > self.len {
                return Err(InvariantError::new(format!(
                    "bucket {} holds more entries than its count of {}",
                    self.frequency, self.len
                )));
            }

            previous = Some(id);
            cursor = entry.next;
        }

        if previous != self.head {
            return Err(InvariantError::new(format!(
                "bucket {} head is not the end of its recency chain",
                self.frequency
            )));
        }

        if walked != self.len {
            return Err(InvariantError::new(format!(
                "bucket {} counts {} entries but links {walked}",
                self.frequency, self.len
            )));
        }

        Ok(walked)
    }
}
