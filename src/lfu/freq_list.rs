use std::iter::successors;

use tracing::trace;

use crate::arena::Arena;
use crate::error::InvariantError;

use super::{BucketId, Entry, EntryId, FrequencyBucket};

/// The chain of frequency buckets, lowest frequency first. Empty buckets are
/// never kept in the chain.
#[derive(Debug)]
pub(super) struct FrequencyList<Key, Value> {
    pub(super) buckets: Arena<FrequencyBucket<Key, Value>>,
    pub(super) lowest: Option<BucketId<Key, Value>>,
    pub(super) highest: Option<BucketId<Key, Value>>,
}

impl<Key, Value> FrequencyList<Key, Value> {
    #[inline]
    pub(super) const fn new() -> Self {
        Self {
            buckets: Arena::new(),
            lowest: None,
            highest: None,
        }
    }

    /// Number of live buckets.
    #[inline]
    pub(super) const fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(super) fn frequency_of(&self, bucket: BucketId<Key, Value>) -> usize {
        self.buckets[bucket].frequency
    }

    /// Returns the frequency zero bucket, creating it as the new lowest bucket
    /// if the chain doesn't start with one.
    pub(super) fn zero_bucket(&mut self) -> BucketId<Key, Value> {
        if let Some(lowest) = self.lowest {
            if self.buckets[lowest].frequency == 0 {
                return lowest;
            }
        }

        let node = self.buckets.insert(FrequencyBucket::new(0, None, self.lowest));
        match self.lowest {
            Some(old_lowest) => self.buckets[old_lowest].prev = Some(node),
            None => self.highest = Some(node),
        }
        self.lowest = Some(node);

        trace!(frequency = 0, "created frequency bucket");
        node
    }

    /// Returns the bucket for one more than `current`'s frequency. The
    /// existing successor is reused if it has exactly that frequency,
    /// otherwise a new bucket is spliced in directly after `current`.
    pub(super) fn successor(&mut self, current: BucketId<Key, Value>) -> BucketId<Key, Value> {
        let frequency = self.buckets[current].frequency + 1;
        let next = self.buckets[current].next;

        if let Some(next) = next {
            if self.buckets[next].frequency == frequency {
                return next;
            }
        }

        // There are four links to fix:
        // ┌─────┐ (1) ┌─────┐ (2) ┌──────┐
        // │     ├────►│     ├────►│      │
        // │ cur │     │ new │     │ next │
        // │     │◄────┤     │◄────┤      │
        // └─────┘ (3) └─────┘ (4) └──────┘
        // (2) and (3) are set on construction.
        let node = self
            .buckets
            .insert(FrequencyBucket::new(frequency, Some(current), next));
        self.buckets[current].next = Some(node); // Fixes (1)

        match next {
            Some(next) => self.buckets[next].prev = Some(node), // Fixes (4)
            None => self.highest = Some(node),
        }

        trace!(frequency, "created frequency bucket");
        node
    }

    /// Links the entry at the head of `bucket` and records the new owner.
    pub(super) fn attach(
        &mut self,
        bucket: BucketId<Key, Value>,
        entries: &mut Arena<Entry<Key, Value>>,
        id: EntryId<Key, Value>,
    ) {
        self.buckets[bucket].insert(entries, id);
        entries[id].bucket = bucket;

        if let Some(highest) = self.highest {
            if self.buckets[bucket].frequency > self.buckets[highest].frequency {
                self.highest = Some(bucket);
            }
        }
    }

    /// Unlinks the entry from its bucket and returns that bucket. The bucket
    /// may be left empty; see [`Self::discard_if_empty`].
    pub(super) fn detach(
        &mut self,
        entries: &mut Arena<Entry<Key, Value>>,
        id: EntryId<Key, Value>,
    ) -> BucketId<Key, Value> {
        let bucket = entries[id].bucket;
        self.buckets[bucket].remove(entries, id);
        bucket
    }

    /// Drops the bucket if it has no entries left, reconnecting its former
    /// neighbours and moving the chain ends past it.
    pub(super) fn discard_if_empty(&mut self, bucket: BucketId<Key, Value>) {
        if !self.buckets[bucket].is_empty() {
            return;
        }

        let Some(node) = self.buckets.remove(bucket) else {
            return;
        };

        match node.prev {
            Some(prev) => self.buckets[prev].next = node.next,
            None => self.lowest = node.next,
        }

        match node.next {
            Some(next) => self.buckets[next].prev = node.prev,
            None => self.highest = node.prev,
        }

        trace!(frequency = node.frequency, "discarded empty frequency bucket");
    }

    /// The entry that eviction would remove: the tail of the lowest bucket.
    #[inline]
    pub(super) fn lfu_victim(&self) -> Option<EntryId<Key, Value>> {
        self.buckets[self.lowest?].tail
    }

    /// Walks the chain from the lowest bucket upward.
    pub(super) fn walk(
        &self,
    ) -> impl Iterator<Item = (BucketId<Key, Value>, &FrequencyBucket<Key, Value>)> + '_ {
        successors(self.lowest, |&id| self.buckets.get(id)?.next)
            .filter_map(|id| self.buckets.get(id).map(|bucket| (id, bucket)))
    }

    /// The chain ends must not point outward. This also covers the single
    /// bucket case, where the one bucket is both ends and has no neighbours.
    pub(super) fn ends_are_terminal(&self) -> bool {
        let lowest_ok = self
            .lowest
            .and_then(|id| self.buckets.get(id))
            .map_or(true, |bucket| bucket.prev.is_none());
        let highest_ok = self
            .highest
            .and_then(|id| self.buckets.get(id))
            .map_or(true, |bucket| bucket.next.is_none());
        lowest_ok && highest_ok && self.lowest.is_some() == self.highest.is_some()
    }

    /// Walks the bucket chain and every recency chain, returning the total
    /// number of entries linked.
    pub(super) fn check_chain(&self, entries: &Arena<Entry<Key, Value>>) -> Result<usize, InvariantError> {
        if !self.ends_are_terminal() {
            return Err(InvariantError::new("bucket chain ends point outward"));
        }

        let mut linked = 0;
        let mut walked = 0;
        let mut previous: Option<(BucketId<Key, Value>, usize)> = None;
        let mut cursor = self.lowest;

        while let Some(id) = cursor {
            let bucket = self
                .buckets
                .get(id)
                .ok_or_else(|| InvariantError::new(format!("chain links to freed bucket {id:?}")))?;

            if bucket.is_empty() {
                return Err(InvariantError::new(format!(
                    "empty bucket with frequency {} left in chain",
                    bucket.frequency
                )));
            }

            if bucket.prev != previous.map(|(id, _)| id) {
                return Err(InvariantError::new(format!(
                    "bucket {} has a broken prev link",
                    bucket.frequency
                )));
            }

            if let Some((_, frequency)) = previous {
                if bucket.frequency <= frequency {
                    return Err(InvariantError::new(format!(
                        "bucket chain is not ascending: {frequency} is followed by {}",
                        bucket.frequency
                    )));
                }
            }

            walked += 1;
            if walked > self.buckets.len() {
                return Err(InvariantError::new("bucket chain has a cycle"));
            }

            linked += bucket.check_recency(id, entries)?;
            previous = Some((id, bucket.frequency));
            cursor = bucket.next;
        }

        if previous.map(|(id, _)| id) != self.highest {
            return Err(InvariantError::new(
                "highest bucket is not the end of the chain",
            ));
        }

        if walked != self.buckets.len() {
            return Err(InvariantError::new(format!(
                "{} buckets allocated but {walked} linked",
                self.buckets.len()
            )));
        }

        Ok(linked)
    }
}

#[cfg(test)]
mod frequency_list {
    use super::FrequencyList;

    fn frequencies(list: &FrequencyList<i32, i32>) -> Vec<usize> {
        list.walk().map(|(_, bucket)| bucket.frequency).collect()
    }

    #[test]
    fn new_is_empty() {
        let list = FrequencyList::<i32, i32>::new();
        assert_eq!(list.len(), 0);
        assert!(list.lowest.is_none());
        assert!(list.highest.is_none());
        assert!(list.lfu_victim().is_none());
        assert!(list.ends_are_terminal());
    }

    #[test]
    fn zero_bucket_is_reused() {
        let mut list = FrequencyList::<i32, i32>::new();
        let a = list.zero_bucket();
        let b = list.zero_bucket();
        assert_eq!(a, b);
        assert_eq!(list.len(), 1);
        assert_eq!(list.lowest, Some(a));
        assert_eq!(list.highest, Some(a));
    }

    #[test]
    fn zero_bucket_goes_before_existing_lowest() {
        let mut list = FrequencyList::<i32, i32>::new();
        let zero = list.zero_bucket();
        let one = list.successor(zero);
        list.discard_if_empty(zero);
        assert_eq!(list.lowest, Some(one));

        let new_zero = list.zero_bucket();
        assert_eq!(list.lowest, Some(new_zero));
        assert_eq!(list.highest, Some(one));
        assert_eq!(list.buckets[one].prev, Some(new_zero));
        assert_eq!(frequencies(&list), vec![0, 1]);
    }

    #[test]
    fn successor_is_spliced_between() {
        let mut list = FrequencyList::<i32, i32>::new();
        let zero = list.zero_bucket();
        let one = list.successor(zero);
        let two = list.successor(one);
        list.discard_if_empty(one);
        assert_eq!(frequencies(&list), vec![0, 2]);

        let one = list.successor(zero);
        assert_eq!(frequencies(&list), vec![0, 1, 2]);
        assert_eq!(list.buckets[one].prev, Some(zero));
        assert_eq!(list.buckets[one].next, Some(two));
        assert_eq!(list.buckets[two].prev, Some(one));
        assert_eq!(list.highest, Some(two));
    }

    #[test]
    fn successor_reuses_adjacent_frequency() {
        let mut list = FrequencyList::<i32, i32>::new();
        let zero = list.zero_bucket();
        let one = list.successor(zero);
        assert_eq!(list.successor(zero), one);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn discarding_last_bucket_clears_ends() {
        let mut list = FrequencyList::<i32, i32>::new();
        let zero = list.zero_bucket();
        list.discard_if_empty(zero);
        assert_eq!(list.len(), 0);
        assert!(list.lowest.is_none());
        assert!(list.highest.is_none());
    }

    #[test]
    fn discarding_highest_moves_highest_down() {
        let mut list = FrequencyList::<i32, i32>::new();
        let zero = list.zero_bucket();
        let one = list.successor(zero);
        list.discard_if_empty(one);
        assert_eq!(list.highest, Some(zero));
        assert!(list.buckets[zero].next.is_none());
        assert!(list.ends_are_terminal());
    }
}
