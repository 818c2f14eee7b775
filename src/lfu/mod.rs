use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::arena::{Arena, Id};
use crate::error::{ConfigError, InvariantError};

use bucket::FrequencyBucket;
use entry::Entry;
use freq_list::FrequencyList;
pub use iter::{Frequencies, IntoIter, Iter};

mod bucket;
mod entry;
mod freq_list;
mod iter;

type EntryId<Key, Value> = Id<Entry<Key, Value>>;
type BucketId<Key, Value> = Id<FrequencyBucket<Key, Value>>;

// Upper bound on storage reserved at construction. The rest grows on demand.
const INITIAL_RESERVATION: usize = 1024;

/// A fixed capacity collection that evicts the least frequently used entry
/// when full. Among entries with the same access count, the one that reached
/// that count first is evicted.
///
/// Reading an entry with [`Self::get`] or [`Self::get_mut`] counts as an
/// access. Overwriting a value with [`Self::put`] does not.
// Note that Default is _not_ implemented. A cache without a capacity has no
// meaningful eviction point.
pub struct LfuCache<Key: Hash + Eq, Value> {
    lookup: HashMap<Rc<Key>, EntryId<Key, Value>>,
    entries: Arena<Entry<Key, Value>>,
    freq_list: FrequencyList<Key, Value>,
    capacity: NonZeroUsize,
    len: usize,
}

// SAFETY: The only non-Send field is the `Rc<Key>` shared between the lookup
// table and an entry. Both clones always live inside the same cache and are
// never handed out, so moving the cache moves every reference count with it.
unsafe impl<Key: Hash + Eq + Send, Value: Send> Send for LfuCache<Key, Value> {}

impl<Key: Hash + Eq, Value> LfuCache<Key, Value> {
    /// Creates an LFU cache holding at most `capacity` entries.
    ///
    /// Any integer type is accepted. Zero is rejected with
    /// [`ConfigError::ZeroCapacity`], and values that are negative or don't
    /// fit in a `usize` are rejected with [`ConfigError::InvalidCapacity`].
    ///
    /// ```
    /// # use bucket_lfu::LfuCache;
    /// let mut cache = LfuCache::new(2).unwrap();
    ///
    /// cache.put("foo", 3);
    /// cache.put("bar", 4);
    /// cache.get(&"foo");
    ///
    /// // "bar" has never been read, so it goes first.
    /// cache.put("baz", 5);
    /// assert!(cache.get(&"bar").is_none());
    /// assert_eq!(cache.get(&"foo"), Some(&3));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `capacity` is not a positive integer.
    pub fn new<C>(capacity: C) -> Result<Self, ConfigError>
    where
        C: TryInto<usize>,
    {
        let Ok(capacity) = capacity.try_into() else {
            warn!("rejected LFU cache capacity outside of usize range");
            return Err(ConfigError::InvalidCapacity);
        };

        let Some(capacity) = NonZeroUsize::new(capacity) else {
            warn!("rejected LFU cache with zero capacity");
            return Err(ConfigError::ZeroCapacity);
        };

        Ok(Self::with_capacity(capacity))
    }

    /// Creates an LFU cache from an already validated capacity.
    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        debug!(capacity = capacity.get(), "created LFU cache");
        let reserved = capacity.get().min(INITIAL_RESERVATION);
        Self {
            lookup: HashMap::with_capacity(reserved),
            entries: Arena::with_capacity(reserved),
            freq_list: FrequencyList::new(),
            capacity,
            len: 0,
        }
    }

    /// Inserts a value under the provided key.
    ///
    /// If the key is already present, only the value is replaced; the entry
    /// keeps its frequency and its place among entries of that frequency.
    /// Otherwise, if the cache is full, the least frequently used entry is
    /// evicted first and the new entry starts at frequency zero.
    pub fn put(&mut self, key: Key, value: Value) {
        if let Some(&id) = self.lookup.get(&key) {
            self.entries[id].value = value;
            return;
        }

        if self.len == self.capacity.get() {
            self.evict();
        }

        let bucket = self.freq_list.zero_bucket();
        let key = Rc::new(key);
        let id = self.entries.insert(Entry::new(Rc::clone(&key), value, bucket));
        self.freq_list.attach(bucket, &mut self.entries, id);
        self.lookup.insert(key, id);
        self.len += 1;
    }

    /// Gets a value and increments its access frequency, if it exists.
    pub fn get(&mut self, key: &Key) -> Option<&Value> {
        let id = *self.lookup.get(key)?;
        self.promote(id);
        Some(&self.entries[id].value)
    }

    /// Gets a mutable value and increments its access frequency, if it exists.
    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Value> {
        let id = *self.lookup.get(key)?;
        self.promote(id);
        Some(&mut self.entries[id].value)
    }

    /// Gets a value without counting it as an access.
    #[must_use]
    pub fn peek(&self, key: &Key) -> Option<&Value> {
        let id = *self.lookup.get(key)?;
        Some(&self.entries[id].value)
    }

    /// Returns if the key is present. This is not an access.
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &Key) -> bool {
        self.lookup.contains_key(key)
    }

    /// Returns how many times the key has been read since it was inserted.
    #[must_use]
    pub fn frequency(&self, key: &Key) -> Option<usize> {
        let id = *self.lookup.get(key)?;
        Some(self.freq_list.frequency_of(self.entries[id].bucket))
    }

    /// Peeks at the entry that would be evicted next, if there is one. This
    /// does not increment its access counter.
    #[must_use]
    pub fn peek_lfu(&self) -> Option<(&Key, &Value)> {
        let entry = &self.entries[self.freq_list.lfu_victim()?];
        Some((&*entry.key, &entry.value))
    }

    /// Returns the maximum number of entries.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Returns the current number of entries. This is a constant time
    /// operation.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns if the cache contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the frequencies of the live buckets, lowest first. Reverse it
    /// to walk from the highest bucket down.
    #[inline]
    #[must_use]
    pub fn frequencies(&self) -> Frequencies<'_, Key, Value> {
        Frequencies::new(
            &self.freq_list.buckets,
            self.freq_list.lowest,
            self.freq_list.highest,
        )
    }

    /// Returns an iterator over the keys, values, and frequencies in eviction
    /// order. Note that this does **not** increment the count for any of the
    /// values.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, Key, Value> {
        Iter::new(&self.freq_list.buckets, &self.entries, self.freq_list.lowest)
    }

    /// Verifies that the bucket chain, every recency chain, and the lookup
    /// table agree with each other. Normal operation never produces an error
    /// here; this exists for tests and debugging.
    ///
    /// # Errors
    ///
    /// Returns an [`InvariantError`] describing the first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.len > self.capacity.get() {
            return Err(InvariantError::new(format!(
                "{} entries exceed capacity {}",
                self.len, self.capacity
            )));
        }

        if self.len != self.lookup.len() || self.len != self.entries.len() {
            return Err(InvariantError::new(format!(
                "len {} disagrees with lookup table {} or entry arena {}",
                self.len,
                self.lookup.len(),
                self.entries.len()
            )));
        }

        let linked = self.freq_list.check_chain(&self.entries)?;
        if linked != self.len {
            return Err(InvariantError::new(format!(
                "{linked} entries linked into buckets but len is {}",
                self.len
            )));
        }

        for (key, &id) in &self.lookup {
            let entry = self
                .entries
                .get(id)
                .ok_or_else(|| InvariantError::new(format!("lookup maps to freed entry {id:?}")))?;
            if !Rc::ptr_eq(key, &entry.key) {
                return Err(InvariantError::new(format!(
                    "lookup entry {id:?} holds a different key"
                )));
            }
            if !self.freq_list.buckets.contains(entry.bucket) {
                return Err(InvariantError::new(format!(
                    "entry {id:?} belongs to a freed bucket"
                )));
            }
        }

        Ok(())
    }

    /// Moves the entry to the bucket for its frequency plus one.
    fn promote(&mut self, id: EntryId<Key, Value>) {
        let current = self.entries[id].bucket;
        // Find the target first: if `current` empties below, it's discarded
        // and its links are gone.
        let target = self.freq_list.successor(current);
        self.freq_list.detach(&mut self.entries, id);
        self.freq_list.discard_if_empty(current);
        self.freq_list.attach(target, &mut self.entries, id);

        debug_assert!(self.freq_list.ends_are_terminal());
    }

    /// Drops the least frequently used entry to make room for a new one.
    fn evict(&mut self) {
        if let Some((_, _, frequency)) = self.pop_lfu() {
            trace!(frequency, "evicted least frequently used entry");
        }
    }

    /// Removes the least frequently used entry, returning its key, value, and
    /// the frequency it had.
    fn pop_lfu(&mut self) -> Option<(Key, Value, usize)> {
        let victim = self.freq_list.lfu_victim()?;
        let bucket = self.freq_list.detach(&mut self.entries, victim);
        let frequency = self.freq_list.frequency_of(bucket);
        self.freq_list.discard_if_empty(bucket);

        let entry = self.entries.remove(victim)?;
        self.lookup.remove(&*entry.key);
        self.len -= 1;

        debug_assert!(self.freq_list.ends_are_terminal());

        let key = match Rc::try_unwrap(entry.key) {
            Ok(key) => key,
            // The lookup table held the only other handle and it was just
            // removed.
            Err(_) => unreachable!("evicted key is still shared"),
        };

        Some((key, entry.value, frequency))
    }
}

impl<Key: Hash + Eq, Value> Extend<(Key, Value)> for LfuCache<Key, Value> {
    /// Puts every item from the iterator into the cache. Note that this may
    /// evict items if the number of new keys plus the number of current items
    /// exceeds the capacity of the cache.
    fn extend<T: IntoIterator<Item = (Key, Value)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<Key: Hash + Eq, Value> IntoIterator for LfuCache<Key, Value> {
    type Item = (Key, Value);

    type IntoIter = IntoIter<Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}

impl<'a, Key: Hash + Eq, Value> IntoIterator for &'a LfuCache<Key, Value> {
    type Item = (&'a Key, &'a Value, usize);

    type IntoIter = Iter<'a, Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(not(tarpaulin_include))]
impl<Key: Hash + Eq, Value> Debug for LfuCache<Key, Value> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("LfuCache");
        dbg.field("len", &self.len);
        dbg.field("capacity", &self.capacity);

        for (_, bucket) in self.freq_list.walk() {
            dbg.field(
                &format!("bucket freq {} num elements", bucket.frequency),
                &bucket.len,
            );
        }

        dbg.finish()
    }
}

impl<Key: Hash + Eq + Display, Value: Display> Display for LfuCache<Key, Value> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total elements: {}", self.len)?;
        for (_, bucket) in self.freq_list.walk() {
            writeln!(f, "  Bucket (freq value = {}) [", bucket.frequency)?;
            let mut cursor = bucket.tail;
            while let Some(id) = cursor {
                let entry = &self.entries[id];
                writeln!(f, "    {entry},")?;
                cursor = entry.next;
            }
            writeln!(f, "  ]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod get {
    use super::LfuCache;

    #[test]
    fn empty() {
        let mut cache = LfuCache::<u64, u64>::new(10).unwrap();
        for i in 0..100 {
            assert!(cache.get(&i).is_none());
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn repeated_reads_are_stable() {
        let mut cache = LfuCache::new(2).unwrap();
        cache.put("a", 1);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.frequency(&"a"), Some(2));
    }

    #[test]
    fn get_mut() {
        let mut cache = LfuCache::new(1).unwrap();
        cache.put(1, 2);
        assert_eq!(cache.frequencies().collect::<Vec<_>>(), vec![0]);
        *cache.get_mut(&1).unwrap() = 3;
        assert_eq!(cache.frequencies().collect::<Vec<_>>(), vec![1]);
        assert_eq!(cache.get(&1), Some(&3));
    }

    #[test]
    fn miss_does_not_insert() {
        let mut cache = LfuCache::<&str, i32>::new(2).unwrap();
        assert!(cache.get(&"a").is_none());
        assert!(!cache.contains_key(&"a"));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.frequencies().len(), 0);
    }

    #[test]
    fn peek_does_not_promote() {
        let mut cache = LfuCache::new(2).unwrap();
        cache.put("a", 1);
        assert_eq!(cache.peek(&"a"), Some(&1));
        assert_eq!(cache.frequency(&"a"), Some(0));
        assert!(cache.peek(&"b").is_none());
    }
}



#[cfg(test)]
mod bookkeeping {
    use super::LfuCache;

    #[test]
    fn getting_one_element_has_constant_freq_list_size() {
        let mut cache = LfuCache::new(1).unwrap();
        cache.put(1, 2);
        assert_eq!(cache.freq_list.len(), 1);

        for _ in 0..100 {
            cache.get(&1);
            assert_eq!(cache.freq_list.len(), 1);
            assert!(cache.freq_list.ends_are_terminal());
        }
        assert_eq!(cache.frequency(&1), Some(100));
    }

    #[test]
    fn freq_list_node_merges() {
        let mut cache = LfuCache::new(2).unwrap();
        cache.put(1, 2);
        cache.put(3, 4);
        assert_eq!(cache.freq_list.len(), 1);
        assert!(cache.get(&1).is_some());
        assert_eq!(cache.freq_list.len(), 2);
        assert!(cache.get(&3).is_some());
        assert_eq!(cache.freq_list.len(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn freq_list_multi_items() {
        let mut cache = LfuCache::new(2).unwrap();
        cache.put(1, 2);
        cache.get(&1);
        cache.get(&1);
        cache.put(3, 4);
        assert_eq!(cache.freq_list.len(), 2);
        cache.get(&3);
        assert_eq!(cache.freq_list.len(), 2);
        cache.get(&3);
        assert_eq!(cache.freq_list.len(), 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn new_zero_bucket_precedes_promoted_lowest() {
        let mut cache = LfuCache::new(3).unwrap();
        cache.put(1, 1);
        cache.get(&1);
        cache.put(2, 2);
        assert_eq!(cache.frequencies().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(cache.frequencies().rev().collect::<Vec<_>>(), vec![1, 0]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn promotion_splices_into_gap() {
        let mut cache = LfuCache::new(3).unwrap();
        cache.put(1, 1);
        cache.put(2, 2);
        cache.get(&1);
        cache.get(&1);
        assert_eq!(cache.frequencies().collect::<Vec<_>>(), vec![0, 2]);
        cache.get(&2);
        assert_eq!(cache.frequencies().collect::<Vec<_>>(), vec![1, 2]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn invariants_catch_corruption() {
        let mut cache = LfuCache::new(2).unwrap();
        cache.put(1, 1);
        cache.put(2, 2);
        cache.len = 1;
        assert!(cache.check_invariants().is_err());
    }

    #[test]
    fn display_lists_buckets_in_eviction_order() {
        let mut cache = LfuCache::new(3).unwrap();
        cache.put("a", 1);
        cache.put("b", 2);
        cache.get(&"a");
        let dump = cache.to_string();
        assert_eq!(
            dump,
            "Total elements: 2\n  Bucket (freq value = 0) [\n    b: 2,\n  ]\n  Bucket (freq value = 1) [\n    a: 1,\n  ]\n"
        );
    }

    #[test]
    fn send_across_threads() {
        let mut cache = LfuCache::new(2).unwrap();
        cache.put(String::from("a"), 1);
        let handle = std::thread::spawn(move || {
            cache.get(&String::from("a"));
            cache
        });
        let cache = handle.join().unwrap();
        assert_eq!(cache.frequency(&String::from("a")), Some(1));
    }
}
