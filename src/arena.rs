use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A stable handle into an [`Arena`]. The type parameter ties a handle to the
/// arena it came from, so an entry handle can't be used to address a bucket.
pub(crate) struct Id<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    const fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }
}

// Manual impls: deriving would require `T` itself to implement these traits.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.index);
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({})", self.index)
    }
}

/// Slot storage with a free list. Removing a value frees its slot for reuse
/// instead of shifting anything, so outstanding handles to other slots stay
/// valid.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> Id<T> {
        let index = if let Some(index) = self.free_list.pop() {
            self.slots[index] = Some(value);
            index
        } else {
            self.slots.push(Some(value));
            self.slots.len() - 1
        };
        self.len += 1;
        Id::new(index)
    }

    pub(crate) fn remove(&mut self, id: Id<T>) -> Option<T> {
        let value = self.slots.get_mut(id.index)?.take()?;
        self.free_list.push(id.index);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, id: Id<T>) -> Option<&T> {
        self.slots.get(id.index).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        self.slots.get_mut(id.index).and_then(Option::as_mut)
    }

    pub(crate) fn contains(&self, id: Id<T>) -> bool {
        self.get(id).is_some()
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }
}

impl<T> Index<Id<T>> for Arena<T> {
    type Output = T;

    fn index(&self, id: Id<T>) -> &T {
        match self.get(id) {
            Some(value) => value,
            None => panic!("stale arena handle {id:?}"),
        }
    }
}

impl<T> IndexMut<Id<T>> for Arena<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        match self.get_mut(id) {
            Some(value) => value,
            None => panic!("stale arena handle {id:?}"),
        }
    }
}
