//! Shared ordered collections addressed by instance identity.
//!
//! Hosts keep their pending acceptors in a mutable ordered list that multiple
//! threads append to. [`SharedList`] abstracts that list; [`ListHandle`] is
//! the concrete, clonable handle stored in a host field, so the injector can
//! swap the field's value and later restore the *exact original instance*
//! rather than a copy ([`ListHandle::ptr_eq`] is the identity test).

use std::sync::{Arc, Mutex, PoisonError};

/// A mutable ordered collection shared between threads.
pub trait SharedList<T>: Send + Sync {
    /// Appends `item` at the end.
    fn append(&self, item: T);

    /// Removes the first occurrence of `item`. Returns whether anything was
    /// removed.
    fn remove(&self, item: &T) -> bool;

    /// Whether `item` is present.
    fn contains(&self, item: &T) -> bool;

    /// Number of items.
    fn len(&self) -> usize;

    /// Whether the list is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current contents, in order.
    fn snapshot(&self) -> Vec<T>;
}

/// A clonable handle to a [`SharedList`] instance.
///
/// This is the value a host field actually holds. It is a concrete type so
/// the probing layer can recognize it behind `dyn Any`.
pub struct ListHandle<T>(Arc<dyn SharedList<T>>);

impl<T> Clone for ListHandle<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> ListHandle<T> {
    /// Wraps a list implementation in a handle.
    pub fn new(list: Arc<dyn SharedList<T>>) -> Self {
        Self(list)
    }

    /// Whether two handles point at the same list instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Appends `item` at the end.
    pub fn append(&self, item: T) {
        self.0.append(item);
    }

    /// Removes the first occurrence of `item`.
    pub fn remove(&self, item: &T) -> bool {
        self.0.remove(item)
    }

    /// Whether `item` is present.
    pub fn contains(&self, item: &T) -> bool {
        self.0.contains(item)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The current contents, in order.
    pub fn snapshot(&self) -> Vec<T> {
        self.0.snapshot()
    }
}

/// Default [`SharedList`] implementation backed by a locked `Vec`.
pub struct VecList<T> {
    items: Mutex<Vec<T>>,
}

impl<T> VecList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates a list seeded with `items`.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }
}

impl<T> Default for VecList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SharedList<T> for VecList<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    fn append(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    fn remove(&self, item: &T) -> bool {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        match items.iter().position(|i| i == item) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        }
    }

    fn contains(&self, item: &T) -> bool {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(item)
    }

    fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn snapshot(&self) -> Vec<T> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
