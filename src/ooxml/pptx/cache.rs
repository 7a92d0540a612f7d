//! Resettable lazy cache cells for derived values.
//!
//! Resolved placeholder types, resolved transforms and table grids are computed
//! on first read and reset eagerly by whichever mutation could change them.
use once_cell::unsync::OnceCell;

/// A lazily computed value that can be dropped and recomputed.
///
/// Filling the cell only needs `&self`; resetting needs `&mut self`, so a reset
/// can never race with an outstanding borrow of the cached value.
#[derive(Debug)]
pub struct ResettableCache<T> {
    cell: OnceCell<T>,
}

impl<T> Default for ResettableCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResettableCache<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Cached value, computing it with `init` when empty.
    pub fn get_or_init<F: FnOnce() -> T>(&self, init: F) -> &T {
        self.cell.get_or_init(init)
    }

    /// Fallible variant of [`get_or_init`](Self::get_or_init); errors leave the cell empty.
    pub fn get_or_try_init<E, F: FnOnce() -> Result<T, E>>(&self, init: F) -> Result<&T, E> {
        self.cell.get_or_try_init(init)
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Drop the cached value.
    #[inline]
    pub fn reset(&mut self) {
        if self.cell.take().is_some() {
            tracing::trace!("cache reset");
        }
    }

    #[inline]
    pub fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_computes_once_until_reset() {
        let calls = Cell::new(0);
        let mut cache = ResettableCache::new();

        assert_eq!(*cache.get_or_init(|| { calls.set(calls.get() + 1); 7 }), 7);
        assert_eq!(*cache.get_or_init(|| { calls.set(calls.get() + 1); 8 }), 7);
        assert_eq!(calls.get(), 1);

        cache.reset();
        assert!(!cache.is_computed());
        assert_eq!(*cache.get_or_init(|| { calls.set(calls.get() + 1); 9 }), 9);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_failed_init_leaves_cell_empty() {
        let cache: ResettableCache<u32> = ResettableCache::new();
        let result: Result<&u32, &str> = cache.get_or_try_init(|| Err("boom"));
        assert!(result.is_err());
        assert!(cache.get().is_none());
    }
}
