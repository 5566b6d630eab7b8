//! Caching decorators
//!
//! Both caches key entries by the canonical reference string and allow at
//! most one upstream fetch per key to be in flight. A fetch that fails or
//! is cancelled leaves nothing behind. There is no size bound and no
//! background eviction; entries go away on [`clear_cache`] or, for
//! metadata, when found expired at read time.
//!
//! [`clear_cache`]: CachedContentProvider::clear_cache

mod content;
mod metadata;

pub use content::CachedContentProvider;
pub use metadata::CachedMetadataProvider;

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

/// Map of per-key cells; each cell is filled once by the first fetch
struct CellMap<T> {
    cells: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T> CellMap<T> {
    fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<OnceCell<T>>>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the slot for `key`, replacing its cell when `keep` rejects the value
    fn slot(&self, key: &str, keep: impl Fn(&T) -> bool) -> Slot<'_, T> {
        let mut cells = self.lock();
        let cell = match cells.get(key) {
            Some(cell) if cell.get().is_none_or(&keep) => cell.clone(),
            _ => {
                let cell = Arc::new(OnceCell::new());
                cells.insert(key.to_string(), cell.clone());
                cell
            }
        };
        Slot {
            map: self,
            key: key.to_string(),
            cell,
        }
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn filled(&self) -> usize {
        self.lock().values().filter(|c| c.initialized()).count()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Handle on one cache cell
///
/// Dropping the last handle on a cell that is still empty (the fetch failed
/// or was cancelled) removes the cell from the map.
struct Slot<'a, T> {
    map: &'a CellMap<T>,
    key: String,
    cell: Arc<OnceCell<T>>,
}

impl<T> Deref for Slot<'_, T> {
    type Target = OnceCell<T>;

    fn deref(&self) -> &OnceCell<T> {
        &self.cell
    }
}

impl<T> Drop for Slot<'_, T> {
    fn drop(&mut self) {
        if self.cell.initialized() {
            return;
        }
        let mut cells = self.map.lock();
        // map + this handle; more means another caller is still waiting
        if let Some(current) = cells.get(&self.key)
            && Arc::ptr_eq(current, &self.cell)
            && Arc::strong_count(&self.cell) == 2
        {
            cells.remove(&self.key);
        }
    }
}
