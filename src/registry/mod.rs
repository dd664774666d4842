pub mod handle;

use std::collections::HashMap;
use std::marker::PhantomData;

use parking_lot::Mutex;

use crate::error::RegistryError;

pub use handle::{DelegateHandle, Handle, SessionHandle};

/// Maps opaque handles to records.
///
/// Handles are allocated from a strictly increasing counter starting at 1 and
/// are never reused for the lifetime of the registry. `create`, `lookup` and
/// `remove` all run under one lock, so a concurrent create and remove can
/// never observe a torn or duplicated handle.
pub struct Registry<H, V> {
    inner: Mutex<Inner<V>>,
    _handle: PhantomData<fn() -> H>,
}

struct Inner<V> {
    next: u64,
    records: HashMap<u64, V>,
}

impl<V> Inner<V> {
    fn allocate(&mut self) -> Result<u64, RegistryError> {
        let raw = self.next;
        self.next = self.next.checked_add(1).ok_or(RegistryError::Exhausted)?;
        Ok(raw)
    }
}

impl<H: Handle, V> Registry<H, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next: 1,
                records: HashMap::new(),
            }),
            _handle: PhantomData,
        }
    }

    /// Install `record` under a fresh handle.
    ///
    /// Fails only once the 64-bit handle space is exhausted.
    pub fn create(&self, record: V) -> Result<H, RegistryError> {
        let mut inner = self.inner.lock();
        let raw = inner.allocate()?;
        inner.records.insert(raw, record);
        Ok(H::from_raw(raw))
    }

    /// Install `record` unless an equal record is already live.
    pub fn create_unique(&self, record: V) -> Result<H, RegistryError>
    where
        V: PartialEq,
    {
        let mut inner = self.inner.lock();
        if inner.records.values().any(|existing| *existing == record) {
            return Err(RegistryError::AlreadyBound);
        }
        let raw = inner.allocate()?;
        inner.records.insert(raw, record);
        Ok(H::from_raw(raw))
    }

    pub fn lookup(&self, handle: H) -> Option<V>
    where
        V: Clone,
    {
        if !handle.is_valid() {
            return None;
        }
        self.inner.lock().records.get(&handle.raw()).cloned()
    }

    /// Remove and return the record. A second removal of the same handle yields `None`.
    pub fn remove(&self, handle: H) -> Option<V> {
        if !handle.is_valid() {
            return None;
        }
        self.inner.lock().records.remove(&handle.raw())
    }

    /// Whether any live handle maps to a record equal to `record`.
    pub fn contains_value(&self, record: &V) -> bool
    where
        V: PartialEq,
    {
        self.inner.lock().records.values().any(|existing| existing == record)
    }

    pub fn contains(&self, handle: H) -> bool {
        handle.is_valid() && self.inner.lock().records.contains_key(&handle.raw())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live handles in allocation order.
    pub fn handles(&self) -> Vec<H> {
        let inner = self.inner.lock();
        let mut raws: Vec<u64> = inner.records.keys().copied().collect();
        raws.sort_unstable();
        raws.into_iter().map(H::from_raw).collect()
    }
}

impl<H: Handle, V> Default for Registry<H, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle, V> std::fmt::Debug for Registry<H, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &H::KIND)
            .field("live", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn handles_start_at_one_and_increase() {
        let reg: Registry<SessionHandle, DelegateHandle> = Registry::new();
        let a = reg.create(DelegateHandle::from_raw(10)).unwrap();
        let b = reg.create(DelegateHandle::from_raw(11)).unwrap();
        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 2);
        assert_eq!(reg.lookup(a), Some(DelegateHandle::from_raw(10)));
    }

    #[test]
    fn removed_handles_are_not_recycled() {
        let reg: Registry<SessionHandle, u32> = Registry::new();
        let a = reg.create(1).unwrap();
        assert_eq!(reg.remove(a), Some(1));
        let b = reg.create(2).unwrap();
        assert_ne!(a, b);
        assert!(reg.lookup(a).is_none());
    }

    #[test]
    fn second_remove_is_not_found() {
        let reg: Registry<SessionHandle, u32> = Registry::new();
        let h = reg.create(5).unwrap();
        assert_eq!(reg.remove(h), Some(5));
        assert_eq!(reg.remove(h), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn zero_handle_is_never_found() {
        let reg: Registry<SessionHandle, u32> = Registry::new();
        reg.create(1).unwrap();
        assert!(reg.lookup(SessionHandle::INVALID).is_none());
        assert!(reg.remove(SessionHandle::INVALID).is_none());
        assert!(!reg.contains(SessionHandle::INVALID));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn create_unique_rejects_live_duplicate() {
        let reg: Registry<SessionHandle, DelegateHandle> = Registry::new();
        let d = DelegateHandle::from_raw(42);
        let h = reg.create_unique(d).unwrap();
        assert_eq!(reg.create_unique(d), Err(RegistryError::AlreadyBound));
        assert!(reg.contains_value(&d));
        reg.remove(h);
        assert!(!reg.contains_value(&d));
        assert!(reg.create_unique(d).is_ok());
    }

    #[test]
    fn concurrent_creates_never_duplicate() {
        let reg: Arc<Registry<SessionHandle, usize>> = Arc::new(Registry::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    (0..200)
                        .map(|i| {
                            let h = reg.create(t * 1000 + i).unwrap();
                            if i % 2 == 0 {
                                reg.remove(h);
                            }
                            h
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<SessionHandle> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
        assert_eq!(reg.len(), 8 * 100);
    }
}
