//! Persisted window size (samples per acquisition run).

use crate::error::StoreError;

/// Number of samples aggregated into one RMS pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Window(u16);

impl Window {
    /// Used on first boot and whenever the stored value cannot be read.
    pub const DEFAULT: Window = Window(20);
    /// Largest accepted window.
    pub const MAX: u16 = 1000;

    /// Validates a requested size. Zero, negative and oversized windows are rejected.
    pub fn new(size: i32) -> Option<Self> {
        match u16::try_from(size) {
            Ok(size) if (1..=Self::MAX).contains(&size) => Some(Window(size)),
            _ => None,
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::DEFAULT
    }
}

/// Non-volatile integer storage.
///
/// `set_i32` may be buffered; only a successful `commit` makes it durable.
pub trait KeyValueStore {
    type Error;

    /// Returns `Ok(None)` if the key has never been written.
    fn get_i32(&mut self, key: &str) -> Result<Option<i32>, Self::Error>;
    fn set_i32(&mut self, key: &str, value: i32) -> Result<(), Self::Error>;
    fn commit(&mut self) -> Result<(), Self::Error>;
}

/// Reads and writes the `"window"` key.
pub struct WindowStore<S> {
    store: S,
}

impl<S: KeyValueStore> WindowStore<S> {
    pub const KEY: &'static str = "window";

    pub fn new(store: S) -> Self {
        WindowStore { store }
    }

    /// Reads the stored window, or [`Window::DEFAULT`] if none was ever written.
    ///
    /// # Errors
    /// [`StoreError::PersistentStore`] if the backend fails,
    /// [`StoreError::InvalidWindow`] if the stored value is out of range.
    pub fn load(&mut self) -> Result<Window, StoreError<S::Error>> {
        match self
            .store
            .get_i32(Self::KEY)
            .map_err(StoreError::PersistentStore)?
        {
            Some(size) => Window::new(size).ok_or(StoreError::InvalidWindow(size)),
            None => Ok(Window::DEFAULT),
        }
    }

    /// Like [`WindowStore::load`], but falls back to the default on any error.
    pub fn load_or_default(&mut self) -> Window {
        match self.load() {
            Ok(window) => window,
            Err(StoreError::InvalidWindow(size)) => {
                warn!("stored window {=i32} is invalid, using default", size);
                Window::DEFAULT
            }
            Err(StoreError::PersistentStore(_)) => {
                warn!("window read failed, using default");
                Window::DEFAULT
            }
        }
    }

    /// Validates `size`, writes it and commits. The new value is only
    /// reported as stored once the commit succeeded.
    pub fn store(&mut self, size: i32) -> Result<Window, StoreError<S::Error>> {
        let window = Window::new(size).ok_or(StoreError::InvalidWindow(size))?;

        self.store
            .set_i32(Self::KEY, size)
            .map_err(StoreError::PersistentStore)?;
        self.store.commit().map_err(StoreError::PersistentStore)?;

        info!("window set to {=u16}", window.get());
        Ok(window)
    }

    /// Releases the backend.
    pub fn release(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlashFault, MemoryStore};

    #[test]
    fn window_bounds() {
        assert_eq!(Window::new(1).map(Window::get), Some(1));
        assert_eq!(Window::new(1000).map(Window::get), Some(1000));
        assert_eq!(Window::new(0), None);
        assert_eq!(Window::new(-5), None);
        assert_eq!(Window::new(1001), None);
        assert_eq!(Window::new(i32::MAX), None);
    }

    #[test]
    fn first_boot_reads_default() {
        let mut windows = WindowStore::new(MemoryStore::default());
        assert_eq!(windows.load(), Ok(Window::DEFAULT));
        assert_eq!(windows.load_or_default().get(), 20);
    }

    #[test]
    fn stored_window_round_trips() {
        let mut windows = WindowStore::new(MemoryStore::default());
        assert_eq!(windows.store(7).map(Window::get), Ok(7));
        assert_eq!(windows.load().map(Window::get), Ok(7));
    }

    #[test]
    fn rejected_window_is_not_written() {
        let mut windows = WindowStore::new(MemoryStore::with("window", 12));
        assert_eq!(windows.store(0), Err(StoreError::InvalidWindow(0)));
        assert_eq!(windows.load().map(Window::get), Ok(12));
    }

    #[test]
    fn failed_commit_is_reported_and_not_visible() {
        let store = MemoryStore {
            fail_commit: true,
            ..MemoryStore::default()
        };
        let mut windows = WindowStore::new(store);

        assert_eq!(
            windows.store(5),
            Err(StoreError::PersistentStore(FlashFault))
        );
        assert_eq!(windows.load(), Ok(Window::DEFAULT));
    }

    #[test]
    fn unreadable_store_falls_back_to_default() {
        let store = MemoryStore {
            fail_reads: true,
            ..MemoryStore::default()
        };
        let mut windows = WindowStore::new(store);

        assert_eq!(windows.load(), Err(StoreError::PersistentStore(FlashFault)));
        assert_eq!(windows.load_or_default(), Window::DEFAULT);
    }

    #[test]
    fn corrupt_value_falls_back_to_default() {
        let mut windows = WindowStore::new(MemoryStore::with("window", -3));
        assert_eq!(windows.load(), Err(StoreError::InvalidWindow(-3)));
        assert_eq!(windows.load_or_default(), Window::DEFAULT);
    }
}
