use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Process-wide advisory lock around hub I/O.
///
/// Never blocks: a caller that finds it held is expected to give up.
#[derive(Debug, Default)]
pub struct HardwareLock {
    held: AtomicBool,
}

impl HardwareLock {
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Take the lock if it is free. Returns false when someone else holds it.
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Take the lock for the lifetime of the returned guard.
    pub fn guard(&self) -> Option<HardwareGuard<'_>> {
        self.try_acquire().then_some(HardwareGuard { lock: self })
    }
}

/// Releases the [`HardwareLock`] on drop.
#[derive(Debug)]
pub struct HardwareGuard<'a> {
    lock: &'a HardwareLock,
}

impl Drop for HardwareGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails() {
        let lock = HardwareLock::new();
        assert!(lock.try_acquire());
        assert!(!lock.try_acquire());

        lock.release();
        assert!(lock.try_acquire());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = HardwareLock::new();
        {
            let _guard = lock.guard().unwrap();
            assert!(lock.is_held());
            assert!(lock.guard().is_none());
        }
        assert!(!lock.is_held());
    }
}
