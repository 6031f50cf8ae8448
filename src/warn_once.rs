//! Process-wide warn-once flags
//!
//! A [`WarnOnce`] starts unset. The first [`WarnOnce::fire`] sets it and
//! reports that the caller should emit its warning; later calls report
//! nothing until [`WarnOnce::reset`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug)]
pub struct WarnOnce {
    fired: AtomicBool,
    emitted: AtomicUsize,
}

/// Set when `populate` caps a source of unknown length.
pub static UNKNOWN_GENERATOR_LENGTH: WarnOnce = WarnOnce::new();

impl WarnOnce {
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            emitted: AtomicUsize::new(0),
        }
    }

    /// Returns `true` exactly once until the next reset.
    pub fn fire(&self) -> bool {
        let first = self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            self.emitted.fetch_add(1, Ordering::Relaxed);
        }
        first
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Number of warnings emitted since the last reset.
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.fired.store(false, Ordering::Release);
        self.emitted.store(0, Ordering::Relaxed);
    }
}

impl Default for WarnOnce {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_until_reset() {
        let flag = WarnOnce::new();
        assert!(!flag.has_fired());
        assert!(flag.fire());
        assert!(!flag.fire());
        assert!(flag.has_fired());
        assert_eq!(flag.emitted(), 1);

        flag.reset();
        assert!(!flag.has_fired());
        assert_eq!(flag.emitted(), 0);
        assert!(flag.fire());
    }
}
