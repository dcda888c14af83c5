//! Detection of concurrent use of one context.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use relmodel_core::{Error, Result};

/// Fails fast when two operations run on the same context at once.
///
/// Clones share their state, so every component working for one context
/// can guard its critical sections with the same detector.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyDetector {
    busy: Arc<AtomicBool>,
}

impl ConcurrencyDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a critical section, held until the returned guard drops.
    pub fn enter_critical_section(&self) -> Result<CriticalSection<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::warn!("Concurrent use of a context detected");
            return Err(Error::ConcurrentMethodInvocation);
        }
        Ok(CriticalSection { detector: self })
    }

    /// True while a critical section is held.
    #[must_use]
    pub fn is_in_critical_section(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Guard returned by [`ConcurrencyDetector::enter_critical_section`].
#[derive(Debug)]
#[must_use = "the critical section ends when the guard is dropped"]
pub struct CriticalSection<'a> {
    detector: &'a ConcurrencyDetector,
}

impl Drop for CriticalSection<'_> {
    fn drop(&mut self) {
        self.detector.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentry_fails() {
        let detector = ConcurrencyDetector::new();
        let guard = detector.enter_critical_section().unwrap();
        assert!(detector.is_in_critical_section());
        assert!(matches!(
            detector.enter_critical_section(),
            Err(Error::ConcurrentMethodInvocation)
        ));
        drop(guard);
        assert!(!detector.is_in_critical_section());
        assert!(detector.enter_critical_section().is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let detector = ConcurrencyDetector::new();
        let other = detector.clone();
        let _guard = other.enter_critical_section().unwrap();
        assert!(detector.enter_critical_section().is_err());
    }
}
