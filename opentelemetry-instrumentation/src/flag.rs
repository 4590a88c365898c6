use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide switch recording whether an integration's instrumentation is
/// currently applied.
///
/// Each integration crate holds one of these in a `static` and exposes it
/// through `enable()`/`disable()` functions. Both transitions are idempotent:
/// enabling an already enabled integration (or disabling an already disabled
/// one) is a no-op, so startup code can apply instrumentation unconditionally.
///
/// Application happens once at startup, not under contention, so a plain
/// atomic is sufficient.
#[derive(Debug)]
pub struct InstrumentationFlag {
    enabled: AtomicBool,
}

impl InstrumentationFlag {
    /// Create a flag in the disabled state.
    pub const fn new() -> Self {
        InstrumentationFlag {
            enabled: AtomicBool::new(false),
        }
    }

    /// Mark the instrumentation as applied.
    ///
    /// Returns `true` if this call changed the state, `false` if it was
    /// already enabled.
    pub fn enable(&self) -> bool {
        !self.enabled.swap(true, Ordering::SeqCst)
    }

    /// Mark the instrumentation as removed.
    ///
    /// Returns `true` if this call changed the state, `false` if it was
    /// already disabled.
    pub fn disable(&self) -> bool {
        self.enabled.swap(false, Ordering::SeqCst)
    }

    /// Whether the instrumentation is currently applied.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Default for InstrumentationFlag {
    fn default() -> Self {
        Self::new()
    }
}
