//! Cooperative yield point for runtimes with a shared execution lock
//!
//! Native threads need nothing here: the default hook is a no-op. An embedding
//! runtime that serializes work behind one lock installs a hook so that
//! non-blocking delays let other ready work run while the caller waits.

/// Release/reacquire pair around a non-blocking delay
pub trait YieldHook: Send + Sync {
    /// Give up the shared execution lock
    fn release(&self) {}

    /// Take the shared execution lock back
    fn reacquire(&self) {}
}

/// Hook for environments without a shared execution lock
#[derive(Clone, Copy, Debug, Default)]
pub struct NoYield;

impl YieldHook for NoYield {}

/// Holds a released hook; reacquires on drop
pub(crate) struct Released<'a> {
    hook: &'a dyn YieldHook,
}

impl<'a> Released<'a> {
    pub(crate) fn new(hook: &'a dyn YieldHook) -> Self {
        hook.release();
        Released { hook }
    }
}

impl Drop for Released<'_> {
    fn drop(&mut self) {
        self.hook.reacquire();
    }
}
