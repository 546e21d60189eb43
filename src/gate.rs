//! Visibility gate.
//!
//! Folds the two visibility signals, surface on screen and document in the
//! foreground, into one answer. Each signal is a shared flag: the host keeps
//! a [`SignalHandle`] and flips it whenever its own event arrives, possibly
//! from another thread. The engine only reads the gate at the start of a
//! frame callback, so a flip takes effect on the next callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Writer end of one visibility signal.
#[derive(Debug, Clone)]
pub struct SignalHandle(Arc<AtomicBool>);

impl SignalHandle {
    pub fn set(&self, visible: bool) {
        self.0.store(visible, Ordering::Release);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Combined visibility of the drawing surface.
///
/// Both signals start out visible, so a host that cannot deliver one of them
/// leaves the engine running rather than stuck suspended.
#[derive(Debug, Clone)]
pub struct VisibilityGate {
    intersecting: SignalHandle,
    document_visible: SignalHandle,
}

impl VisibilityGate {
    pub fn new() -> Self {
        Self {
            intersecting: SignalHandle(Arc::new(AtomicBool::new(true))),
            document_visible: SignalHandle(Arc::new(AtomicBool::new(true))),
        }
    }

    /// Handle for the on-screen intersection signal. Any nonzero
    /// intersection with the viewport counts as visible.
    pub fn intersection(&self) -> SignalHandle {
        self.intersecting.clone()
    }

    /// Handle for the document visibility signal.
    pub fn document(&self) -> SignalHandle {
        self.document_visible.clone()
    }

    pub fn set_intersecting(&self, intersecting: bool) {
        self.intersecting.set(intersecting);
    }

    pub fn set_document_visible(&self, visible: bool) {
        self.document_visible.set(visible);
    }

    /// Visible only when both signals say so.
    pub fn is_visible(&self) -> bool {
        self.intersecting.get() && self.document_visible.get()
    }
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_starts_visible() {
        assert!(VisibilityGate::new().is_visible());
    }

    #[test]
    fn test_either_signal_hides() {
        let gate = VisibilityGate::new();
        gate.set_intersecting(false);
        assert!(!gate.is_visible());
        gate.set_intersecting(true);
        gate.set_document_visible(false);
        assert!(!gate.is_visible());
        gate.set_document_visible(true);
        assert!(gate.is_visible());
    }

    #[test]
    fn test_handles_share_state() {
        let gate = VisibilityGate::new();
        let document = gate.document();
        let from_thread = document.clone();
        std::thread::spawn(move || from_thread.set(false)).join().unwrap();
        assert!(!gate.is_visible());
        assert!(!document.get());
    }
}
