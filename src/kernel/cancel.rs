use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative stop flag for one run.
///
/// Setting it never interrupts anything in flight. The driver reads it only at
/// its checkpoints (after a turn fetch, after persona playback).
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let signal = StopSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_requested());
        signal.request();
        assert!(observer.is_requested());
    }
}
