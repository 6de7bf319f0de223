use tokio_util::sync::CancellationToken;

/// Monotonic generation counter for pipeline work.
///
/// Owned by the single driver task, so a plain counter is enough.
#[derive(Debug, Default)]
pub(crate) struct GenerationClock {
    current: u64,
}

impl GenerationClock {
    /// Advances the clock and returns the new generation (first call yields 1).
    pub fn next(&mut self) -> u64 {
        self.current = self.current.wrapping_add(1);
        self.current
    }
}

/// Generation-scoped cancellation token for one unit of filtering work.
///
/// A completion is only published when its generation equals the generation
/// of the token the driver currently holds.
#[derive(Debug, Clone)]
pub(crate) struct WorkToken {
    generation: u64,
    cancel: CancellationToken,
}

impl WorkToken {
    pub fn new(generation: u64, cancel: CancellationToken) -> Self {
        Self { generation, cancel }
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_one_and_increases() {
        let mut clock = GenerationClock::default();
        assert_eq!(clock.next(), 1);
        assert_eq!(clock.next(), 2);
        assert_eq!(clock.next(), 3);
    }

    #[test]
    fn child_of_cancelled_parent_is_cancelled() {
        let parent = CancellationToken::new();
        let token = WorkToken::new(7, parent.child_token());
        assert_eq!(token.generation(), 7);
        assert!(!token.is_cancelled());
        parent.cancel();
        assert!(token.is_cancelled());
    }
}
