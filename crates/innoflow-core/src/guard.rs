//! Freshness checks for responses that may arrive after the view that
//! asked for them has moved on.

/// Monotonic generation counter for one request slot.
///
/// Every issued request captures the generation current at the time.
/// Issuing again or invalidating bumps it, so any response still in
/// flight compares unequal and is dropped by the receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestGuard {
    generation: u64,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding any earlier one.
    pub fn issue(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// The view went away or its inputs changed.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    /// Latest generation, for requests that share it instead of
    /// superseding each other (mutations within one session).
    pub fn current(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}
