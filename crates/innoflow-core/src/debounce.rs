use std::time::{Duration, Instant};

/// Trailing-edge debounce: every `touch` pushes the deadline out, and
/// `fire_if_due` reports exactly once after input has been quiet for the
/// full window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rapid_touches_fire_once() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        for i in 0..5 {
            d.touch(start + Duration::from_millis(i * 100));
        }
        // Last touch at 400ms, so not due until 700ms.
        assert!(!d.fire_if_due(start + Duration::from_millis(650)));
        assert!(d.fire_if_due(start + Duration::from_millis(700)));
        assert!(!d.fire_if_due(start + Duration::from_millis(800)));
        assert!(!d.is_pending());
    }

    #[test]
    fn cancel_prevents_firing() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.touch(start);
        d.cancel();
        assert!(!d.fire_if_due(start + Duration::from_secs(1)));
    }
}
