use std::time::Duration;
use tokio::time::Instant;

/// Trailing debounce for one connector at a time.
///
/// Each `schedule` pushes the deadline out by the full window; only the
/// connector id captured by the latest `schedule` is handed back when the
/// deadline passes. The clock is tokio's, so tests can pause it.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    deadline: Instant,
    connector_id: String,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn schedule(&mut self, connector_id: &str) {
        self.pending = Some(Pending {
            deadline: Instant::now() + self.window,
            connector_id: connector_id.to_string(),
        });
    }

    /// Drops the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Takes the captured connector id if the deadline has passed at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => {
                self.pending.take().map(|p| p.connector_id)
            }
            _ => None,
        }
    }
}

/// Sleeps until `deadline`, or forever when there is none.
pub async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_pushes_deadline() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));
        debouncer.schedule("c1");
        tokio::time::advance(Duration::from_millis(600)).await;
        debouncer.schedule("c1");
        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(debouncer.take_due(Instant::now()), None);

        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(debouncer.take_due(Instant::now()), Some("c1".to_string()));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));
        debouncer.schedule("c1");
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());
        tokio::time::advance(Duration::from_millis(2000)).await;
        assert_eq!(debouncer.take_due(Instant::now()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_until_deadline() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1000));
        debouncer.schedule("c1");
        let start = Instant::now();
        sleep_until(debouncer.deadline()).await;
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        assert_eq!(debouncer.take_due(Instant::now()), Some("c1".to_string()));
    }
}
