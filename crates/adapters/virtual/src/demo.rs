//! Scripted input changes so the virtual board does something on its own.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::VirtualRelay;

/// A looping list of input masks, each held for one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputScript {
    masks: Vec<u8>,
    period: Duration,
}

impl InputScript {
    #[must_use]
    pub fn new(masks: Vec<u8>, period: Duration) -> Self {
        Self { masks, period }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Replay the script on `relay` until the task is aborted.
    ///
    /// An empty script or a zero period returns a task that ends at once.
    #[must_use]
    pub fn spawn(self, relay: VirtualRelay) -> JoinHandle<()> {
        tokio::spawn(async move {
            if self.masks.is_empty() || self.period.is_zero() {
                return;
            }
            let mut interval = tokio::time::interval(self.period);
            for mask in self.masks.iter().cycle() {
                interval.tick().await;
                tracing::debug!(inputs = mask, "demo inputs");
                relay.set_inputs(*mask);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_apply_first_mask_immediately() {
        let relay = VirtualRelay::new();
        let task = InputScript::new(vec![0b11, 0], Duration::from_secs(60)).spawn(relay.clone());
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(relay.inputs(), 0b11);
        task.abort();
    }

    #[tokio::test]
    async fn should_end_immediately_when_empty() {
        let relay = VirtualRelay::new();
        let task = InputScript::new(Vec::new(), Duration::from_secs(1)).spawn(relay.clone());
        task.await.unwrap();
        assert_eq!(relay.inputs(), 0);
    }
}
