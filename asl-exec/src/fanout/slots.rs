use std::sync::Arc;

use asl_core::FailureEvent;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admission control for Map branches.
///
/// A positive limit bounds the number of permits out at once; zero or a
/// negative limit admits everything. Waiters are served in FIFO order.
#[derive(Clone)]
pub struct BranchSlots {
    semaphore: Option<Arc<Semaphore>>,
}

impl BranchSlots {
    pub fn new(limit: i64) -> Self {
        let semaphore = usize::try_from(limit)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n.min(Semaphore::MAX_PERMITS))));
        Self { semaphore }
    }

    pub fn is_unlimited(&self) -> bool {
        self.semaphore.is_none()
    }

    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    pub async fn acquire(&self) -> Result<BranchPermit, FailureEvent> {
        let permit = match &self.semaphore {
            Some(semaphore) => Some(
                Arc::clone(semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_| FailureEvent::runtime("map branch slots closed unexpectedly"))?,
            ),
            None => None,
        };
        Ok(BranchPermit { _permit: permit })
    }
}

/// Held by a running branch; dropping it frees the slot.
pub struct BranchPermit {
    _permit: Option<OwnedSemaphorePermit>,
}
