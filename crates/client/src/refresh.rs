//! Single-flight coordination for token refresh
//!
//! Many requests can hit a 401 in the same window once an access token
//! expires. The coordinator elects the first of them as the leader — the
//! only caller that performs the outbound refresh — and parks the rest as
//! followers until the leader settles.

use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

/// Outcome broadcast to every follower of one refresh cycle
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RefreshError(pub String);

type RefreshOutcome = Result<(), RefreshError>;

/// What a caller that lost its access token must do next
#[derive(Debug)]
pub enum RefreshRole {
    /// This caller performs the refresh and must call
    /// [`RefreshCoordinator::finish`] exactly once, whatever happens.
    Leader,
    /// Another refresh is in flight; await the outcome before retrying.
    Follower(oneshot::Receiver<RefreshOutcome>),
}

#[derive(Debug, Default)]
struct RefreshState {
    refreshing: bool,
    // Non-empty only while `refreshing` is true.
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Guarantees at most one in-flight refresh call at a time
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    /// Create an idle coordinator
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the current refresh cycle, starting one if none is in flight
    pub fn begin(&self) -> RefreshRole {
        let mut state = self
            .state
            .lock()
            .expect("refresh coordinator lock poisoned");
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            RefreshRole::Follower(rx)
        } else {
            state.refreshing = true;
            RefreshRole::Leader
        }
    }

    /// Settle the current cycle and wake every follower
    ///
    /// The coordinator returns to idle before any follower observes the
    /// outcome, so a replayed request that fails with 401 again is free to
    /// start a fresh cycle instead of deadlocking on this one.
    pub fn finish(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut state = self
                .state
                .lock()
                .expect("refresh coordinator lock poisoned");
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            // A follower that gave up waiting is not an error.
            let _ = waiter.send(outcome.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_caller_leads_and_later_callers_follow() {
        let coordinator = RefreshCoordinator::new();

        let leader = coordinator.begin();
        assert!(matches!(leader, RefreshRole::Leader));

        let follower = coordinator.begin();
        let RefreshRole::Follower(rx) = follower else {
            panic!("second caller must not start a second refresh");
        };

        coordinator.finish(Ok(()));
        assert!(rx.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn finish_returns_to_idle_before_notifying() {
        let coordinator = RefreshCoordinator::new();

        assert!(matches!(coordinator.begin(), RefreshRole::Leader));
        let RefreshRole::Follower(rx) = coordinator.begin() else {
            panic!("expected follower");
        };

        coordinator.finish(Err(RefreshError("refresh rejected".into())));

        // The cycle settled, so the next 401 may lead a brand new one.
        assert!(matches!(coordinator.begin(), RefreshRole::Leader));
        assert!(rx.await.unwrap().is_err());
        coordinator.finish(Ok(()));
    }

    #[tokio::test]
    async fn every_follower_of_a_cycle_sees_the_outcome() {
        let coordinator = RefreshCoordinator::new();

        assert!(matches!(coordinator.begin(), RefreshRole::Leader));
        let followers: Vec<_> = (0..8)
            .map(|_| match coordinator.begin() {
                RefreshRole::Follower(rx) => rx,
                RefreshRole::Leader => panic!("only one leader per cycle"),
            })
            .collect();

        coordinator.finish(Ok(()));

        for rx in followers {
            assert!(rx.await.unwrap().is_ok());
        }
    }
}
