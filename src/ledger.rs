//! Dedup guard for user-triggered actions.
//!
//! Chat frontends happily deliver the same button press twice. The adapter
//! hands every mutating operation the id of the triggering user action; the
//! operation claims it here before touching the store. A second claim for
//! the same id is rejected until the claim ages out, so a replayed action is
//! a no-op. Claims are released again when the operation fails, allowing a
//! retry.

use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Display, Formatter};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// The adapter-supplied identifier of one user action.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ActionId(pub i64);

impl Display for ActionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Debug)]
pub struct ActionLedger {
    capacity: usize,
    retention: Duration,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    claims: HashMap<ActionId, Instant>,
    order: VecDeque<(ActionId, Instant)>,
}

impl ActionLedger {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self {
            capacity,
            retention,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Claims the action id. Returns `false` if an unexpired claim for the
    /// same id already exists.
    pub fn try_claim(&self, action: ActionId) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        loop {
            let evict = match inner.order.front() {
                Some((_, at)) => {
                    now.duration_since(*at) >= self.retention || inner.order.len() >= self.capacity
                }
                None => break,
            };

            if !evict {
                break;
            }

            if let Some((action, at)) = inner.order.pop_front() {
                // A released or re-claimed id leaves a stale queue entry
                // behind; only drop the claim this entry created.
                if inner.claims.get(&action) == Some(&at) {
                    inner.claims.remove(&action);
                }
            }
        }

        if inner.claims.contains_key(&action) {
            log::debug!("Action {} was already processed", action);
            return false;
        }

        inner.claims.insert(action, now);
        inner.order.push_back((action, now));

        true
    }

    /// Drops the claim so the action can be retried. Called when the claimed
    /// operation fails.
    pub fn release(&self, action: ActionId) {
        let mut inner = self.inner.lock();
        inner.claims.remove(&action);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ActionId, ActionLedger};

    #[test]
    fn test_claim_rejects_duplicate() {
        let ledger = ActionLedger::new(16, Duration::from_secs(600));

        assert!(ledger.try_claim(ActionId(1)));
        assert!(!ledger.try_claim(ActionId(1)));
        assert!(ledger.try_claim(ActionId(2)));
    }

    #[test]
    fn test_release_allows_retry() {
        let ledger = ActionLedger::new(16, Duration::from_secs(600));

        assert!(ledger.try_claim(ActionId(1)));
        ledger.release(ActionId(1));
        assert!(ledger.try_claim(ActionId(1)));
    }

    #[test]
    fn test_expired_claim_can_be_taken_again() {
        let ledger = ActionLedger::new(16, Duration::ZERO);

        assert!(ledger.try_claim(ActionId(1)));
        assert!(ledger.try_claim(ActionId(1)));
    }

    #[test]
    fn test_capacity_bounds_claims() {
        let ledger = ActionLedger::new(2, Duration::from_secs(600));

        assert!(ledger.try_claim(ActionId(1)));
        assert!(ledger.try_claim(ActionId(2)));
        assert!(ledger.try_claim(ActionId(3)));
        assert!(ledger.try_claim(ActionId(4)));

        // The oldest claims were evicted to stay within capacity.
        assert!(ledger.try_claim(ActionId(1)));
    }

    #[test]
    fn test_claims_settle_at_capacity() {
        let ledger = ActionLedger::new(2, Duration::from_secs(600));

        for id in 1..=3 {
            assert!(ledger.try_claim(ActionId(id)));
        }

        // Inserting into a full ledger evicts first, so the claim count
        // never exceeds the capacity.
        assert_eq!(ledger.inner.lock().claims.len(), 2);
        assert!(ledger.try_claim(ActionId(1)));
    }
}
