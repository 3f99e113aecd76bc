//! Id generation for every entity the service creates.
//!
//! Reconciliation never calls `Uuid::new_v4` directly; it asks the injected
//! generator so tests can pin exact output shapes.

use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

/// Random v4 ids. Used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic ids `start + 1, start + 2, ...` rendered as u128 UUIDs.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl SequentialIds {
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: std::sync::atomic::AtomicU64::new(start),
        }
    }
}

#[cfg(test)]
impl IdGenerator for SequentialIds {
    fn next_id(&self) -> Uuid {
        let n = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            .saturating_add(1);
        Uuid::from_u128(u128::from(n))
    }
}
