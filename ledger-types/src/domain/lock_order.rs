//! Lock ordering policy.
//!
//! Whenever two accounts have to be locked inside one transaction they are
//! locked in ascending key order. Every transaction acquiring locks in the
//! same global order rules out circular waits, so two transfers moving funds
//! in opposite directions between the same pair can never deadlock.

/// The order in which a pair of keys must be locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOrder<K> {
    /// Lower key, locked first
    pub first: K,
    /// Higher key, locked second (equal to `first` for a single key)
    pub second: K,
}

/// Returns the pair in ascending order.
///
/// Total over every pair, including equal keys.
pub fn lock_order<K: Ord + Copy>(a: K, b: K) -> LockOrder<K> {
    if a <= b {
        LockOrder { first: a, second: b }
    } else {
        LockOrder { first: b, second: a }
    }
}

impl<K: Ord + Copy> LockOrder<K> {
    /// Returns true when both keys are the same and only one lock is needed.
    pub fn is_single(&self) -> bool {
        self.first == self.second
    }

    /// Keys to lock, in order, without repeating an equal key.
    pub fn distinct(&self) -> impl Iterator<Item = K> {
        let second = (!self.is_single()).then_some(self.second);
        std::iter::once(self.first).chain(second)
    }

    /// Returns true when `key` is locked first.
    pub fn is_first(&self, key: K) -> bool {
        self.first == key
    }
}
