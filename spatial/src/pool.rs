//! Recycling of short-lived vectors.

/// Free list of cleared vectors handed out again instead of reallocating.
///
/// Vectors returned through [`VecPool::give`] are cleared but keep their
/// capacity. The pool never hands out a vector that is still owned elsewhere:
/// ownership moves in and out by value.
#[derive(Debug)]
pub struct VecPool<T> {
    free: Vec<Vec<T>>,
    max_pooled: usize,
}

impl<T> VecPool<T> {
    /// Creates a pool that retains at most `max_pooled` idle vectors.
    #[must_use]
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Vec::new(),
            max_pooled,
        }
    }

    /// Takes an empty vector from the pool, allocating when none is idle.
    pub fn take(&mut self) -> Vec<T> {
        self.free.pop().unwrap_or_default()
    }

    /// Returns a vector to the pool. Excess vectors are dropped.
    pub fn give(&mut self, mut vec: Vec<T>) {
        if self.free.len() >= self.max_pooled {
            return;
        }
        vec.clear();
        self.free.push(vec);
    }

    /// Number of idle vectors waiting for reuse.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.len()
    }
}

impl<T> Default for VecPool<T> {
    fn default() -> Self {
        Self::new(1_024)
    }
}
