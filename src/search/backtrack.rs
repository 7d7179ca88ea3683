/// Storage grows by this many entries at a time.
pub const CAPACITY_INC: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktrackEntry {
    pub word: usize,
    /// End time of the frame that completed the word, if the input was timed.
    pub time: Option<u64>,
}

/// Words completed so far by one search hypothesis, in completion order.
///
/// `capacity` is tracked apart from the backing `Vec`: it grows in
/// `CAPACITY_INC` steps and never shrinks.
#[derive(Debug, Clone, Default)]
pub struct BacktrackStack {
    entries: Vec<BacktrackEntry>,
    capacity: usize,
}

impl BacktrackStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, word: usize, time: Option<u64>) {
        self.grow_to(self.entries.len() + 1);
        self.entries.push(BacktrackEntry { word, time });
    }

    pub fn pop(&mut self) -> Option<BacktrackEntry> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn copy_from(&mut self, other: &BacktrackStack) {
        self.grow_to(other.capacity);
        self.entries.clear();
        self.entries.extend_from_slice(&other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &BacktrackEntry> {
        self.entries.iter()
    }

    pub fn words(&self) -> Vec<usize> {
        self.entries.iter().map(|entry| entry.word).collect()
    }

    fn grow_to(&mut self, required: usize) {
        if required <= self.capacity {
            return;
        }
        while self.capacity < required {
            self.capacity += CAPACITY_INC;
        }
        self.entries.reserve_exact(self.capacity - self.entries.len());
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn smallest_multiple_of_inc(size: usize) -> usize {
        size.div_ceil(CAPACITY_INC) * CAPACITY_INC
    }

    #[test]
    fn capacity_increment_is_ten() {
        assert_eq!(CAPACITY_INC, 10);
    }

    #[test]
    fn new_stack_is_empty() {
        let stack = BacktrackStack::new();
        assert_eq!(stack.len(), 0);
        assert_eq!(stack.capacity(), 0);
        assert!(stack.is_empty());
    }

    #[test]
    fn pushes_grow_capacity_in_fixed_steps() {
        let mut stack = BacktrackStack::new();
        for n in 1..=95 {
            stack.push(n, Some(n as u64 * 100));
            assert_eq!(stack.len(), n);
            assert_eq!(stack.capacity(), smallest_multiple_of_inc(n));
        }
    }

    #[test]
    fn random_push_sequences_keep_growth_contract() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let count = rng.gen_range(0..300);
            let mut stack = BacktrackStack::new();
            for i in 0..count {
                stack.push(rng.gen_range(0..1000), Some(i as u64));
            }
            assert_eq!(stack.len(), count);
            assert_eq!(stack.capacity(), smallest_multiple_of_inc(count));
        }
    }

    #[test]
    fn pop_on_empty_is_noop() {
        let mut stack = BacktrackStack::new();
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.len(), 0);
        assert_eq!(stack.capacity(), 0);
    }

    #[test]
    fn pop_keeps_capacity() {
        let mut stack = BacktrackStack::new();
        for i in 0..11 {
            stack.push(i, None);
        }
        assert_eq!(stack.capacity(), 20);
        let popped = stack.pop();
        assert_eq!(popped, Some(BacktrackEntry { word: 10, time: None }));
        assert_eq!(stack.len(), 10);
        assert_eq!(stack.capacity(), 20);
    }

    #[test]
    fn clear_resets_length_only() {
        let mut stack = BacktrackStack::new();
        for i in 0..25 {
            stack.push(i, Some(1));
        }
        stack.clear();
        assert_eq!(stack.len(), 0);
        assert_eq!(stack.capacity(), 30);
        stack.push(7, None);
        assert_eq!(stack.capacity(), 30);
        assert_eq!(stack.words(), vec![7]);
    }

    #[test]
    fn copy_from_duplicates_entries_and_capacity() {
        let mut source = BacktrackStack::new();
        for i in 0..23 {
            source.push(i * 2, Some(i as u64 * 1000));
        }
        source.pop();

        let mut dest = BacktrackStack::new();
        dest.push(99, None);
        dest.copy_from(&source);

        assert_eq!(dest.len(), source.len());
        assert!(dest.capacity() >= source.capacity());
        assert_eq!(dest.capacity(), 30);
        assert!(dest.iter().eq(source.iter()));
    }

    #[test]
    fn copy_from_smaller_source_keeps_larger_capacity() {
        let mut source = BacktrackStack::new();
        source.push(1, None);

        let mut dest = BacktrackStack::new();
        for i in 0..35 {
            dest.push(i, None);
        }
        dest.copy_from(&source);
        assert_eq!(dest.len(), 1);
        assert_eq!(dest.capacity(), 40);
        assert_eq!(dest.words(), vec![1]);
    }
}
