//! # Counter — Prefix Counts over a Sieve Segment
//!
//! A Fenwick (binary indexed) tree over the liveness flags of one segment.
//! `tree[i]` holds the number of alive positions in `(i & (i + 1)) ..= i`,
//! so both point removal and inclusive prefix counts walk O(log n) nodes.
//!
//! | Operation | Time |
//! |-----------|------|
//! | `build(liveness)` | O(n) |
//! | `deactivate(offset)` | O(log n) |
//! | `query(offset)` | O(log n) |
//!
//! The counter holds no liveness of its own: callers deactivate a position at
//! most once, and only while it is still alive in the segment they sieve.

#[derive(Debug, Clone)]
pub struct PrefixCounter {
    tree: Vec<i32>,
}

impl PrefixCounter {
    /// A counter for segments of `len` positions (a power of two).
    pub fn new(len: usize) -> Self {
        debug_assert!(len.is_power_of_two(), "segment length {} is not a power of two", len);
        PrefixCounter {
            tree: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Rebuild from a liveness array in linear time.
    pub fn build(&mut self, alive: &[bool]) {
        assert_eq!(alive.len(), self.tree.len());
        for (node, &a) in self.tree.iter_mut().zip(alive) {
            *node = a as i32;
        }
        let n = self.tree.len();
        for i in 0..n {
            let parent = i | (i + 1);
            if parent < n {
                self.tree[parent] += self.tree[i];
            }
        }
    }

    /// Mark `offset` dead. The position must currently be alive.
    #[inline]
    pub fn deactivate(&mut self, offset: usize) {
        let n = self.tree.len();
        let mut i = offset;
        while i < n {
            self.tree[i] -= 1;
            i |= i + 1;
        }
    }

    /// Number of alive positions in `[0, offset]`.
    #[inline]
    pub fn query(&self, offset: usize) -> i64 {
        debug_assert!(offset < self.tree.len());
        let mut sum = 0i64;
        let mut i = offset + 1;
        while i > 0 {
            sum += self.tree[i - 1] as i64;
            i &= i - 1;
        }
        sum
    }
}
