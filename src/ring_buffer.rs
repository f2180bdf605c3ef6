//! Fixed-capacity circular buffer.
//!
//! The only data-passing primitive between pipeline stages. Capacity is a
//! const generic so storage lives inline and never grows. Writes never fail:
//! when the buffer is full the oldest unread entry is evicted, trading
//! completeness for bounded latency.

/// Circular FIFO of `N` entries with overwrite-oldest semantics.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    slots: [T; N],
    /// Index of the oldest unread entry.
    head: usize,
    /// Number of unread entries.
    len: usize,
    /// Most recently written entry. Survives `pop`, cleared by `clear`.
    last: Option<T>,
    /// Entries dropped on overflow since the last `clear`.
    evicted: u64,
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    const NON_ZERO: () = assert!(N > 0, "ring buffer capacity must be non-zero");

    /// Create an empty buffer.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO;
        Self {
            slots: [T::default(); N],
            head: 0,
            len: 0,
            last: None,
            evicted: 0,
        }
    }

    /// Return to the empty state. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.last = None;
        self.evicted = 0;
    }

    /// Append an entry, evicting the oldest one if the buffer is full.
    ///
    /// Returns `true` when an entry was evicted.
    pub fn push(&mut self, item: T) -> bool {
        let write = (self.head + self.len) % N;
        self.slots[write] = item;
        self.last = Some(item);

        if self.len == N {
            self.head = (self.head + 1) % N;
            self.evicted += 1;
            true
        } else {
            self.len += 1;
            false
        }
    }

    /// Remove and return the oldest entry.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(item)
    }

    /// The most recently written entry, whether or not it has been consumed.
    ///
    /// `None` only if nothing was written since construction or `clear`.
    pub fn peek_last(&self) -> Option<&T> {
        self.last.as_ref()
    }

    /// Unread entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).map(move |i| &self.slots[(self.head + i) % N])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Entries lost to overflow since the last `clear`.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buf: RingBuffer<u32, 4> = RingBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 4);
        assert!(buf.peek_last().is_none());
    }

    #[test]
    fn test_fifo_order() {
        let mut buf: RingBuffer<u32, 4> = RingBuffer::new();
        buf.push(1);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.pop(), Some(1));
        assert_eq!(buf.pop(), Some(2));
        assert_eq!(buf.pop(), Some(3));
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut buf: RingBuffer<u32, 3> = RingBuffer::new();
        assert!(!buf.push(1));
        assert!(!buf.push(2));
        assert!(!buf.push(3));
        assert!(buf.is_full());
        assert!(buf.push(4));

        assert_eq!(buf.evicted(), 1);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_peek_last_survives_pop() {
        let mut buf: RingBuffer<u32, 2> = RingBuffer::new();
        buf.push(7);
        buf.push(9);
        buf.pop();
        buf.pop();
        assert!(buf.is_empty());
        assert_eq!(buf.peek_last(), Some(&9));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut buf: RingBuffer<u32, 2> = RingBuffer::new();
        buf.push(1);
        buf.push(2);
        buf.push(3);
        buf.clear();

        assert!(buf.is_empty());
        assert!(buf.peek_last().is_none());
        assert_eq!(buf.evicted(), 0);
        assert_eq!(buf.capacity(), 2);
    }

    #[test]
    fn test_interleaved_push_pop_wraps() {
        let mut buf: RingBuffer<u32, 3> = RingBuffer::new();
        for i in 0..10 {
            buf.push(i);
            assert_eq!(buf.pop(), Some(i));
        }
        assert!(buf.is_empty());
        assert_eq!(buf.evicted(), 0);
    }

    fn retains_newest<const N: usize>(count: usize) -> Result<(), TestCaseError> {
        let mut buf: RingBuffer<usize, N> = RingBuffer::new();
        for i in 0..count {
            buf.push(i);
        }
        let kept: Vec<usize> = buf.iter().copied().collect();
        let expected: Vec<usize> = (count.saturating_sub(N)..count).collect();
        prop_assert_eq!(kept, expected);
        prop_assert_eq!(buf.evicted() as usize, count.saturating_sub(N));
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_retains_most_recent_entries(count in 0usize..200) {
            retains_newest::<1>(count)?;
            retains_newest::<7>(count)?;
            retains_newest::<64>(count)?;
        }
    }
}
