//! Fixed-capacity window over the most recent readings of one stream.

use std::collections::VecDeque;
use std::ops::Sub;

use crate::error::WindowError;

/// Ring buffer holding the `capacity` most recent values, oldest first.
///
/// Pushing into a full window evicts the oldest value. The window is
/// "warming up" until it first fills; [`delta`](Self::delta) is only
/// defined once it is full.
///
/// # Example
///
/// ```
/// use bbq_monitor::SlidingWindow;
///
/// let mut window = SlidingWindow::new(3);
/// window.push(10.0);
/// window.push(12.0);
/// assert!(window.delta().is_err());
///
/// window.push(15.0);
/// assert_eq!(window.delta(), Ok(5.0));
///
/// window.push(11.0); // evicts 10.0
/// assert_eq!(window.delta(), Ok(-1.0));
/// ```
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    /// Create an empty window.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest one if the window is full.
    pub fn push(&mut self, value: T) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Whether the window holds `capacity` values.
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed value.
    pub fn newest(&self) -> Option<&T> {
        self.values.back()
    }

    /// Oldest value still held.
    pub fn oldest(&self) -> Option<&T> {
        self.values.front()
    }

    /// Values in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Drop every value, returning the window to its warm-up state.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl<T> SlidingWindow<T>
where
    T: Copy + Sub<Output = T>,
{
    /// Newest minus oldest, signed.
    ///
    /// Fails with [`WindowError::Precondition`] until the window is full.
    pub fn delta(&self) -> Result<T, WindowError> {
        match (self.is_full(), self.values.back(), self.values.front()) {
            (true, Some(&newest), Some(&oldest)) => Ok(newest - oldest),
            _ => Err(WindowError::Precondition {
                len: self.values.len(),
                capacity: self.capacity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warming_up_has_no_delta() {
        let mut window = SlidingWindow::new(5);
        for n in 0..4 {
            assert_eq!(window.len(), n);
            assert!(!window.is_full());
            assert_eq!(
                window.delta(),
                Err(WindowError::Precondition { len: n, capacity: 5 })
            );
            window.push(100.0);
        }
        assert!(!window.is_full());
        assert!(window.delta().is_err());
    }

    #[test]
    fn test_full_window_delta_is_newest_minus_oldest() {
        let mut window = SlidingWindow::new(5);
        for v in [225.0, 220.0, 215.0, 210.0, 205.0] {
            window.push(v);
        }
        assert!(window.is_full());
        assert_eq!(window.delta(), Ok(-20.0));
    }

    #[test]
    fn test_eviction_keeps_most_recent_in_order() {
        let mut window = SlidingWindow::new(3);
        for v in 1..=7 {
            window.push(v);
            assert!(window.len() <= 3);
        }
        let held: Vec<i32> = window.iter().copied().collect();
        assert_eq!(held, vec![5, 6, 7]);
        assert_eq!(window.oldest(), Some(&5));
        assert_eq!(window.newest(), Some(&7));
        assert_eq!(window.delta(), Ok(2));
    }

    #[test]
    fn test_delta_is_signed() {
        let mut window = SlidingWindow::new(2);
        window.push(10);
        window.push(3);
        assert_eq!(window.delta(), Ok(-7));
        window.push(20);
        assert_eq!(window.delta(), Ok(17));
    }

    #[test]
    fn test_capacity_one() {
        let mut window = SlidingWindow::new(1);
        window.push(42.0);
        assert!(window.is_full());
        assert_eq!(window.delta(), Ok(0.0));
    }

    #[test]
    fn test_clear_restarts_warm_up() {
        let mut window = SlidingWindow::new(2);
        window.push(1.0);
        window.push(2.0);
        assert!(window.is_full());

        window.clear();
        assert!(window.is_empty());
        assert!(window.delta().is_err());
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_capacity_panics() {
        let _ = SlidingWindow::<f64>::new(0);
    }
}
