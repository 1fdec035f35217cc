/// Position in the device list, always inside `[0, count)` while the list is
/// non-empty. Moving past either end wraps around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceCursor {
    index: usize,
    count: usize,
}

impl DeviceCursor {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Adopts a new list length. The index resets to 0 when it no longer fits.
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        if self.index >= count {
            self.index = 0;
        }
    }

    /// Steps forward, or returns `None` on an empty list.
    pub fn next(&mut self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        self.index = (self.index + 1) % self.count;
        Some(self.index)
    }

    /// Steps back, or returns `None` on an empty list.
    pub fn previous(&mut self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        self.index = (self.index + self.count - 1) % self.count;
        Some(self.index)
    }
}
