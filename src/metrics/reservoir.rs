/// Fixed-capacity ring buffer of the most recent duration samples.
///
/// Below capacity every push appends; once full, each push overwrites the
/// oldest slot, so the buffer always holds the last `capacity` values.
#[derive(Debug)]
pub struct Reservoir {
    samples: Vec<u64>,
    capacity: usize,
    /// Slot the next overwrite lands in once the buffer is full.
    next: usize,
}

impl Reservoir {
    /// A zero capacity is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    pub fn push(&mut self, value: u64) {
        if self.samples.len() < self.capacity {
            self.samples.push(value);
        } else {
            self.samples[self.next] = value;
            self.next = (self.next + 1) % self.capacity;
        }
    }

    /// Copy of the samples in slot order, unsorted.
    pub fn to_vec(&self) -> Vec<u64> {
        self.samples.clone()
    }
}
