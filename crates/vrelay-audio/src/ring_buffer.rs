//! Fixed-capacity circular history buffer of mono f32 samples.
//!
//! Unlike a transport queue, this buffer is never drained: callers append as
//! audio arrives and query the most recent `N` samples non-destructively,
//! used both for VAD pre-roll and for STT bridging-reset replay.

/// A circular buffer holding the most recent `capacity_samples` samples.
pub struct RingBuffer {
    buffer: Vec<f32>,
    capacity_samples: usize,
    write_pos: usize,
    filled: bool,
}

impl RingBuffer {
    /// Panics if `capacity_samples` is zero; callers size this from a
    /// validated configuration value.
    pub fn new(capacity_samples: usize) -> Self {
        assert!(capacity_samples > 0, "ring buffer capacity must be positive");
        Self {
            buffer: vec![0.0; capacity_samples],
            capacity_samples,
            write_pos: 0,
            filled: false,
        }
    }

    pub fn capacity_samples(&self) -> usize {
        self.capacity_samples
    }

    pub fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
        self.filled = false;
    }

    pub fn append(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        if samples.len() >= self.capacity_samples {
            let start = samples.len() - self.capacity_samples;
            self.buffer.copy_from_slice(&samples[start..]);
            self.write_pos = 0;
            self.filled = true;
            return;
        }

        let end = self.write_pos + samples.len();
        if end <= self.capacity_samples {
            self.buffer[self.write_pos..end].copy_from_slice(samples);
        } else {
            let first_len = self.capacity_samples - self.write_pos;
            self.buffer[self.write_pos..].copy_from_slice(&samples[..first_len]);
            self.buffer[..end - self.capacity_samples].copy_from_slice(&samples[first_len..]);
        }

        if end >= self.capacity_samples {
            self.filled = true;
        }
        self.write_pos = end % self.capacity_samples;
    }

    /// Return the most recent `count` samples, oldest first. Returns fewer
    /// than `count` if the buffer has not yet accumulated that much history.
    pub fn get_last_samples(&self, count: usize) -> Vec<f32> {
        if count == 0 {
            return Vec::new();
        }

        let available = if self.filled {
            self.capacity_samples
        } else {
            self.write_pos
        };
        let count = count.min(available);
        if count == 0 {
            return Vec::new();
        }

        let start = (self.write_pos + self.capacity_samples - count) % self.capacity_samples;
        if start + count <= self.capacity_samples {
            self.buffer[start..start + count].to_vec()
        } else {
            let tail_len = self.capacity_samples - start;
            let mut out = Vec::with_capacity(count);
            out.extend_from_slice(&self.buffer[start..]);
            out.extend_from_slice(&self.buffer[..count - tail_len]);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_returns_nothing() {
        let ring = RingBuffer::new(8);
        assert_eq!(ring.get_last_samples(4), Vec::<f32>::new());
    }

    #[test]
    fn partial_fill_returns_only_written_samples() {
        let mut ring = RingBuffer::new(8);
        ring.append(&[1.0, 2.0, 3.0]);
        assert_eq!(ring.get_last_samples(8), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn get_last_samples_caps_at_available() {
        let mut ring = RingBuffer::new(8);
        ring.append(&[1.0, 2.0, 3.0]);
        assert_eq!(ring.get_last_samples(2), vec![2.0, 3.0]);
    }

    #[test]
    fn wraparound_preserves_chronological_order() {
        let mut ring = RingBuffer::new(4);
        ring.append(&[1.0, 2.0, 3.0, 4.0]);
        ring.append(&[5.0, 6.0]);
        assert_eq!(ring.get_last_samples(4), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn oversized_append_keeps_only_the_tail() {
        let mut ring = RingBuffer::new(4);
        ring.append(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(ring.get_last_samples(4), vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn clear_resets_history() {
        let mut ring = RingBuffer::new(4);
        ring.append(&[1.0, 2.0, 3.0, 4.0]);
        ring.clear();
        assert_eq!(ring.get_last_samples(4), Vec::<f32>::new());
    }

    #[test]
    fn many_small_appends_wrap_correctly() {
        let mut ring = RingBuffer::new(5);
        for i in 0..12 {
            ring.append(&[i as f32]);
        }
        assert_eq!(ring.get_last_samples(5), vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }
}
