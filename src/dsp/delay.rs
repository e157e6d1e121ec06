/// Pre-allocated circular delay line.
///
/// Capacity is fixed at construction; every runtime operation is
/// allocation-free. Reads are relative to the most recently written
/// sample, so `read(0)` returns what the last `write` stored.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(max_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_samples.max(1)],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    #[inline]
    pub fn read(&self, delay_samples: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.min(len - 1);
        self.buffer[(self.write_pos + len - 1 - delay) % len]
    }

    /// Linear-interpolated read at a fractional delay, for modulated taps.
    #[inline]
    pub fn read_fractional(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(0.0, (len - 1) as f32);
        let whole = delay as usize;
        let frac = delay - whole as f32;
        let a = self.read(whole);
        let b = self.read((whole + 1).min(len - 1));
        a + (b - a) * frac
    }

    /// Write `sample` and return the signal `delay_samples` back.
    #[inline]
    pub fn next_sample(&mut self, sample: f32, delay_samples: usize) -> f32 {
        self.write(sample);
        self.read(delay_samples)
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_after_the_delay_time() {
        let mut line = DelayLine::new(64);
        assert_eq!(line.next_sample(1.0, 10), 0.0);
        for _ in 0..9 {
            assert_eq!(line.next_sample(0.0, 10), 0.0);
        }
        assert_eq!(line.next_sample(0.0, 10), 1.0);
    }

    #[test]
    fn zero_delay_returns_the_current_sample() {
        let mut line = DelayLine::new(8);
        assert_eq!(line.next_sample(0.5, 0), 0.5);
    }

    #[test]
    fn fractional_read_interpolates() {
        let mut line = DelayLine::new(16);
        line.write(0.0);
        line.write(1.0);
        // Halfway between the last two writes.
        assert!((line.read_fractional(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn delay_clamps_to_capacity() {
        let mut line = DelayLine::new(4);
        line.write(1.0);
        line.write(2.0);
        line.write(3.0);
        line.write(4.0);
        // A request beyond capacity reads the oldest retained sample.
        assert_eq!(line.read(100), 1.0);
    }

    #[test]
    fn reset_clears_history() {
        let mut line = DelayLine::new(8);
        line.next_sample(1.0, 4);
        line.reset();
        for _ in 0..8 {
            assert_eq!(line.next_sample(0.0, 4), 0.0);
        }
    }
}
