//! Deterministic noise source.
//!
//! Noise oscillators and sample-and-hold LFOs need randomness, but the
//! engine promises bit-identical renders for identical inputs. A small
//! xorshift generator reseeded at every note-on keeps the signal path
//! deterministic while still sounding like noise.

#[derive(Debug, Clone, Copy)]
pub struct NoiseGen {
    state: u32,
}

impl NoiseGen {
    pub const fn new(seed: u32) -> Self {
        // Zero state would lock the generator.
        Self {
            state: if seed == 0 { 0x9e37_79b9 } else { seed },
        }
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform sample in [-1, 1].
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        (self.next_u32() as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    pub fn reseed(&mut self, seed: u32) {
        *self = Self::new(seed);
    }
}
