//! Sample-and-hold noise source.

/// Xorshift32 generator: three shifts and xors per draw, period 2^32 - 1.
#[derive(Debug, Clone, Copy)]
pub struct Noise {
    state: u32,
}

impl Noise {
    /// Seed the generator. A zero seed is replaced since it would lock up.
    pub const fn new(seed: u32) -> Self {
        Noise {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
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

    /// Uniform sample in `-32768..=32767`.
    #[inline]
    pub fn next_sample(&mut self) -> i32 {
        (self.next_u32() >> 16) as i32 - 32768
    }
}
