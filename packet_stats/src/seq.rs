/// Maps wrapping sequence numbers of a fixed bit width onto a monotonic `i64` line.
///
/// Each new number is placed at the signed distance from the previous one that is smallest
/// in magnitude, so `65535` followed by `0` (16 bits) becomes `65535, 65536`. Reordered
/// packets within half the sequence space land behind their successors.
#[derive(Clone, Debug)]
pub struct SequenceUnwrapper {
    bits: u32,
    last: Option<(i64, i64)>,
}

impl SequenceUnwrapper {
    /// `bits` is clamped to `1..=32`.
    pub fn new(bits: u32) -> Self {
        Self {
            bits: bits.clamp(1, 32),
            last: None,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    fn modulus(&self) -> i64 {
        1i64 << self.bits
    }

    pub fn unwrap(&mut self, sequence_number: u64) -> i64 {
        let modulus = self.modulus();
        let raw = (sequence_number & (modulus as u64 - 1)) as i64;

        let unwrapped = match self.last {
            None => raw,
            Some((last_raw, last_unwrapped)) => {
                let mut delta = raw - last_raw;
                if delta >= modulus / 2 {
                    delta -= modulus;
                } else if delta < -(modulus / 2) {
                    delta += modulus;
                }
                last_unwrapped + delta
            },
        };

        self.last = Some((raw, unwrapped));
        unwrapped
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
