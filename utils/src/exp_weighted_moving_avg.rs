/// Exponentially-weighted moving average over a sample count.
///
/// Each new sample decays the existing state by `2^(-1 / half_life)`, so after `half_life`
/// samples an old observation carries half of its original weight.
#[derive(Debug, Clone)]
pub struct ExpWeightedMovingAvg {
    half_life_count: f64,
    weight: f64,
    value: f64,
}

impl ExpWeightedMovingAvg {
    pub fn new_count_decay(half_life_count: f64) -> Self {
        assert!(half_life_count.is_finite() && half_life_count > 0.0, "half-life must be positive");

        Self {
            half_life_count,
            weight: 0.0,
            value: 0.0,
        }
    }

    pub fn update(&mut self, sample: f64) {
        let decay = (-1.0 / self.half_life_count).exp2();

        self.weight = self.weight * decay + 1.0;
        self.value = self.value * decay + sample;
    }

    /// Current weighted mean, 0.0 before any sample.
    pub fn value(&self) -> f64 {
        if self.weight == 0.0 { 0.0 } else { self.value / self.weight }
    }

    pub fn reset(&mut self) {
        self.weight = 0.0;
        self.value = 0.0;
    }
}
