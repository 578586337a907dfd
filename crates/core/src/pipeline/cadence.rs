/// Modulus gate selecting which frames trigger attribute analysis.
///
/// Analysis is expensive relative to display; running it on every Nth
/// frame keeps the preview smooth while annotations stay near-current.
#[derive(Clone, Copy, Debug)]
pub struct FrameCadence {
    interval: u64,
}

impl FrameCadence {
    pub fn new(interval: u64) -> Result<Self, &'static str> {
        if interval < 1 {
            return Err("cadence interval must be >= 1");
        }
        Ok(Self { interval })
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// True exactly when the 1-based frame number is a multiple of the
    /// interval.
    pub fn should_analyze(&self, frame_number: u64) -> bool {
        frame_number % self.interval == 0
    }
}
