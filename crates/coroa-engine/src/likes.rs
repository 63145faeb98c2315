use rand::Rng;

pub const MIN_THRESHOLD: u32 = 1;
pub const MAX_THRESHOLD: u32 = 3;

pub fn random_threshold() -> u32 {
    rand::rng().random_range(MIN_THRESHOLD..=MAX_THRESHOLD)
}

/// Counts likes until a pre-drawn threshold turns one of them into a match.
#[derive(Debug, Clone)]
pub struct LikeCounter {
    likes: u32,
    threshold: u32,
}

impl LikeCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            likes: 0,
            threshold: threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD),
        }
    }

    pub fn random() -> Self {
        Self::new(random_threshold())
    }

    pub fn likes(&self) -> u32 {
        self.likes
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Registers one like. Returns true when it reaches the threshold.
    pub fn like(&mut self) -> bool {
        self.likes += 1;
        self.likes >= self.threshold
    }

    /// Starts a new round after a match.
    pub fn rearm(&mut self, threshold: u32) {
        *self = Self::new(threshold);
    }
}
