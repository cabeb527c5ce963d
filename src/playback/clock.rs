use std::time::Duration;

/// Source of the current playback position.
pub trait PlaybackClock {
    fn elapsed(&self) -> Duration;

    /// Called once after every presented frame.
    fn advance(&mut self) {}
}

/// Clock driven by presented video frames: frame `n` shows time `n / fps`.
pub struct FrameClock {
    fps: u32,
    presented: u64,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            presented: 0,
        }
    }
}

impl PlaybackClock for FrameClock {
    fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.presented as f64 / self.fps as f64)
    }

    fn advance(&mut self) {
        self.presented += 1;
    }
}
