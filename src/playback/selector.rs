use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    /// True when `index` moved past the last rendered frame.
    pub advanced: bool,
}

/// Maps playback time onto analysis frames and remembers the last one shown.
pub struct FrameSelector {
    samples_per_second: f64,
    frame_size: usize,
    frame_count: usize,
    last: Option<usize>,
}

impl FrameSelector {
    pub fn new(sample_rate: u32, channels: u16, frame_size: usize, frame_count: usize) -> Self {
        Self {
            samples_per_second: sample_rate as f64 * channels as f64,
            frame_size,
            frame_count,
            last: None,
        }
    }

    /// `⌊elapsed · rate · channels / frame_size⌋`, without clamping.
    pub fn frame_index(&self, elapsed: Duration) -> usize {
        let sample = (elapsed.as_secs_f64() * self.samples_per_second).floor();
        (sample / self.frame_size as f64).floor() as usize
    }

    pub fn select(&mut self, elapsed: Duration) -> Selection {
        let Some(last_frame) = self.frame_count.checked_sub(1) else {
            return Selection {
                index: 0,
                advanced: false,
            };
        };

        let index = self.frame_index(elapsed).min(last_frame);
        let advanced = self.last.map_or(true, |last| index > last);
        if advanced {
            self.last = Some(index);
        }

        Selection {
            index: self.last.unwrap_or(index),
            advanced,
        }
    }

    pub fn last(&self) -> Option<usize> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_formula() {
        let selector = FrameSelector::new(44_100, 1, 2048, 100);
        assert_eq!(selector.frame_index(Duration::ZERO), 0);
        // 2048 / 44100 s is exactly one frame
        assert_eq!(selector.frame_index(Duration::from_secs_f64(2048.0 / 44_100.0 + 1e-9)), 1);
        assert_eq!(selector.frame_index(Duration::from_secs(1)), 21);

        let stereo = FrameSelector::new(44_100, 2, 2048, 100);
        assert_eq!(stereo.frame_index(Duration::from_secs(1)), 43);
    }

    #[test]
    fn first_select_always_advances() {
        let mut selector = FrameSelector::new(44_100, 1, 2048, 10);
        let first = selector.select(Duration::ZERO);
        assert_eq!(first, Selection { index: 0, advanced: true });
        let again = selector.select(Duration::from_millis(10));
        assert_eq!(again, Selection { index: 0, advanced: false });
    }

    #[test]
    fn monotone_time_gives_monotone_indices() {
        let mut selector = FrameSelector::new(48_000, 1, 1024, 1_000);
        let mut prev = 0;
        let mut advances = 0;
        let mut changes = 0;
        let mut last_seen: Option<usize> = None;
        for ms in (0..5_000).step_by(7) {
            let sel = selector.select(Duration::from_millis(ms));
            assert!(sel.index >= prev);
            if sel.advanced {
                advances += 1;
            }
            if last_seen != Some(sel.index) {
                changes += 1;
            }
            assert_eq!(sel.advanced, last_seen != Some(sel.index));
            last_seen = Some(sel.index);
            prev = sel.index;
        }
        assert_eq!(advances, changes);
        assert!(advances > 1);
    }

    #[test]
    fn clamps_to_last_frame() {
        let mut selector = FrameSelector::new(8_000, 1, 256, 3);
        assert!(selector.select(Duration::ZERO).advanced);
        let end = selector.select(Duration::from_secs(60));
        assert_eq!(end, Selection { index: 2, advanced: true });
        let after = selector.select(Duration::from_secs(120));
        assert_eq!(after, Selection { index: 2, advanced: false });
    }

    #[test]
    fn no_frames_never_advances() {
        let mut selector = FrameSelector::new(44_100, 1, 2048, 0);
        for s in 0..5 {
            assert!(!selector.select(Duration::from_secs(s)).advanced);
        }
        assert_eq!(selector.last(), None);
    }
}
