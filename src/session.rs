use anyhow::Result;

use crate::analysis::bars::{bar_vertices, compute_bars, silent_bars, Bar, BarVertex};
use crate::analysis::{Analysis, AnalysisConfig};
use crate::playback::clock::PlaybackClock;
use crate::playback::selector::FrameSelector;
use crate::render::surface::RenderSurface;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub presented: u64,
    pub recomputed: u64,
}

/// Drives one playback of an analyzed track onto a render surface.
pub struct Session {
    analysis: Analysis,
    config: AnalysisConfig,
    selector: FrameSelector,
    bars: Vec<Bar>,
    vertices: Vec<BarVertex>,
}

impl Session {
    pub fn new(analysis: Analysis, config: AnalysisConfig) -> Self {
        let selector = FrameSelector::new(
            analysis.sample_rate,
            analysis.channels,
            config.frame_size,
            analysis.frame_count(),
        );
        Self {
            bars: Vec::with_capacity(config.num_bars),
            vertices: Vec::with_capacity(config.num_bars * 2),
            analysis,
            config,
            selector,
        }
    }

    /// Run until the surface asks to close.
    ///
    /// Bars are only recomputed when the selected frame moves forward; every
    /// other tick re-presents the previous vertex list. A frame that cannot be
    /// transformed ends the run with an error.
    pub fn run<C, S>(&mut self, clock: &mut C, surface: &mut S) -> Result<SessionStats>
    where
        C: PlaybackClock,
        S: RenderSurface,
    {
        let viewport = surface.viewport();
        let mut stats = SessionStats::default();

        silent_bars(self.config.num_bars, &mut self.bars);
        bar_vertices(&self.bars, viewport, &mut self.vertices);
        surface.set_vertices(&self.vertices)?;

        while !surface.close_requested() {
            let elapsed = clock.elapsed();
            let selection = self.selector.select(elapsed);

            if selection.advanced {
                if let Some(spectrum) = self.analysis.source.spectrum(selection.index)? {
                    log::debug!("Frame {} at {:.3}s", selection.index, elapsed.as_secs_f64());
                    compute_bars(spectrum, &self.config, viewport, &mut self.bars);
                    bar_vertices(&self.bars, viewport, &mut self.vertices);
                    surface.set_vertices(&self.vertices)?;
                    stats.recomputed += 1;
                }
            }

            surface.present(elapsed)?;
            clock.advance();
            stats.presented += 1;
        }

        log::info!(
            "Playback finished: {} frames presented, {} bar updates, last frame {:?}",
            stats.presented,
            stats.recomputed,
            self.selector.last()
        );
        Ok(stats)
    }
}
