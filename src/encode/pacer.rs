use std::sync::mpsc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::encode::sink::{CaptureSpec, FrameSink};
use crate::foundation::error::ReelResult;
use crate::render::frame::FrameRGBA;

/// Notifications emitted while pacing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacerEvent {
    /// Painting lagged more than one interval behind schedule. Sent at most once per run.
    FallingBehind,
    /// Every frame was painted.
    Done,
}

/// Summary of one pacing run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaceStats {
    /// Frames pushed to the sink.
    pub frames_painted: u64,
    /// Whether the run fell behind schedule.
    pub fell_behind: bool,
}

/// Drains frames into a sink at a fixed interval, independent of how fast they were produced.
///
/// Deadlines accumulate from the start of the run (`start + i * interval`), so a slow frame does
/// not shift the schedule of the ones after it.
#[derive(Clone, Copy, Debug)]
pub struct Pacer {
    interval: Duration,
}

impl Pacer {
    /// Pacer painting one frame every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Paint `frames` into `sink` in order, bracketed by `begin`/`finish`.
    #[tracing::instrument(skip_all, fields(frames = frames.len()))]
    pub fn run(
        &self,
        frames: &[FrameRGBA],
        spec: &CaptureSpec,
        sink: &mut dyn FrameSink,
        events: &mpsc::Sender<PacerEvent>,
    ) -> ReelResult<PaceStats> {
        sink.begin(spec)?;

        let mut stats = PaceStats::default();
        let start = Instant::now();
        for (i, frame) in frames.iter().enumerate() {
            let deadline = start + self.deadline_offset(i);
            let now = Instant::now();
            if now < deadline {
                std::thread::sleep(deadline - now);
            } else if now - deadline > self.interval && !stats.fell_behind {
                stats.fell_behind = true;
                warn!(
                    frame = i,
                    lag_ms = (now - deadline).as_millis() as u64,
                    "pacer is falling behind"
                );
                let _ = events.send(PacerEvent::FallingBehind);
            }
            sink.paint(frame)?;
            stats.frames_painted += 1;
        }

        sink.finish()?;
        let _ = events.send(PacerEvent::Done);
        Ok(stats)
    }

    fn deadline_offset(&self, painted: usize) -> Duration {
        self.interval
            .saturating_mul(u32::try_from(painted).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/pacer.rs"]
mod tests;
