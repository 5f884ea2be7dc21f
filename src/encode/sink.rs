use std::sync::Arc;

use crate::audio::mix::MixedAudio;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::frame::FrameRGBA;

/// What a capture is told before its first frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureSpec {
    /// Size every painted frame has.
    pub canvas: Canvas,
    /// Rate the frames are painted at.
    pub fps: Fps,
    /// Mixed soundtrack to lay under the frames.
    pub soundtrack: Option<Arc<MixedAudio>>,
}

impl CaptureSpec {
    /// Fail unless `frame` has the capture's size.
    pub fn check_frame(&self, frame: &FrameRGBA) -> ReelResult<()> {
        if frame.width != self.canvas.width || frame.height != self.canvas.height {
            return Err(ReelError::validation(format!(
                "painted {}x{} frame into a {}x{} capture",
                frame.width, frame.height, self.canvas.width, self.canvas.height
            )));
        }
        Ok(())
    }
}

/// Capture surface the pacer paints into, one frame per interval.
pub trait FrameSink: Send {
    /// Open the capture.
    fn begin(&mut self, spec: &CaptureSpec) -> ReelResult<()>;
    /// Append the next frame.
    fn paint(&mut self, frame: &FrameRGBA) -> ReelResult<()>;
    /// Close the capture after the last frame.
    fn finish(&mut self) -> ReelResult<()>;
}

/// Capture that keeps painted frames in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    spec: Option<CaptureSpec>,
    frames: Vec<FrameRGBA>,
    finished: bool,
}

impl InMemorySink {
    /// Empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec of the last `begin`.
    pub fn spec(&self) -> Option<&CaptureSpec> {
        self.spec.as_ref()
    }

    /// Frames in paint order.
    pub fn frames(&self) -> &[FrameRGBA] {
        &self.frames
    }

    /// Whether the last capture was finished.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, spec: &CaptureSpec) -> ReelResult<()> {
        self.spec = Some(spec.clone());
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn paint(&mut self, frame: &FrameRGBA) -> ReelResult<()> {
        let spec = self
            .spec
            .as_ref()
            .filter(|_| !self.finished)
            .ok_or_else(|| ReelError::render("capture is not open"))?;
        spec.check_frame(frame)?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> ReelResult<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
