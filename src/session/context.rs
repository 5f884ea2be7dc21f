use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::audio::ledger::{SoundId, SoundLedger, SoundMut, SoundOptions};
use crate::foundation::core::{Affine, Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::media::source::ClipSource;
use crate::media::still::load_image;
use crate::protocol::message::{ClipRequest, RenderInit};
use crate::render::frame::FrameRGBA;
use crate::render::surface::Surface;
use crate::session::clip::{Clip, ClipId, ClipMut, ClipOptions};

/// Options for the render unit.
#[derive(Clone, Debug)]
pub struct SessionOpts {
    /// Wall-clock time between abort checks in the frame loop. `Duration::ZERO` checks every
    /// frame.
    pub abort_check_interval: Duration,
    /// Directory `load_image` resolves relative paths against.
    pub assets_root: PathBuf,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            abort_check_interval: Duration::from_millis(500),
            assets_root: PathBuf::from("."),
        }
    }
}

/// Connection from a running chunk back to whoever drives it.
pub trait HostLink {
    /// Return `true` when an abort is pending. Consumes the abort.
    fn poll_abort(&mut self) -> bool;

    /// Fetch a clip, blocking until it is resolved.
    ///
    /// Returns [`ReelError::Aborted`] when an abort arrives while waiting.
    fn fetch_clip(&mut self, request: ClipRequest) -> ReelResult<Vec<FrameRGBA>>;
}

/// Shareable abort switch for in-process sessions.
#[derive(Clone, Debug, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    /// Lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an abort.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether an abort is pending.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// [`HostLink`] for running a chunk on the current thread.
pub struct LocalLink<'a> {
    clips: Option<&'a mut dyn ClipSource>,
    abort: AbortFlag,
}

impl<'a> LocalLink<'a> {
    /// Link without a clip source; clip fetches fail with a resource error.
    pub fn new(abort: AbortFlag) -> Self {
        Self { clips: None, abort }
    }

    /// Link resolving clips through `clips`.
    pub fn with_clips(clips: &'a mut dyn ClipSource, abort: AbortFlag) -> Self {
        Self {
            clips: Some(clips),
            abort,
        }
    }
}

impl HostLink for LocalLink<'_> {
    fn poll_abort(&mut self) -> bool {
        self.abort.take()
    }

    fn fetch_clip(&mut self, request: ClipRequest) -> ReelResult<Vec<FrameRGBA>> {
        if self.abort.take() {
            return Err(ReelError::Aborted);
        }
        match self.clips.as_mut() {
            Some(src) => src.resolve(&request),
            None => Err(ReelError::resource(format!(
                "no clip source configured for '{}'",
                request.source
            ))),
        }
    }
}

/// Everything a video program can touch while a chunk runs.
///
/// Owns the chunk's sound ledger and clips; handles returned by [`SessionCtx::play_sound`] and
/// [`SessionCtx::get_clip`] are only valid within the chunk that created them.
pub struct SessionCtx<'a> {
    init: &'a RenderInit,
    chunk_index: usize,
    chunk_count: Option<usize>,
    frame: u64,
    surface: &'a mut dyn Surface,
    ledger: SoundLedger,
    clips: Vec<Clip>,
    link: &'a mut dyn HostLink,
    assets_root: &'a Path,
}

impl<'a> SessionCtx<'a> {
    pub(crate) fn new(
        init: &'a RenderInit,
        chunk_index: usize,
        surface: &'a mut dyn Surface,
        link: &'a mut dyn HostLink,
        assets_root: &'a Path,
    ) -> Self {
        Self {
            init,
            chunk_index,
            chunk_count: None,
            frame: 0,
            surface,
            ledger: SoundLedger::new(),
            clips: Vec::new(),
            link,
            assets_root,
        }
    }

    /// Canvas width.
    pub fn width(&self) -> u32 {
        self.init.width
    }

    /// Canvas height.
    pub fn height(&self) -> u32 {
        self.init.height
    }

    /// Canvas size.
    pub fn canvas(&self) -> Canvas {
        self.init.canvas()
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        self.init.frame_rate
    }

    /// Opaque host data from [`RenderInit`].
    pub fn host_data(&self) -> &serde_json::Value {
        &self.init.host_data
    }

    /// Index of the running chunk.
    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    /// Frames emitted so far in this chunk.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Session clock in seconds: `frame / fps`.
    pub fn current_time(&self) -> f64 {
        self.init.frame_rate.frames_to_secs(self.frame)
    }

    /// Drawing surface for the current frame.
    pub fn surface(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }

    /// Report the chunk count in [`crate::ChunkLayout::Dynamic`] mode.
    pub fn set_chunk_count(&mut self, count: usize) {
        self.chunk_count = Some(count);
    }

    pub(crate) fn reported_chunk_count(&self) -> Option<usize> {
        self.chunk_count
    }

    /// Start a sound at the current clock.
    pub fn play_sound(&mut self, source: impl Into<String>, opts: SoundOptions) -> SoundId {
        let clock = self.current_time();
        self.ledger.play(clock, source, opts)
    }

    /// Mutable view of a sound started in this chunk.
    pub fn sound(&mut self, id: SoundId) -> Option<SoundMut<'_>> {
        let clock = self.current_time();
        self.ledger.get_mut(id, clock)
    }

    /// Sounds started so far.
    pub fn sounds(&self) -> &SoundLedger {
        &self.ledger
    }

    /// Fetch a clip from the host at the session frame rate.
    ///
    /// Blocks until the host answers; a fetch failure fails the chunk.
    pub fn get_clip(&mut self, source: impl Into<String>, opts: ClipOptions) -> ReelResult<ClipId> {
        let source = source.into();
        tracing::debug!(source = %source, start = ?opts.start, end = ?opts.end, "fetching clip");
        let request = ClipRequest {
            source: source.clone(),
            fps: self.init.frame_rate,
            start: opts.start,
            end: opts.end,
        };
        let frames = self.link.fetch_clip(request)?;
        if frames.is_empty() {
            return Err(ReelError::resource(format!("clip '{source}' has no frames")));
        }
        self.clips.push(Clip::new(frames, source, &opts));
        Ok(ClipId(self.clips.len() - 1))
    }

    /// Mutable view of a clip fetched in this chunk.
    pub fn clip(&mut self, id: ClipId) -> Option<ClipMut<'_>> {
        let clock = self.current_time();
        let fps = self.init.frame_rate;
        let clip = self.clips.get_mut(id.0)?;
        Some(ClipMut::new(clip, &mut self.ledger, clock, fps))
    }

    /// Draw the clip's current frame onto the surface.
    pub fn draw_clip(&mut self, id: ClipId, transform: Affine) -> ReelResult<()> {
        let clip = self
            .clips
            .get(id.0)
            .ok_or_else(|| ReelError::validation("unknown clip id"))?;
        self.surface.draw_frame(clip.current_frame(), transform)
    }

    /// Decode an image under the assets root.
    pub fn load_image(&self, source: &str) -> ReelResult<FrameRGBA> {
        load_image(self.assets_root, source)
    }

    pub(crate) fn poll_abort(&mut self) -> bool {
        self.link.poll_abort()
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame += 1;
        let clock = self.current_time();
        let fps = self.init.frame_rate;
        for clip in self.clips.iter_mut().filter(|c| c.is_playing()) {
            ClipMut::new(clip, &mut self.ledger, clock, fps).advance();
        }
    }

    pub(crate) fn take_surface_frame(&mut self) -> ReelResult<FrameRGBA> {
        self.surface.transfer_frame()
    }

    pub(crate) fn into_ledger(self) -> SoundLedger {
        self.ledger
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/context.rs"]
mod tests;
