use std::time::{Duration, Instant};

use tracing::debug;

use crate::foundation::error::{ReelError, ReelResult};
use crate::protocol::message::{ChunkRequest, RenderInit, RenderOutput};
use crate::render::surface::Surface;
use crate::session::context::{HostLink, SessionCtx, SessionOpts};
use crate::session::source::{ChunkBody, ChunkLayout, VideoSrc};

/// Default per-chunk pixel budget (`frames * width * height`).
pub const DEFAULT_MAX_PIXELS: u64 = 1 << 32;

/// How a chunk execution ended.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkOutcome {
    /// The draw step finished or the pixel budget ran out.
    Completed(RenderOutput),
    /// An abort was observed; nothing is emitted.
    Aborted,
}

/// Resolve a requested chunk index against a layout.
///
/// Absent or negative requests resolve to 0; static layouts clamp to the last chunk.
pub fn resolve_chunk_index(layout: ChunkLayout, requested: Option<i64>) -> usize {
    let index = requested
        .and_then(|i| usize::try_from(i).ok())
        .unwrap_or(0);
    match layout {
        ChunkLayout::Single => 0,
        ChunkLayout::Static(n) => index.min(n.saturating_sub(1)),
        ChunkLayout::Dynamic => index,
    }
}

struct AbortCadence {
    interval: Duration,
    last: Instant,
}

impl AbortCadence {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    fn due(&mut self) -> bool {
        if self.interval.is_zero() || self.last.elapsed() >= self.interval {
            self.last = Instant::now();
            return true;
        }
        false
    }
}

/// Execute one chunk of `src` on `surface`.
///
/// Emits one frame per draw call that returns `false`. Aborts are observed every
/// `opts.abort_check_interval` and while waiting for clips.
#[tracing::instrument(skip_all, fields(chunk = ?request.chunk_index))]
pub fn run_chunk(
    src: &mut dyn VideoSrc,
    init: &RenderInit,
    request: ChunkRequest,
    surface: &mut dyn Surface,
    link: &mut dyn HostLink,
    opts: &SessionOpts,
) -> ReelResult<ChunkOutcome> {
    match run_chunk_inner(src, init, request, surface, link, opts) {
        Err(ReelError::Aborted) => {
            debug!("chunk aborted during clip wait");
            Ok(ChunkOutcome::Aborted)
        }
        other => other,
    }
}

fn run_chunk_inner(
    src: &mut dyn VideoSrc,
    init: &RenderInit,
    request: ChunkRequest,
    surface: &mut dyn Surface,
    link: &mut dyn HostLink,
    opts: &SessionOpts,
) -> ReelResult<ChunkOutcome> {
    let layout = src.chunk_layout();
    let chunk_index = resolve_chunk_index(layout, request.chunk_index);
    let max_pixels = src.max_pixels();
    let frame_pixels = init.canvas().pixels();

    surface.clear();
    let mut ctx = SessionCtx::new(init, chunk_index, surface, link, &opts.assets_root);

    src.before_setup(&mut ctx)?;
    let mut draw = match src.chunk(chunk_index) {
        Some(ChunkBody::Setup(setup)) => setup(&mut ctx)?,
        Some(ChunkBody::Draw(draw)) => draw,
        None => {
            return Err(ReelError::setup(format!(
                "no draw step defined for chunk {chunk_index}"
            )));
        }
    };
    src.after_setup(&mut ctx)?;

    let mut cadence = AbortCadence::new(opts.abort_check_interval);
    let mut frames = Vec::new();
    let mut max_pixels_exceeded = false;
    loop {
        let next = (frames.len() as u64 + 1).saturating_mul(frame_pixels);
        if next > max_pixels {
            debug!(frames = frames.len(), max_pixels, "pixel budget exceeded");
            max_pixels_exceeded = true;
            break;
        }
        if cadence.due() && ctx.poll_abort() {
            debug!(frames = frames.len(), "chunk aborted");
            return Ok(ChunkOutcome::Aborted);
        }

        src.before_draw(&mut ctx)?;
        let done = draw(&mut ctx)?;
        src.after_draw(&mut ctx)?;
        if done {
            break;
        }

        frames.push(ctx.take_surface_frame()?);
        ctx.advance_frame();
    }

    src.after_render(&mut ctx)?;
    let chunk_count = match layout {
        ChunkLayout::Single => 1,
        ChunkLayout::Static(n) => n,
        ChunkLayout::Dynamic => ctx
            .reported_chunk_count()
            .or_else(|| src.chunk_count())
            .unwrap_or(chunk_index + 1),
    };
    let audio_instructions = ctx.into_ledger().compile();
    debug!(frames = frames.len(), chunk_count, "chunk completed");

    Ok(ChunkOutcome::Completed(RenderOutput {
        frames,
        audio_instructions,
        max_pixels_exceeded,
        chunk_count,
        chunk_index,
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
