use crate::foundation::error::ReelResult;
use crate::session::context::SessionCtx;
use crate::session::render_session::DEFAULT_MAX_PIXELS;

/// Per-frame draw routine. Returns `true` once the chunk is finished; the frame drawn on that call
/// is not emitted.
pub type DrawStep = Box<dyn FnMut(&mut SessionCtx<'_>) -> ReelResult<bool>>;

/// One-time chunk setup that yields the draw routine.
pub type SetupStep = Box<dyn FnOnce(&mut SessionCtx<'_>) -> ReelResult<DrawStep>>;

/// Executable body of a chunk.
pub enum ChunkBody {
    /// Run setup first, then draw with the step it returns.
    Setup(SetupStep),
    /// Draw directly.
    Draw(DrawStep),
}

impl ChunkBody {
    /// Wrap a setup closure.
    pub fn setup<F>(f: F) -> Self
    where
        F: FnOnce(&mut SessionCtx<'_>) -> ReelResult<DrawStep> + 'static,
    {
        Self::Setup(Box::new(f))
    }

    /// Wrap a draw closure.
    pub fn draw<F>(f: F) -> Self
    where
        F: FnMut(&mut SessionCtx<'_>) -> ReelResult<bool> + 'static,
    {
        Self::Draw(Box::new(f))
    }
}

/// How a program splits its video into chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkLayout {
    /// One chunk; every request resolves to index 0.
    Single,
    /// A fixed list of `n` chunks; requests are clamped into `[0, n-1]`.
    Static(usize),
    /// Chunks are produced on demand; requests pass through and the count comes from the program.
    Dynamic,
}

/// A programmatically defined video.
///
/// The value is moved into the render unit's thread when a host binds it, so it must be `Send`.
/// Draw steps are created on that thread and do not need to be.
pub trait VideoSrc: Send + 'static {
    /// Chunking of this program.
    fn chunk_layout(&self) -> ChunkLayout {
        ChunkLayout::Single
    }

    /// Body of chunk `index`, or `None` when no draw step is defined.
    fn chunk(&mut self, index: usize) -> Option<ChunkBody>;

    /// Chunk count reported in [`ChunkLayout::Dynamic`] mode when the session did not set one.
    fn chunk_count(&self) -> Option<usize> {
        None
    }

    /// Pixel budget per chunk, counted as `frames * width * height`.
    fn max_pixels(&self) -> u64 {
        DEFAULT_MAX_PIXELS
    }

    /// Runs before the chunk body's setup.
    fn before_setup(&mut self, _ctx: &mut SessionCtx<'_>) -> ReelResult<()> {
        Ok(())
    }

    /// Runs after the draw step is known.
    fn after_setup(&mut self, _ctx: &mut SessionCtx<'_>) -> ReelResult<()> {
        Ok(())
    }

    /// Runs before every draw call.
    fn before_draw(&mut self, _ctx: &mut SessionCtx<'_>) -> ReelResult<()> {
        Ok(())
    }

    /// Runs after every draw call, including the final one.
    fn after_draw(&mut self, _ctx: &mut SessionCtx<'_>) -> ReelResult<()> {
        Ok(())
    }

    /// Runs once the draw step finished or the pixel budget ran out.
    fn after_render(&mut self, _ctx: &mut SessionCtx<'_>) -> ReelResult<()> {
        Ok(())
    }
}
