use crate::foundation::error::ReelResult;
use crate::protocol::message::ClipRequest;
use crate::render::frame::FrameRGBA;

/// Clip-resolution collaborator: turns a clip request into decoded frames at the requested rate.
pub trait ClipSource: Send {
    /// Resolve `request` into frames, trimmed to its `start`/`end` window.
    fn resolve(&mut self, request: &ClipRequest) -> ReelResult<Vec<FrameRGBA>>;
}

impl<F> ClipSource for F
where
    F: FnMut(&ClipRequest) -> ReelResult<Vec<FrameRGBA>> + Send,
{
    fn resolve(&mut self, request: &ClipRequest) -> ReelResult<Vec<FrameRGBA>> {
        self(request)
    }
}
