//! Messages exchanged between a [`crate::RenderHost`] and its render unit.
//!
//! Frames travel by ownership through `std::sync::mpsc` channels, so messages carrying raster data
//! are plain Rust values; the small control types also derive `serde` for logging and dumps.

use crate::audio::instruction::AudioInstructions;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::ErrorKind;
use crate::render::frame::FrameRGBA;

/// Session start parameters, immutable for the lifetime of a render unit.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderInit {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub frame_rate: Fps,
    /// Chunk rendered right after init, if any.
    #[serde(default)]
    pub initial_chunk: Option<i64>,
    /// Opaque data handed to the video program.
    #[serde(default)]
    pub host_data: serde_json::Value,
}

impl RenderInit {
    /// Canvas described by `width` and `height`, unchecked.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// Selects the next chunk to execute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChunkRequest {
    /// Requested chunk; absent or negative resolves to 0.
    pub chunk_index: Option<i64>,
}

/// Request for the decoded frames of a clip, matched to its response by full field equality.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipRequest {
    /// Source identifier (relative asset path for the ffmpeg source).
    pub source: String,
    /// Rate the frames must be delivered at.
    pub fps: Fps,
    /// Trim start in seconds.
    pub start: Option<f64>,
    /// Trim end in seconds.
    pub end: Option<f64>,
}

/// Resolved clip, echoing its request.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipResponse {
    /// The request being answered.
    pub request: ClipRequest,
    /// Decoded frames in display order.
    pub frames: Vec<FrameRGBA>,
}

/// Result of one completed chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOutput {
    /// One frame per non-terminal draw iteration.
    pub frames: Vec<FrameRGBA>,
    /// Compiled audio timeline of the chunk.
    pub audio_instructions: AudioInstructions,
    /// The chunk stopped early because the pixel budget ran out.
    pub max_pixels_exceeded: bool,
    /// Number of chunks the program reports.
    pub chunk_count: usize,
    /// Chunk index the request resolved to.
    pub chunk_index: usize,
}

/// Host to render unit.
#[derive(Clone, Debug)]
pub enum ToRender {
    /// Start the session.
    Init(RenderInit),
    /// Execute a chunk.
    Render(ChunkRequest),
    /// Cancel the running chunk.
    Abort,
    /// A clip request was resolved.
    ClipResponse(ClipResponse),
    /// A clip request could not be resolved.
    ClipFailed {
        /// The request that failed.
        request: ClipRequest,
        /// Failure description.
        message: String,
    },
}

/// Render unit to host.
#[derive(Clone, Debug)]
pub enum FromRender {
    /// A chunk completed.
    Output(RenderOutput),
    /// A chunk was aborted, or an idle abort is acknowledged.
    Aborted,
    /// The running chunk needs a clip.
    ClipRequest(ClipRequest),
    /// A chunk failed.
    Failed {
        /// Error category.
        kind: ErrorKind,
        /// Error message without its category prefix.
        message: String,
    },
}

impl FromRender {
    /// `true` for messages that end a chunk request or answer an abort.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::ClipRequest(_))
    }
}
