//! Reelcraft renders programmatically defined videos.
//!
//! A program implements [`VideoSrc`] and draws one frame per call onto a [`Surface`] through a
//! [`SessionCtx`]. Sounds and clips started while drawing are recorded into a compiled audio
//! timeline. The public API is organized around three pieces:
//!
//! - [`run_chunk`] runs one chunk of a program in the current thread.
//! - [`RenderHost`] owns a render unit thread, sends it chunk requests, services its clip
//!   requests, and reconciles aborts with late replies.
//! - [`RenderHost::generate_video`] paces rendered frames into a [`FrameSink`], muxing the mixed
//!   audio timeline when a decoder is available.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod audio;
mod encode;
mod foundation;
mod media;
mod protocol;
mod render;
mod session;

pub use crate::foundation::core::{
    Affine, BezPath, Canvas, Fps, Point, Rect, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{ErrorKind, ReelError, ReelResult};

pub use crate::render::frame::FrameRGBA;
pub use crate::render::surface::{CpuSurface, CpuSurfaceFactory, Surface, SurfaceFactory};

pub use crate::audio::envelope::ChangeMap;
pub use crate::audio::instruction::{AudioInstruction, AudioInstructions};
pub use crate::audio::ledger::{Sound, SoundId, SoundLedger, SoundMut, SoundOptions};
pub use crate::audio::mix::{
    AudioDecoder, AudioPcm, MIX_CHANNELS, MIX_SAMPLE_RATE, MixedAudio, mix_instructions,
};

pub use crate::media::ffmpeg::{
    FfmpegAudioDecoder, FfmpegClipSource, VideoSourceInfo, decode_audio_f32_stereo,
    decode_clip_frames, probe_video,
};
pub use crate::media::source::ClipSource;

pub use crate::session::clip::{Clip, ClipId, ClipMut, ClipOptions};
pub use crate::session::context::{AbortFlag, HostLink, LocalLink, SessionCtx, SessionOpts};
pub use crate::session::render_session::{
    ChunkOutcome, DEFAULT_MAX_PIXELS, resolve_chunk_index, run_chunk,
};
pub use crate::session::source::{ChunkBody, ChunkLayout, DrawStep, SetupStep, VideoSrc};

pub use crate::protocol::host::{HostEvent, HostOpts, HostState, RenderHost, RenderOpts};
pub use crate::protocol::message::{
    ChunkRequest, ClipRequest, ClipResponse, FromRender, RenderInit, RenderOutput, ToRender,
};

pub use crate::encode::ffmpeg::{FfmpegSink, ensure_parent_dir, is_ffmpeg_on_path};
pub use crate::encode::pacer::{PaceStats, Pacer, PacerEvent};
pub use crate::encode::sink::{CaptureSpec, FrameSink, InMemorySink};
