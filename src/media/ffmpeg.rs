use std::path::{Path, PathBuf};
#[cfg(feature = "media-ffmpeg")]
use std::sync::Arc;

use crate::audio::mix::{AudioDecoder, AudioPcm, MIX_SAMPLE_RATE};
use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};
use crate::media::path::resolve_asset_path;
use crate::media::source::ClipSource;
use crate::protocol::message::ClipRequest;
use crate::render::frame::FrameRGBA;

/// Probed properties of a video file.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Absolute or root-joined path that was probed.
    pub source_path: PathBuf,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Container duration in seconds, 0 when unknown.
    pub duration_sec: f64,
    /// Whether the container has an audio stream.
    pub has_audio: bool,
}

/// Resolves clip requests by decoding files under `assets_root` with `ffmpeg`.
#[derive(Clone, Debug)]
pub struct FfmpegClipSource {
    assets_root: PathBuf,
}

impl FfmpegClipSource {
    /// Resolve sources relative to `assets_root`.
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
        }
    }
}

impl ClipSource for FfmpegClipSource {
    fn resolve(&mut self, request: &ClipRequest) -> ReelResult<Vec<FrameRGBA>> {
        let path = resolve_asset_path(&self.assets_root, &request.source)?;
        let info = probe_video(&path)?;
        decode_clip_frames(&info, request.fps, request.start, request.end)
    }
}

/// Decodes audio sources under `assets_root` to 48 kHz stereo with `ffmpeg`.
#[derive(Clone, Debug)]
pub struct FfmpegAudioDecoder {
    assets_root: PathBuf,
}

impl FfmpegAudioDecoder {
    /// Resolve sources relative to `assets_root`.
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
        }
    }
}

impl AudioDecoder for FfmpegAudioDecoder {
    fn decode(&self, source: &str) -> ReelResult<AudioPcm> {
        let path = resolve_asset_path(&self.assets_root, source)?;
        decode_audio_f32_stereo(&path, MIX_SAMPLE_RATE)
    }
}

/// Probe a video file with `ffprobe`.
#[cfg(feature = "media-ffmpeg")]
pub fn probe_video(source_path: &Path) -> ReelResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| ReelError::resource(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::resource(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::resource(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelError::resource("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| ReelError::resource("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| ReelError::resource("missing video height from ffprobe"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        duration_sec,
        has_audio,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Probe a video file with `ffprobe`.
pub fn probe_video(_source_path: &Path) -> ReelResult<VideoSourceInfo> {
    Err(missing_feature())
}

/// Decode `[start, end)` of a video resampled to `fps`.
#[cfg(feature = "media-ffmpeg")]
pub fn decode_clip_frames(
    source: &VideoSourceInfo,
    fps: Fps,
    start: Option<f64>,
    end: Option<f64>,
) -> ReelResult<Vec<FrameRGBA>> {
    let start_sec = start.unwrap_or(0.0).max(0.0);
    let mut cmd = std::process::Command::new("ffmpeg");
    cmd.args(["-v", "error", "-ss", &format!("{start_sec:.9}")])
        .arg("-i")
        .arg(&source.source_path);
    if let Some(end_sec) = end {
        let len = (end_sec - start_sec).max(0.0);
        cmd.args(["-t", &format!("{len:.9}")]);
    }
    let out = cmd
        .args([
            "-vf",
            &format!("fps={fps}"),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::resource(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(ReelError::resource(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    split_raw_frames(&out.stdout, source.width, source.height)
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Decode `[start, end)` of a video resampled to `fps`.
pub fn decode_clip_frames(
    _source: &VideoSourceInfo,
    _fps: Fps,
    _start: Option<f64>,
    _end: Option<f64>,
) -> ReelResult<Vec<FrameRGBA>> {
    Err(missing_feature())
}

/// Decode a file's audio track into interleaved stereo `f32` at `sample_rate`.
///
/// Files without an audio stream decode to empty PCM.
#[cfg(feature = "media-ffmpeg")]
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> ReelResult<AudioPcm> {
    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ReelError::resource(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("Output file #0 does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: 2,
                interleaved: Arc::new(Vec::new()),
            });
        }
        return Err(ReelError::resource(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved: Arc::new(f32le_to_samples(&out.stdout)?),
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
/// Decode a file's audio track into interleaved stereo `f32` at `sample_rate`.
pub fn decode_audio_f32_stereo(_path: &Path, _sample_rate: u32) -> ReelResult<AudioPcm> {
    Err(missing_feature())
}

#[cfg(not(feature = "media-ffmpeg"))]
fn missing_feature() -> ReelError {
    ReelError::resource("clip and audio decoding require the 'media-ffmpeg' feature")
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn split_raw_frames(bytes: &[u8], width: u32, height: u32) -> ReelResult<Vec<FrameRGBA>> {
    let frame_len = width as usize * height as usize * 4;
    if frame_len == 0 {
        return Err(ReelError::resource(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }
    if !bytes.len().is_multiple_of(frame_len) {
        return Err(ReelError::resource(format!(
            "decoded video has invalid size: got {} bytes, expected multiples of {frame_len}",
            bytes.len()
        )));
    }
    bytes
        .chunks_exact(frame_len)
        .map(|px| FrameRGBA::new(width, height, px.to_vec(), false))
        .collect()
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn f32le_to_samples(bytes: &[u8]) -> ReelResult<Vec<f32>> {
    if !bytes.len().is_multiple_of(4) {
        return Err(ReelError::resource(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
