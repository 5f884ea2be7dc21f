use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::debug;

use crate::audio::mix::MixedAudio;
use crate::encode::sink::{CaptureSpec, FrameSink};
use crate::foundation::core::{Canvas, Rgba8Premul};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;

/// Capture that encodes painted frames to an H.264 MP4 through the system `ffmpeg`.
///
/// Frames are flattened over an opaque background and piped as raw RGBA. A soundtrack is laid
/// under the picture in a second pass that copies the encoded video and streams the mixed PCM
/// over stdin, so no audio file ever touches disk.
pub struct FfmpegSink {
    out_path: PathBuf,
    background: Rgba8Premul,
    capture: Option<Capture>,
}

struct Capture {
    canvas: Canvas,
    video: Encoder,
    soundtrack: Option<(Arc<MixedAudio>, Scratch)>,
    opaque: Vec<u8>,
}

impl FfmpegSink {
    /// Capture writing to `out_path` over a black background. An existing file is replaced.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            background: Rgba8Premul::opaque(0, 0, 0),
            capture: None,
        }
    }

    /// Color transparent pixels are flattened onto. Its alpha is ignored.
    pub fn with_background(mut self, background: Rgba8Premul) -> Self {
        self.background = background;
        self
    }

    /// Where the finished MP4 goes.
    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    fn silent_video_path(&self) -> PathBuf {
        let name = self
            .out_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture.mp4".to_owned());
        self.out_path
            .with_file_name(format!(".{name}.{}.silent.mp4", std::process::id()))
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, spec: &CaptureSpec) -> ReelResult<()> {
        let Canvas { width, height } = spec.canvas;
        if width == 0 || height == 0 {
            return Err(ReelError::validation("capture canvas must not be empty"));
        }
        if !width.is_multiple_of(2) || !height.is_multiple_of(2) {
            return Err(ReelError::validation(format!(
                "yuv420p output needs even sides, got {width}x{height}"
            )));
        }
        if let Some(track) = spec.soundtrack.as_deref()
            && (track.sample_rate == 0 || track.channels == 0)
        {
            return Err(ReelError::validation(
                "soundtrack needs a sample rate and at least one channel",
            ));
        }
        ensure_parent_dir(&self.out_path)?;
        if !is_ffmpeg_on_path() {
            return Err(ReelError::setup(
                "ffmpeg is required for MP4 output but was not found on PATH",
            ));
        }

        let soundtrack = spec
            .soundtrack
            .clone()
            .map(|track| (track, Scratch(self.silent_video_path())));
        let video_path = soundtrack
            .as_ref()
            .map_or(self.out_path.as_path(), |(_, scratch)| scratch.0.as_path());

        let mut cmd = ffmpeg();
        // `-r` before `-i` sets the rawvideo input rate.
        cmd.args(["-f", "rawvideo", "-pix_fmt", "rgba", "-s"])
            .arg(format!("{width}x{height}"))
            .arg("-r")
            .arg(spec.fps.to_string())
            .args(["-i", "pipe:0", "-an", "-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .args(["-movflags", "+faststart"])
            .arg(video_path);
        debug!(path = %video_path.display(), fps = %spec.fps, width, height, "starting video encode");
        let video = Encoder::spawn(cmd, "video encode")?;

        let bytes = usize::try_from(spec.canvas.pixels() * 4)
            .map_err(|_| ReelError::validation("capture canvas is too large"))?;
        self.capture = Some(Capture {
            canvas: spec.canvas,
            video,
            soundtrack,
            opaque: vec![0u8; bytes],
        });
        Ok(())
    }

    fn paint(&mut self, frame: &FrameRGBA) -> ReelResult<()> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| ReelError::render("ffmpeg capture is not open"))?;
        if frame.width != capture.canvas.width
            || frame.height != capture.canvas.height
            || frame.data.len() != capture.opaque.len()
        {
            return Err(ReelError::validation(format!(
                "painted {}x{} frame into a {}x{} capture",
                frame.width, frame.height, capture.canvas.width, capture.canvas.height
            )));
        }
        flatten_onto(&mut capture.opaque, frame, self.background);
        capture
            .video
            .stdin()?
            .write_all(&capture.opaque)
            .map_err(|e| ReelError::render(format!("failed to pipe frame to ffmpeg: {e}")))
    }

    fn finish(&mut self) -> ReelResult<()> {
        let capture = self
            .capture
            .take()
            .ok_or_else(|| ReelError::render("ffmpeg capture is not open"))?;
        capture.video.wait()?;

        let Some((track, scratch)) = capture.soundtrack else {
            return Ok(());
        };
        let mut cmd = ffmpeg();
        cmd.arg("-i")
            .arg(&scratch.0)
            .args(["-f", "f32le", "-ar"])
            .arg(track.sample_rate.to_string())
            .arg("-ac")
            .arg(track.channels.to_string())
            .args(["-i", "pipe:0", "-map", "0:v:0", "-map", "1:a:0"])
            .args(["-c:v", "copy", "-c:a", "aac", "-shortest"])
            .args(["-movflags", "+faststart"])
            .arg(&self.out_path);
        debug!(
            path = %self.out_path.display(),
            secs = track.duration_secs(),
            "muxing soundtrack"
        );
        let mut mux = Encoder::spawn(cmd, "soundtrack mux")?;
        match track.write_f32le(mux.stdin()?) {
            // `-shortest` may stop reading once the picture ends.
            Err(e) if e.kind() != ErrorKind::BrokenPipe => {
                return Err(ReelError::render(format!(
                    "failed to stream soundtrack to ffmpeg: {e}"
                )));
            }
            _ => {}
        }
        mux.wait()
    }
}

/// One running `ffmpeg` fed through stdin, with stderr drained on the side.
struct Encoder {
    what: &'static str,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl Encoder {
    fn spawn(mut cmd: Command, what: &'static str) -> ReelResult<Self> {
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReelError::setup(format!("failed to spawn ffmpeg for {what}: {e}")))?;
        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                pipe.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
        });
        Ok(Self {
            what,
            child,
            stdin,
            stderr,
        })
    }

    fn stdin(&mut self) -> ReelResult<&mut ChildStdin> {
        let what = self.what;
        self.stdin
            .as_mut()
            .ok_or_else(|| ReelError::render(format!("ffmpeg {what} has no stdin")))
    }

    fn wait(mut self) -> ReelResult<()> {
        drop(self.stdin.take());
        let status = self.child.wait().map_err(|e| {
            ReelError::render(format!("failed to wait for ffmpeg {}: {e}", self.what))
        })?;
        let stderr = match self.stderr.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_owned(),
            _ => String::new(),
        };
        if !status.success() {
            return Err(ReelError::render(format!(
                "ffmpeg {} exited with {status}: {stderr}",
                self.what
            )));
        }
        Ok(())
    }
}

/// Removes a scratch file once the capture is done with it.
struct Scratch(PathBuf);

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn ffmpeg() -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-loglevel", "error"]);
    cmd
}

/// Composite `frame` over an opaque `background` into `dst`, honoring the frame's alpha mode.
fn flatten_onto(dst: &mut [u8], frame: &FrameRGBA, background: Rgba8Premul) {
    let bg = [background.r, background.g, background.b].map(u16::from);
    for (d, s) in dst.chunks_exact_mut(4).zip(frame.data.chunks_exact(4)) {
        let a = u16::from(s[3]);
        let inv = 255 - a;
        for c in 0..3 {
            let fg = if frame.premultiplied {
                u16::from(s[c])
            } else {
                mul_div255_u16(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
