use crate::audio::ledger::{SoundId, SoundLedger, SoundOptions};
use crate::foundation::core::Fps;
use crate::render::frame::FrameRGBA;

/// Handle to a clip fetched in the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClipId(pub(crate) usize);

/// Options for `SessionCtx::get_clip`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipOptions {
    /// Trim start in source seconds.
    pub start: Option<f64>,
    /// Trim end in source seconds.
    pub end: Option<f64>,
    /// Offset of the clip's frames from its audio, in seconds.
    pub offset: f64,
    /// Initial volume.
    pub volume: f64,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            offset: 0.0,
            volume: 1.0,
        }
    }
}

/// A decoded frame sequence whose playback follows the session clock.
#[derive(Debug)]
pub struct Clip {
    frames: Vec<FrameRGBA>,
    source: String,
    offset: f64,
    volume: f64,
    frame: usize,
    sound: Option<SoundId>,
}

impl Clip {
    pub(crate) fn new(frames: Vec<FrameRGBA>, source: String, opts: &ClipOptions) -> Self {
        Self {
            frames,
            source,
            offset: opts.start.unwrap_or(0.0) + opts.offset,
            volume: opts.volume.max(0.0),
            frame: 0,
            sound: None,
        }
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.sound.is_some()
    }

    pub(crate) fn current_frame(&self) -> &FrameRGBA {
        &self.frames[self.frame]
    }

    fn last_frame(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }
}

/// Mutable view of a clip, borrowing the session clock and sound ledger.
pub struct ClipMut<'a> {
    clip: &'a mut Clip,
    ledger: &'a mut SoundLedger,
    clock: f64,
    fps: Fps,
}

impl<'a> ClipMut<'a> {
    pub(crate) fn new(clip: &'a mut Clip, ledger: &'a mut SoundLedger, clock: f64, fps: Fps) -> Self {
        Self {
            clip,
            ledger,
            clock,
            fps,
        }
    }

    /// Start playback with audio aligned to the current frame. No-op while playing.
    pub fn play(&mut self) {
        if self.clip.is_playing() {
            return;
        }
        let offset = self.clip.offset + self.fps.frames_to_secs(self.clip.frame as u64);
        let id = self.ledger.play(
            self.clock,
            self.clip.source.clone(),
            SoundOptions {
                offset,
                volume: self.clip.volume,
                ..SoundOptions::default()
            },
        );
        self.clip.sound = Some(id);
    }

    /// Stop playback and its sound. No-op while paused.
    pub fn pause(&mut self) {
        if let Some(id) = self.clip.sound.take()
            && let Some(mut sound) = self.ledger.get_mut(id, self.clock)
        {
            sound.stop();
        }
    }

    /// Whether the clip advances with the session.
    pub fn is_playing(&self) -> bool {
        self.clip.is_playing()
    }

    /// Current frame index.
    pub fn frame(&self) -> usize {
        self.clip.frame
    }

    /// Pause, then seek to `frame` clamped into the clip.
    pub fn set_frame(&mut self, frame: usize) {
        self.pause();
        self.clip.frame = frame.min(self.clip.last_frame());
    }

    /// Position in seconds at the session frame rate.
    pub fn current_time(&self) -> f64 {
        self.fps.frames_to_secs(self.clip.frame as u64)
    }

    /// Pause, then seek to `secs`.
    pub fn set_current_time(&mut self, secs: f64) {
        let frame = self.fps.secs_to_frames_floor(secs);
        self.set_frame(usize::try_from(frame).unwrap_or(usize::MAX));
    }

    /// Frame to draw now.
    pub fn current_frame(&self) -> &FrameRGBA {
        self.clip.current_frame()
    }

    /// Frame width.
    pub fn width(&self) -> u32 {
        self.clip.frames[0].width
    }

    /// Frame height.
    pub fn height(&self) -> u32 {
        self.clip.frames[0].height
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.clip.frames.len()
    }

    /// Source id the clip was fetched from.
    pub fn source(&self) -> &str {
        &self.clip.source
    }

    /// Volume used for the clip's sound.
    pub fn volume(&self) -> f64 {
        self.clip.volume
    }

    /// Set the volume; a playing sound changes from the current clock on, a paused clip keeps the
    /// value for its next sound.
    pub fn set_volume(&mut self, volume: f64) {
        let volume = volume.max(0.0);
        self.clip.volume = volume;
        if let Some(id) = self.clip.sound
            && let Some(mut sound) = self.ledger.get_mut(id, self.clock)
        {
            sound.set_volume(volume);
        }
    }

    /// One session tick: step forward, pausing on the last frame.
    pub(crate) fn advance(&mut self) {
        let last = self.clip.last_frame();
        self.clip.frame = (self.clip.frame + 1).min(last);
        if self.clip.frame >= last {
            self.pause();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/clip.rs"]
mod tests;
