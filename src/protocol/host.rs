use std::sync::{Arc, mpsc};

use tracing::{debug, warn};

use crate::audio::instruction::AudioInstructions;
use crate::audio::mix::{AudioDecoder, MixedAudio, mix_instructions};
use crate::encode::pacer::{PaceStats, Pacer, PacerEvent};
use crate::encode::sink::{CaptureSpec, FrameSink};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::media::source::ClipSource;
use crate::protocol::message::{
    ChunkRequest, ClipRequest, ClipResponse, FromRender, RenderInit, RenderOutput, ToRender,
};
use crate::protocol::worker::RenderWorker;
use crate::render::frame::FrameRGBA;
use crate::render::surface::{CpuSurfaceFactory, SurfaceFactory};
use crate::session::context::SessionOpts;
use crate::session::source::VideoSrc;

/// Options for a [`RenderHost`].
#[derive(Clone, Debug)]
pub struct HostOpts {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub frame_rate: Fps,
    /// Chunk rendered as soon as a program is bound.
    pub initial_chunk: Option<i64>,
    /// Opaque data passed to the program.
    pub host_data: serde_json::Value,
    /// Render unit options.
    pub session: SessionOpts,
}

impl Default for HostOpts {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: Fps::default(),
            initial_chunk: None,
            host_data: serde_json::Value::Null,
            session: SessionOpts::default(),
        }
    }
}

impl HostOpts {
    pub(crate) fn render_init(&self) -> RenderInit {
        RenderInit {
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
            initial_chunk: self.initial_chunk,
            host_data: self.host_data.clone(),
        }
    }
}

/// Options for one render request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOpts {
    /// Chunk to render; `None` repeats the previously rendered chunk (or chunk 0).
    pub chunk_index: Option<i64>,
}

/// Host render state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostState {
    /// No output and nothing in flight.
    Waiting,
    /// A chunk request is in flight.
    Rendering,
    /// Output of the last request is available.
    Rendered,
}

/// Notifications delivered to [`RenderHost::subscribe`] receivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// A chunk request was sent.
    Rendering {
        /// Requested chunk.
        chunk: i64,
    },
    /// A chunk request resolved with output.
    Rendered {
        /// Resolved chunk index.
        chunk: usize,
        /// The chunk stopped on its pixel budget.
        max_pixels_exceeded: bool,
    },
    /// Output was cleared.
    Reset {
        /// The render unit was discarded too.
        full: bool,
    },
    /// Video generation cannot keep up with the frame rate.
    SlowPacing,
    /// Video generation started.
    Generating {
        /// Frames are moved out of the host.
        consuming: bool,
    },
    /// Video generation finished.
    Generated {
        /// Frames painted.
        frames: u64,
    },
}

/// Host side of a render session: owns the render unit and reconciles abort races.
///
/// Every abort the host sends is answered by exactly one terminal message from the render unit.
/// `pending_aborts` counts unanswered aborts; terminal messages arriving while it is non-zero are
/// discarded, so N resets in a row suppress exactly N messages.
pub struct RenderHost {
    opts: HostOpts,
    surfaces: Arc<dyn SurfaceFactory>,
    clips: Option<Box<dyn ClipSource>>,
    worker: Option<RenderWorker>,
    unbound: Option<Box<dyn VideoSrc>>,
    state: HostState,
    pending_aborts: u32,
    last_chunk: Option<usize>,
    chunk_count: Option<usize>,
    output: Option<RenderOutput>,
    listeners: Vec<mpsc::Sender<HostEvent>>,
}

impl RenderHost {
    /// Host rendering on the CPU surface with no clip source.
    pub fn new(opts: HostOpts) -> Self {
        Self {
            opts,
            surfaces: Arc::new(CpuSurfaceFactory),
            clips: None,
            worker: None,
            unbound: None,
            state: HostState::Waiting,
            pending_aborts: 0,
            last_chunk: None,
            chunk_count: None,
            output: None,
            listeners: Vec::new(),
        }
    }

    /// Use `surfaces` for render units spawned from now on.
    pub fn with_surface_factory(mut self, surfaces: Arc<dyn SurfaceFactory>) -> Self {
        self.surfaces = surfaces;
        self
    }

    /// Resolve clip requests through `clips`.
    pub fn with_clip_source(mut self, clips: Box<dyn ClipSource>) -> Self {
        self.clips = Some(clips);
        self
    }

    /// Replace the clip source.
    pub fn set_clip_source(&mut self, clips: Option<Box<dyn ClipSource>>) {
        self.clips = clips;
    }

    /// Bind a video program, replacing any bound one, and start its render unit.
    #[tracing::instrument(skip_all)]
    pub fn bind<S: VideoSrc>(&mut self, src: S) -> ReelResult<()> {
        self.reset(true);
        self.unbound = None;
        self.last_chunk = None;
        self.chunk_count = None;
        self.spawn_worker(Box::new(src), self.opts.initial_chunk)
    }

    fn spawn_worker(
        &mut self,
        src: Box<dyn VideoSrc>,
        initial_chunk: Option<i64>,
    ) -> ReelResult<()> {
        self.canvas()?;
        let worker =
            RenderWorker::spawn(src, Arc::clone(&self.surfaces), self.opts.session.clone())?;
        let mut init = self.opts.render_init();
        init.initial_chunk = initial_chunk;
        worker.send(ToRender::Init(init))?;
        self.worker = Some(worker);
        self.pending_aborts = 0;
        if let Some(chunk) = initial_chunk {
            self.state = HostState::Rendering;
            self.emit(HostEvent::Rendering { chunk });
        }
        Ok(())
    }

    /// Send a chunk request without waiting for it. A render in flight is reset first.
    #[tracing::instrument(skip(self))]
    pub fn start_render(&mut self, opts: RenderOpts) -> ReelResult<()> {
        if self.state == HostState::Rendering {
            self.reset(false);
        }
        if self.worker.is_none() {
            let src = self
                .unbound
                .take()
                .ok_or_else(|| ReelError::validation("no video program bound"))?;
            self.spawn_worker(src, None)?;
        }
        let chunk = opts
            .chunk_index
            .or_else(|| self.last_chunk.and_then(|c| i64::try_from(c).ok()))
            .unwrap_or(0);
        self.worker()?.send(ToRender::Render(ChunkRequest {
            chunk_index: Some(chunk),
        }))?;
        self.state = HostState::Rendering;
        self.emit(HostEvent::Rendering { chunk });
        Ok(())
    }

    /// Pump messages until the in-flight render resolves.
    ///
    /// Returns `Ok(None)` when the render was reset, `Ok(Some(max_pixels_exceeded))` on output,
    /// and the render unit's error on failure. If the render unit dies mid-chunk it is discarded
    /// along with the program it was running, leaving the host unbound.
    pub fn wait(&mut self) -> ReelResult<Option<bool>> {
        match self.state {
            HostState::Waiting => return Ok(None),
            HostState::Rendered => {
                return Ok(self.output.as_ref().map(|o| o.max_pixels_exceeded));
            }
            HostState::Rendering => {}
        }

        loop {
            let msg = match self.worker()?.recv() {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(error = %e, "render unit went away mid-chunk");
                    self.unbound = self.worker.take().and_then(RenderWorker::shutdown);
                    self.pending_aborts = 0;
                    self.output = None;
                    self.state = HostState::Waiting;
                    return Err(e);
                }
            };
            if let FromRender::ClipRequest(request) = msg {
                self.service_clip(request)?;
                continue;
            }
            if self.pending_aborts > 0 {
                self.pending_aborts -= 1;
                debug!(remaining = self.pending_aborts, "discarding message answered by abort");
                continue;
            }
            match msg {
                FromRender::Output(output) => {
                    let flag = output.max_pixels_exceeded;
                    self.last_chunk = Some(output.chunk_index);
                    self.chunk_count = Some(output.chunk_count);
                    self.state = HostState::Rendered;
                    self.emit(HostEvent::Rendered {
                        chunk: output.chunk_index,
                        max_pixels_exceeded: flag,
                    });
                    self.output = Some(output);
                    return Ok(Some(flag));
                }
                FromRender::Aborted => {
                    self.state = HostState::Waiting;
                    return Ok(None);
                }
                FromRender::Failed { kind, message } => {
                    self.state = HostState::Waiting;
                    return Err(ReelError::from_parts(kind, message));
                }
                FromRender::ClipRequest(_) => {}
            }
        }
    }

    /// Render a chunk and wait for it. `Ok(None)` means it was aborted.
    pub fn render(&mut self, opts: RenderOpts) -> ReelResult<Option<bool>> {
        self.start_render(opts)?;
        self.wait()
    }

    /// Cancel any in-flight chunk and clear output. `full` also discards the render unit; the
    /// bound program is kept and gets a fresh unit on the next render.
    #[tracing::instrument(skip(self))]
    pub fn reset(&mut self, full: bool) {
        let in_flight = self.state == HostState::Rendering || self.pending_aborts > 0;
        if let Some(worker) = self.worker.as_ref() {
            if in_flight && worker.send(ToRender::Abort).is_ok() {
                self.pending_aborts += 1;
                debug!(pending = self.pending_aborts, "abort sent");
            }
        }
        self.output = None;
        self.state = HostState::Waiting;
        if full {
            if let Some(worker) = self.worker.take() {
                self.unbound = worker.shutdown();
            }
            self.pending_aborts = 0;
        }
        self.emit(HostEvent::Reset { full });
    }

    /// Current state.
    pub fn state(&self) -> HostState {
        self.state
    }

    /// Aborts sent whose answer has not arrived yet.
    pub fn pending_aborts(&self) -> u32 {
        self.pending_aborts
    }

    /// Frames of the last resolved render, `None` until one resolves.
    pub fn frames(&self) -> Option<&[FrameRGBA]> {
        self.output.as_ref().map(|o| o.frames.as_slice())
    }

    /// Audio timeline of the last resolved render.
    pub fn audio_instructions(&self) -> Option<&AudioInstructions> {
        self.output.as_ref().map(|o| &o.audio_instructions)
    }

    /// Full output of the last resolved render.
    pub fn output(&self) -> Option<&RenderOutput> {
        self.output.as_ref()
    }

    /// Chunk count last reported by the program.
    pub fn chunk_count(&self) -> Option<usize> {
        self.chunk_count
    }

    /// Index of the last rendered chunk.
    pub fn last_chunk(&self) -> Option<usize> {
        self.last_chunk
    }

    /// Receive host events from now on.
    pub fn subscribe(&mut self) -> mpsc::Receiver<HostEvent> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    /// Mix the current output's audio timeline over the length of its frames.
    pub fn mix_audio(&self, decoder: &dyn AudioDecoder) -> ReelResult<MixedAudio> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| ReelError::validation("no rendered output to mix"))?;
        let total_secs = self.opts.frame_rate.frames_to_secs(output.frames.len() as u64);
        mix_instructions(&output.audio_instructions, decoder, total_secs)
    }

    /// Pace the current output into `sink`, muxing mixed audio when a decoder is given.
    ///
    /// With `consume` the frames are moved out and the host returns to [`HostState::Waiting`].
    #[tracing::instrument(skip(self, sink, decoder))]
    pub fn generate_video(
        &mut self,
        sink: &mut dyn FrameSink,
        decoder: Option<&dyn AudioDecoder>,
        consume: bool,
    ) -> ReelResult<PaceStats> {
        if self.state != HostState::Rendered || self.output.is_none() {
            return Err(ReelError::validation("no rendered output to generate from"));
        }
        let canvas = self.canvas()?;
        self.emit(HostEvent::Generating { consuming: consume });

        let soundtrack = match (decoder, self.audio_instructions()) {
            (Some(decoder), Some(instructions)) if !instructions.is_empty() => {
                Some(Arc::new(self.mix_audio(decoder)?))
            }
            _ => None,
        };

        let frames = if consume {
            self.state = HostState::Waiting;
            self.output.take().map(|o| o.frames).unwrap_or_default()
        } else {
            self.output
                .as_ref()
                .map(|o| o.frames.clone())
                .unwrap_or_default()
        };
        let spec = CaptureSpec {
            canvas,
            fps: self.opts.frame_rate,
            soundtrack,
        };
        let pacer = Pacer::new(self.opts.frame_rate.frame_interval());

        let stats = std::thread::scope(|scope| -> ReelResult<PaceStats> {
            let (tx, rx) = mpsc::channel::<PacerEvent>();
            let frames = &frames;
            let spec = &spec;
            let paint = scope.spawn(move || pacer.run(frames, spec, sink, &tx));
            for event in rx {
                if event == PacerEvent::FallingBehind {
                    self.emit(HostEvent::SlowPacing);
                }
            }
            paint
                .join()
                .map_err(|_| ReelError::render("pacer thread panicked"))?
        })?;

        self.emit(HostEvent::Generated {
            frames: stats.frames_painted,
        });
        Ok(stats)
    }

    fn canvas(&self) -> ReelResult<Canvas> {
        Canvas::new(self.opts.width, self.opts.height)
    }

    fn worker(&self) -> ReelResult<&RenderWorker> {
        self.worker
            .as_ref()
            .ok_or_else(|| ReelError::validation("no video program bound"))
    }

    fn service_clip(&mut self, request: ClipRequest) -> ReelResult<()> {
        debug!(source = %request.source, "servicing clip request");
        let reply = match self.clips.as_mut() {
            Some(clips) => match clips.resolve(&request) {
                Ok(frames) => ToRender::ClipResponse(ClipResponse { request, frames }),
                Err(e) => ToRender::ClipFailed {
                    request,
                    message: e.message(),
                },
            },
            None => {
                let message = format!("no clip source configured for '{}'", request.source);
                ToRender::ClipFailed { request, message }
            }
        };
        self.worker()?.send(reply)
    }

    fn emit(&mut self, event: HostEvent) {
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/host.rs"]
mod tests;
