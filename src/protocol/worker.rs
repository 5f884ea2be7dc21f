use std::collections::VecDeque;
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::foundation::error::{ErrorKind, ReelError, ReelResult};
use crate::protocol::clip_table::ClipTable;
use crate::protocol::message::{ChunkRequest, ClipRequest, FromRender, RenderInit, ToRender};
use crate::render::frame::FrameRGBA;
use crate::render::surface::{Surface, SurfaceFactory};
use crate::session::context::{HostLink, SessionOpts};
use crate::session::render_session::{ChunkOutcome, run_chunk};
use crate::session::source::VideoSrc;

/// Host-side handle to a render unit thread.
pub(crate) struct RenderWorker {
    tx: Option<mpsc::Sender<ToRender>>,
    rx: mpsc::Receiver<FromRender>,
    handle: Option<JoinHandle<Box<dyn VideoSrc>>>,
}

impl RenderWorker {
    pub(crate) fn spawn(
        src: Box<dyn VideoSrc>,
        surfaces: Arc<dyn SurfaceFactory>,
        opts: SessionOpts,
    ) -> ReelResult<Self> {
        let (to_tx, to_rx) = mpsc::channel::<ToRender>();
        let (from_tx, from_rx) = mpsc::channel::<FromRender>();
        let handle = std::thread::Builder::new()
            .name("reelcraft-render".to_owned())
            .spawn(move || {
                let mut unit = RenderUnit {
                    src,
                    surfaces,
                    opts,
                    rx: to_rx,
                    tx: from_tx,
                    backlog: VecDeque::new(),
                    session: None,
                    unanswered_terminal: false,
                };
                unit.run();
                unit.src
            })
            .map_err(|e| ReelError::render(format!("failed to spawn render unit: {e}")))?;
        Ok(Self {
            tx: Some(to_tx),
            rx: from_rx,
            handle: Some(handle),
        })
    }

    pub(crate) fn send(&self, msg: ToRender) -> ReelResult<()> {
        self.tx
            .as_ref()
            .ok_or_else(|| ReelError::protocol("render unit is shut down"))?
            .send(msg)
            .map_err(|_| ReelError::protocol("render unit disconnected"))
    }

    pub(crate) fn recv(&self) -> ReelResult<FromRender> {
        self.rx
            .recv()
            .map_err(|_| ReelError::protocol("render unit disconnected"))
    }

    /// Close the channel and wait for the thread, returning the video program.
    pub(crate) fn shutdown(mut self) -> Option<Box<dyn VideoSrc>> {
        self.join()
    }

    fn join(&mut self) -> Option<Box<dyn VideoSrc>> {
        drop(self.tx.take());
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(src) => Some(src),
            Err(_) => {
                warn!("render unit panicked");
                None
            }
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        let _ = self.join();
    }
}

struct Session {
    init: RenderInit,
    surface: Result<Box<dyn Surface>, (ErrorKind, String)>,
}

struct RenderUnit {
    src: Box<dyn VideoSrc>,
    surfaces: Arc<dyn SurfaceFactory>,
    opts: SessionOpts,
    rx: mpsc::Receiver<ToRender>,
    tx: mpsc::Sender<FromRender>,
    backlog: VecDeque<ToRender>,
    session: Option<Session>,
    // The last chunk's terminal message has not been matched with an abort yet.
    unanswered_terminal: bool,
}

impl RenderUnit {
    fn run(&mut self) {
        loop {
            let msg = match self.backlog.pop_front() {
                Some(msg) => msg,
                None => match self.rx.recv() {
                    Ok(msg) => msg,
                    Err(_) => break,
                },
            };
            let sent = match msg {
                ToRender::Init(init) => self.init(init),
                ToRender::Render(request) => self.render(request),
                ToRender::Abort => {
                    if self.unanswered_terminal {
                        self.unanswered_terminal = false;
                        debug!("abort claimed by previous terminal message");
                        true
                    } else {
                        self.reply(FromRender::Aborted)
                    }
                }
                ToRender::ClipResponse(_) | ToRender::ClipFailed { .. } => {
                    debug!("dropping clip reply with no running chunk");
                    true
                }
            };
            if !sent {
                break;
            }
        }
        debug!("render unit stopped");
    }

    fn init(&mut self, init: RenderInit) -> bool {
        let surface = self
            .surfaces
            .create(init.canvas())
            .map_err(|e| (e.kind(), e.message()));
        let initial = init.initial_chunk;
        debug!(width = init.width, height = init.height, "render unit initialized");
        self.session = Some(Session { init, surface });
        match initial {
            Some(chunk_index) => self.render(ChunkRequest {
                chunk_index: Some(chunk_index),
            }),
            None => true,
        }
    }

    fn render(&mut self, request: ChunkRequest) -> bool {
        self.unanswered_terminal = false;
        let Some(session) = self.session.as_mut() else {
            self.unanswered_terminal = true;
            return self.reply(FromRender::Failed {
                kind: ErrorKind::Protocol,
                message: "chunk requested before init".to_owned(),
            });
        };
        let surface = match session.surface.as_mut() {
            Ok(surface) => surface,
            Err((kind, message)) => {
                let msg = FromRender::Failed {
                    kind: *kind,
                    message: message.clone(),
                };
                self.unanswered_terminal = true;
                return self.reply(msg);
            }
        };

        let mut link = ChannelLink {
            rx: &self.rx,
            tx: &self.tx,
            backlog: &mut self.backlog,
            clips: ClipTable::default(),
        };
        let result = run_chunk(
            self.src.as_mut(),
            &session.init,
            request,
            &mut **surface,
            &mut link,
            &self.opts,
        );
        let reply = match result {
            Ok(ChunkOutcome::Completed(output)) => {
                self.unanswered_terminal = true;
                FromRender::Output(output)
            }
            Ok(ChunkOutcome::Aborted) => FromRender::Aborted,
            Err(e) => {
                debug!(error = %e, "chunk failed");
                self.unanswered_terminal = true;
                FromRender::Failed {
                    kind: e.kind(),
                    message: e.message(),
                }
            }
        };
        self.reply(reply)
    }

    fn reply(&self, msg: FromRender) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// [`HostLink`] over the render unit's channels.
struct ChannelLink<'a> {
    rx: &'a mpsc::Receiver<ToRender>,
    tx: &'a mpsc::Sender<FromRender>,
    backlog: &'a mut VecDeque<ToRender>,
    clips: ClipTable,
}

impl HostLink for ChannelLink<'_> {
    fn poll_abort(&mut self) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(ToRender::Abort) => return true,
                Ok(ToRender::ClipResponse(_) | ToRender::ClipFailed { .. }) => {
                    debug!("dropping stale clip reply");
                }
                Ok(other) => self.backlog.push_back(other),
                Err(mpsc::TryRecvError::Empty) => return false,
                Err(mpsc::TryRecvError::Disconnected) => return true,
            }
        }
    }

    fn fetch_clip(&mut self, request: ClipRequest) -> ReelResult<Vec<FrameRGBA>> {
        self.clips.insert(&request);
        debug!(source = %request.source, pending = self.clips.pending(), "clip requested");
        self.tx
            .send(FromRender::ClipRequest(request))
            .map_err(|_| ReelError::Aborted)?;
        loop {
            let msg = self.rx.recv().map_err(|_| ReelError::Aborted)?;
            match msg {
                ToRender::Abort => {
                    self.clips.clear();
                    return Err(ReelError::Aborted);
                }
                ToRender::ClipResponse(response) => match self.clips.resolve(response) {
                    Some(frames) => return Ok(frames),
                    None => debug!("ignoring clip response that matches no pending request"),
                },
                ToRender::ClipFailed { request, message } => {
                    if self.clips.take(&request) {
                        return Err(ReelError::resource(message));
                    }
                    debug!("ignoring clip failure that matches no pending request");
                }
                other => self.backlog.push_back(other),
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/worker.rs"]
mod tests;
