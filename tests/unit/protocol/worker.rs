use std::time::Duration;

use super::*;
use crate::foundation::core::Fps;
use crate::protocol::message::ClipResponse;
use crate::render::surface::CpuSurfaceFactory;
use crate::session::clip::ClipOptions;
use crate::session::source::{ChunkBody, DrawStep};

fn init(width: u32, height: u32) -> RenderInit {
    RenderInit {
        width,
        height,
        frame_rate: Fps::integer(10).unwrap(),
        initial_chunk: None,
        host_data: serde_json::Value::Null,
    }
}

fn spawn(src: impl VideoSrc) -> RenderWorker {
    let opts = SessionOpts {
        abort_check_interval: Duration::ZERO,
        ..SessionOpts::default()
    };
    RenderWorker::spawn(Box::new(src), Arc::new(CpuSurfaceFactory), opts).unwrap()
}

fn render(worker: &RenderWorker, chunk: i64) {
    worker
        .send(ToRender::Render(ChunkRequest {
            chunk_index: Some(chunk),
        }))
        .unwrap();
}

fn assert_silent(worker: &RenderWorker) {
    assert!(worker.rx.recv_timeout(Duration::from_millis(50)).is_err());
}

struct Frames(u64);

impl VideoSrc for Frames {
    fn chunk(&mut self, _index: usize) -> Option<ChunkBody> {
        let k = self.0;
        Some(ChunkBody::draw(move |ctx| Ok(ctx.frame() >= k)))
    }
}

struct Endless;

impl VideoSrc for Endless {
    fn chunk(&mut self, _index: usize) -> Option<ChunkBody> {
        Some(ChunkBody::draw(|_| Ok(false)))
    }
}

struct UsesClip;

impl VideoSrc for UsesClip {
    fn chunk(&mut self, _index: usize) -> Option<ChunkBody> {
        Some(ChunkBody::setup(|ctx| {
            let id = ctx.get_clip("clip.mp4", ClipOptions::default())?;
            let draw: DrawStep = Box::new(move |ctx| {
                ctx.draw_clip(id, crate::foundation::core::Affine::IDENTITY)?;
                Ok(ctx.frame() >= 1)
            });
            Ok(draw)
        }))
    }
}

fn expect_clip_request(worker: &RenderWorker) -> ClipRequest {
    match worker.recv().unwrap() {
        FromRender::ClipRequest(request) => request,
        other => panic!("expected clip request, got {other:?}"),
    }
}

#[test]
fn init_then_render_replies_with_output() {
    let worker = spawn(Frames(3));
    worker.send(ToRender::Init(init(4, 4))).unwrap();
    render(&worker, 0);
    match worker.recv().unwrap() {
        FromRender::Output(out) => {
            assert_eq!(out.frames.len(), 3);
            assert_eq!(out.chunk_index, 0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn initial_chunk_renders_without_request() {
    let worker = spawn(Frames(2));
    let mut init = init(4, 4);
    init.initial_chunk = Some(0);
    worker.send(ToRender::Init(init)).unwrap();
    assert!(matches!(worker.recv().unwrap(), FromRender::Output(_)));
}

#[test]
fn render_before_init_fails() {
    let worker = spawn(Frames(1));
    render(&worker, 0);
    match worker.recv().unwrap() {
        FromRender::Failed { kind, .. } => assert_eq!(kind, ErrorKind::Protocol),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn bad_canvas_fails_every_render() {
    let worker = spawn(Frames(1));
    worker.send(ToRender::Init(init(0, 4))).unwrap();
    render(&worker, 0);
    assert!(matches!(worker.recv().unwrap(), FromRender::Failed { .. }));
    render(&worker, 0);
    assert!(matches!(worker.recv().unwrap(), FromRender::Failed { .. }));
}

#[test]
fn abort_mid_chunk_replies_aborted_once() {
    let worker = spawn(Endless);
    worker.send(ToRender::Init(init(4, 4))).unwrap();
    render(&worker, 0);
    worker.send(ToRender::Abort).unwrap();
    assert!(matches!(worker.recv().unwrap(), FromRender::Aborted));
    assert_silent(&worker);
}

#[test]
fn abort_after_output_is_claimed_by_the_output() {
    let worker = spawn(Frames(1));
    worker.send(ToRender::Init(init(4, 4))).unwrap();
    render(&worker, 0);
    assert!(matches!(worker.recv().unwrap(), FromRender::Output(_)));

    worker.send(ToRender::Abort).unwrap();
    assert_silent(&worker);

    // A second abort has no terminal message left to claim.
    worker.send(ToRender::Abort).unwrap();
    assert!(matches!(worker.recv().unwrap(), FromRender::Aborted));
}

#[test]
fn clip_request_round_trip() {
    let worker = spawn(UsesClip);
    worker.send(ToRender::Init(init(4, 4))).unwrap();
    render(&worker, 0);
    let request = expect_clip_request(&worker);
    assert_eq!(request.source, "clip.mp4");

    let mut stale = request.clone();
    stale.source = "other.mp4".to_owned();
    worker
        .send(ToRender::ClipResponse(ClipResponse {
            request: stale,
            frames: vec![FrameRGBA::blank(2, 2)],
        }))
        .unwrap();
    worker
        .send(ToRender::ClipResponse(ClipResponse {
            request,
            frames: vec![FrameRGBA::blank(2, 2), FrameRGBA::blank(2, 2)],
        }))
        .unwrap();
    match worker.recv().unwrap() {
        FromRender::Output(out) => assert_eq!(out.frames.len(), 1),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn clip_failure_fails_the_chunk() {
    let worker = spawn(UsesClip);
    worker.send(ToRender::Init(init(4, 4))).unwrap();
    render(&worker, 0);
    let request = expect_clip_request(&worker);
    worker
        .send(ToRender::ClipFailed {
            request,
            message: "missing".to_owned(),
        })
        .unwrap();
    match worker.recv().unwrap() {
        FromRender::Failed { kind, message } => {
            assert_eq!(kind, ErrorKind::Resource);
            assert!(message.contains("missing"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn abort_while_waiting_for_clip() {
    let worker = spawn(UsesClip);
    worker.send(ToRender::Init(init(4, 4))).unwrap();
    render(&worker, 0);
    expect_clip_request(&worker);
    worker.send(ToRender::Abort).unwrap();
    assert!(matches!(worker.recv().unwrap(), FromRender::Aborted));
    assert_silent(&worker);
}

#[test]
fn shutdown_hands_back_the_program() {
    let worker = spawn(Frames(1));
    assert!(worker.shutdown().is_some());
}
