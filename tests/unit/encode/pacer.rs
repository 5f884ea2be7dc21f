use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::ReelError;

fn spec() -> CaptureSpec {
    CaptureSpec {
        canvas: Canvas::new(1, 1).unwrap(),
        fps: Fps::integer(30).unwrap(),
        soundtrack: None,
    }
}

fn frames(n: u8) -> Vec<FrameRGBA> {
    (0..n)
        .map(|i| FrameRGBA::new(1, 1, vec![i, 0, 0, 255], true).unwrap())
        .collect()
}

struct SlowSink {
    delay: Duration,
    pushed: Vec<u8>,
}

impl FrameSink for SlowSink {
    fn begin(&mut self, _spec: &CaptureSpec) -> ReelResult<()> {
        Ok(())
    }

    fn paint(&mut self, frame: &FrameRGBA) -> ReelResult<()> {
        std::thread::sleep(self.delay);
        self.pushed.push(frame.data[0]);
        Ok(())
    }

    fn finish(&mut self) -> ReelResult<()> {
        Ok(())
    }
}

#[test]
fn paints_every_frame_in_order_then_done() {
    let (tx, rx) = mpsc::channel();
    let mut sink = InMemorySink::new();
    let stats = Pacer::new(Duration::from_millis(1))
        .run(&frames(5), &spec(), &mut sink, &tx)
        .unwrap();

    assert_eq!(stats.frames_painted, 5);
    assert!(sink.is_finished());
    let order: Vec<u8> = sink.frames().iter().map(|f| f.data[0]).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
    drop(tx);
    assert_eq!(rx.iter().last(), Some(PacerEvent::Done));
}

#[test]
fn paces_frames_on_accumulating_deadlines() {
    let (tx, _rx) = mpsc::channel();
    let mut sink = InMemorySink::new();
    let started = Instant::now();
    Pacer::new(Duration::from_millis(20))
        .run(&frames(4), &spec(), &mut sink, &tx)
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[test]
fn falling_behind_is_reported_once() {
    let (tx, rx) = mpsc::channel();
    let mut sink = SlowSink {
        delay: Duration::from_millis(15),
        pushed: Vec::new(),
    };
    let stats = Pacer::new(Duration::from_millis(2))
        .run(&frames(8), &spec(), &mut sink, &tx)
        .unwrap();
    drop(tx);

    assert!(stats.fell_behind);
    assert_eq!(sink.pushed, (0..8).collect::<Vec<_>>());
    let events: Vec<PacerEvent> = rx.iter().collect();
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == PacerEvent::FallingBehind)
            .count(),
        1
    );
    assert_eq!(events.last(), Some(&PacerEvent::Done));
}

struct FailingSink;

impl FrameSink for FailingSink {
    fn begin(&mut self, _spec: &CaptureSpec) -> ReelResult<()> {
        Ok(())
    }

    fn paint(&mut self, _frame: &FrameRGBA) -> ReelResult<()> {
        Err(ReelError::render("disk full"))
    }

    fn finish(&mut self) -> ReelResult<()> {
        Ok(())
    }
}

#[test]
fn sink_error_stops_the_run() {
    let (tx, rx) = mpsc::channel();
    let err = Pacer::new(Duration::ZERO)
        .run(&frames(3), &spec(), &mut FailingSink, &tx)
        .unwrap_err();
    assert!(matches!(err, ReelError::Render(_)));
    drop(tx);
    assert!(rx.iter().all(|e| e != PacerEvent::Done));
}
