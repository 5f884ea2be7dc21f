use super::*;

fn clip(n: usize) -> Clip {
    Clip::new(
        vec![FrameRGBA::blank(2, 1); n],
        "clip.mp4".to_owned(),
        &ClipOptions::default(),
    )
}

fn fps() -> Fps {
    Fps::integer(10).unwrap()
}

#[test]
fn n_frames_play_then_n_minus_one_ticks_auto_pauses_on_last() {
    let mut c = clip(5);
    let mut ledger = SoundLedger::new();
    ClipMut::new(&mut c, &mut ledger, 0.0, fps()).play();

    for tick in 1..5u64 {
        let clock = fps().frames_to_secs(tick);
        ClipMut::new(&mut c, &mut ledger, clock, fps()).advance();
    }

    let view = ClipMut::new(&mut c, &mut ledger, 0.4, fps());
    assert_eq!(view.frame(), 4);
    assert!(!view.is_playing());
    let sound = ledger.iter().next().unwrap();
    assert_eq!(sound.stop_time(), Some(0.4));
}

#[test]
fn play_is_noop_while_playing_and_aligns_offset() {
    let mut c = Clip::new(
        vec![FrameRGBA::blank(1, 1); 10],
        "clip.mp4".to_owned(),
        &ClipOptions {
            start: Some(1.0),
            offset: 0.5,
            volume: 0.25,
            ..ClipOptions::default()
        },
    );
    let mut ledger = SoundLedger::new();
    {
        let mut view = ClipMut::new(&mut c, &mut ledger, 2.0, fps());
        view.set_frame(3);
        view.play();
        view.play();
    }
    assert_eq!(ledger.len(), 1);
    let sound = ledger.iter().next().unwrap();
    assert_eq!(sound.start_time(), 2.0);
    assert!((sound.offset() - 1.8).abs() < 1e-9);
    assert_eq!(sound.volume_at(2.0), 0.25);
}

#[test]
fn pause_stops_and_discards_sound() {
    let mut c = clip(3);
    let mut ledger = SoundLedger::new();
    ClipMut::new(&mut c, &mut ledger, 0.0, fps()).play();
    {
        let mut view = ClipMut::new(&mut c, &mut ledger, 0.1, fps());
        view.pause();
        assert!(!view.is_playing());
        view.pause();
    }
    assert_eq!(ledger.iter().next().unwrap().stop_time(), Some(0.1));

    ClipMut::new(&mut c, &mut ledger, 0.2, fps()).play();
    assert_eq!(ledger.len(), 2);
}

#[test]
fn set_frame_pauses_and_clamps() {
    let mut c = clip(3);
    let mut ledger = SoundLedger::new();
    let mut view = ClipMut::new(&mut c, &mut ledger, 0.0, fps());
    view.play();
    view.set_frame(99);
    assert_eq!(view.frame(), 2);
    assert!(!view.is_playing());

    view.set_current_time(0.1);
    assert_eq!(view.frame(), 1);
    assert!((view.current_time() - 0.1).abs() < 1e-9);
}

#[test]
fn volume_set_while_paused_applies_to_next_sound() {
    let mut c = clip(3);
    let mut ledger = SoundLedger::new();
    {
        let mut view = ClipMut::new(&mut c, &mut ledger, 0.0, fps());
        view.set_volume(0.3);
        view.play();
    }
    {
        let mut view = ClipMut::new(&mut c, &mut ledger, 0.1, fps());
        view.set_volume(-1.0);
        assert_eq!(view.volume(), 0.0);
    }
    let sound = ledger.iter().next().unwrap();
    assert_eq!(sound.volume_at(0.0), 0.3);
    assert_eq!(sound.volume_at(0.1), 0.0);
}

#[test]
fn exposes_frame_metadata() {
    let mut c = clip(4);
    let mut ledger = SoundLedger::new();
    let view = ClipMut::new(&mut c, &mut ledger, 0.0, fps());
    assert_eq!(view.width(), 2);
    assert_eq!(view.height(), 1);
    assert_eq!(view.frame_count(), 4);
    assert_eq!(view.source(), "clip.mp4");
    assert_eq!(view.current_frame().width, 2);
}
