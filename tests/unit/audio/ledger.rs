use super::*;

#[test]
fn start_time_adds_delay_and_clamps_at_zero() {
    let mut ledger = SoundLedger::new();
    let a = ledger.play(
        0.0,
        "a.wav",
        SoundOptions {
            delay: 0.5,
            ..SoundOptions::default()
        },
    );
    let b = ledger.play(
        2.0,
        "b.wav",
        SoundOptions {
            delay: -5.0,
            ..SoundOptions::default()
        },
    );
    assert_eq!(ledger.get(a).unwrap().start_time(), 0.5);
    assert_eq!(ledger.get(b).unwrap().start_time(), 0.0);
}

#[test]
fn stop_is_idempotent() {
    let mut ledger = SoundLedger::new();
    let id = ledger.play(0.0, "a.wav", SoundOptions::default());

    ledger.get_mut(id, 1.0).unwrap().stop();
    ledger.get_mut(id, 3.0).unwrap().stop();
    assert_eq!(ledger.get(id).unwrap().stop_time(), Some(1.0));
}

#[test]
fn negative_volume_and_speed_clamp_to_zero() {
    let mut ledger = SoundLedger::new();
    let id = ledger.play(
        0.0,
        "a.wav",
        SoundOptions {
            volume: -1.0,
            speed: -2.0,
            ..SoundOptions::default()
        },
    );
    assert_eq!(ledger.get(id).unwrap().volume_at(0.0), 0.0);
    assert_eq!(ledger.get(id).unwrap().speed_at(0.0), 0.0);

    let mut s = ledger.get_mut(id, 1.0).unwrap();
    s.set_volume(-3.0);
    s.set_speed(0.5);
    assert_eq!(s.volume(), 0.0);
    assert_eq!(s.speed(), 0.5);
}

#[test]
fn setters_key_changes_at_the_clock() {
    let mut ledger = SoundLedger::new();
    let id = ledger.play(0.0, "a.wav", SoundOptions::default());
    ledger.get_mut(id, 1.0).unwrap().set_volume(0.5);
    ledger.get_mut(id, 2.0).unwrap().set_volume(0.25);

    let sound = ledger.get(id).unwrap();
    assert_eq!(sound.volume_at(0.5), 1.0);
    assert_eq!(sound.volume_at(1.0), 0.5);
    assert_eq!(sound.volume_at(2.5), 0.25);
}

#[test]
fn compile_groups_by_source_in_emission_order() {
    let mut ledger = SoundLedger::new();
    ledger.play(0.0, "b.wav", SoundOptions::default());
    ledger.play(1.0, "a.wav", SoundOptions::default());
    ledger.play(2.0, "b.wav", SoundOptions::default());

    let compiled = ledger.compile();
    assert_eq!(compiled.len(), 2);
    let b = &compiled["b.wav"];
    assert_eq!(b.len(), 2);
    assert_eq!(b[0].start_time, 0.0);
    assert_eq!(b[1].start_time, 2.0);
    assert_eq!(compiled["a.wav"][0].start_time, 1.0);
}
