use super::*;
use crate::audio::ledger::{SoundLedger, SoundOptions};

fn instruction() -> AudioInstruction {
    let mut ledger = SoundLedger::new();
    let id = ledger.play(
        0.0,
        "a.wav",
        SoundOptions {
            volume: 0.8,
            looping: true,
            ..SoundOptions::default()
        },
    );
    ledger.get_mut(id, 1.0).unwrap().set_volume(0.2);
    ledger.get_mut(id, 2.0).unwrap().set_speed(2.0);
    ledger.get_mut(id, 3.0).unwrap().stop();
    compile(ledger.iter()).remove("a.wav").unwrap().remove(0)
}

#[test]
fn instruction_copies_sound_fields() {
    let ins = instruction();
    assert_eq!(ins.start_time, 0.0);
    assert_eq!(ins.stop_time, Some(3.0));
    assert!(ins.looping);
    assert_eq!(ins.volume_at(0.5), 0.8);
    assert_eq!(ins.volume_at(1.0), 0.2);
    assert_eq!(ins.speed_at(1.9), 1.0);
    assert_eq!(ins.speed_at(2.0), 2.0);
}

#[test]
fn loop_region_defaults_to_whole_track() {
    let mut ins = instruction();
    assert_eq!(ins.loop_region(4.0), (0.0, 4.0));

    ins.loop_start = 1.0;
    ins.loop_end = 2.0;
    assert_eq!(ins.loop_region(4.0), (1.0, 2.0));

    ins.loop_end = 9.0;
    assert_eq!(ins.loop_region(4.0), (1.0, 4.0));
}

#[test]
fn serializes_loop_field_name() {
    let json = serde_json::to_value(instruction()).unwrap();
    assert_eq!(json["loop"], serde_json::Value::Bool(true));
    assert_eq!(json["stop_time"], serde_json::json!(3.0));
}
