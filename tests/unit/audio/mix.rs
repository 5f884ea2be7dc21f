use super::*;
use crate::audio::envelope::ChangeMap;

struct Ramp;

impl AudioDecoder for Ramp {
    fn decode(&self, source: &str) -> ReelResult<AudioPcm> {
        match source {
            "ramp" => Ok(AudioPcm {
                sample_rate: 4,
                channels: 1,
                interleaved: Arc::new(vec![0.1, 0.2, 0.3, 0.4]),
            }),
            other => Err(ReelError::resource(format!("missing {other}"))),
        }
    }
}

fn ins() -> AudioInstruction {
    AudioInstruction {
        start_time: 0.0,
        stop_time: None,
        offset: 0.0,
        duration: None,
        starting_volume: 1.0,
        volume_changes: ChangeMap::new(),
        looping: false,
        loop_start: 0.0,
        loop_end: 0.0,
        starting_speed: 1.0,
        speed_changes: ChangeMap::new(),
    }
}

fn mix_one(ins: AudioInstruction) -> Vec<f32> {
    let mut map = AudioInstructions::new();
    map.insert("ramp".to_owned(), vec![ins]);
    let mixed = mix_at(&map, &Ramp, 2.0, 4).unwrap();
    assert_eq!(mixed.channels, 2);
    mixed.interleaved.chunks_exact(2).map(|lr| lr[0]).collect()
}

fn assert_close(got: &[f32], want: &[f32]) {
    assert_eq!(got.len(), want.len());
    for (g, w) in got.iter().zip(want) {
        assert!((g - w).abs() < 1e-6, "got {got:?}, want {want:?}");
    }
}

#[test]
fn honors_start_time_and_offset() {
    let left = mix_one(AudioInstruction {
        start_time: 0.5,
        offset: 0.25,
        ..ins()
    });
    assert_close(&left, &[0.0, 0.0, 0.2, 0.3, 0.4, 0.0, 0.0, 0.0]);
}

#[test]
fn honors_stop_time() {
    let left = mix_one(AudioInstruction {
        stop_time: Some(0.5),
        ..ins()
    });
    assert_close(&left, &[0.1, 0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn loops_over_whole_track_by_default() {
    let left = mix_one(AudioInstruction {
        looping: true,
        ..ins()
    });
    assert_close(&left, &[0.1, 0.2, 0.3, 0.4, 0.1, 0.2, 0.3, 0.4]);
}

#[test]
fn loops_inside_region() {
    let left = mix_one(AudioInstruction {
        looping: true,
        loop_start: 0.25,
        loop_end: 0.75,
        ..ins()
    });
    assert_close(&left, &[0.1, 0.2, 0.3, 0.2, 0.3, 0.2, 0.3, 0.2]);
}

#[test]
fn applies_volume_envelope() {
    let mut volume_changes = ChangeMap::new();
    volume_changes.set(0.5, 0.5);
    let left = mix_one(AudioInstruction {
        volume_changes,
        ..ins()
    });
    assert_close(&left, &[0.1, 0.2, 0.15, 0.2, 0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn duration_limits_played_source_time() {
    let left = mix_one(AudioInstruction {
        duration: Some(0.5),
        ..ins()
    });
    assert_close(&left, &[0.1, 0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn decode_failure_fails_the_mixdown() {
    let mut map = AudioInstructions::new();
    map.insert("ramp".to_owned(), vec![ins()]);
    map.insert("gone".to_owned(), vec![ins()]);
    let err = mix_at(&map, &Ramp, 1.0, 4).unwrap_err();
    assert!(matches!(err, ReelError::Resource(_)));
}

#[test]
fn f32le_stream_has_four_little_endian_bytes_per_sample() {
    let mixed = MixedAudio {
        sample_rate: MIX_SAMPLE_RATE,
        channels: MIX_CHANNELS,
        interleaved: vec![0.0, 1.0, -1.0],
    };
    let mut bytes = Vec::new();
    mixed.write_f32le(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 12);
    assert_eq!(&bytes[4..8], &1.0f32.to_le_bytes());
    assert_eq!(&bytes[8..12], &(-1.0f32).to_le_bytes());
}
