use super::*;

#[test]
fn ntsc_rate_maps_frames_to_secs_and_back() {
    let fps = Fps::new(30000, 1001).unwrap();
    let secs = fps.frames_to_secs(123);
    assert_eq!(fps.secs_to_frames_floor(secs), 123);
    assert_eq!(fps.secs_to_frames_floor(-1.0), 0);
    assert_eq!(fps.to_string(), "30000/1001");
}

#[test]
fn zero_parts_are_rejected() {
    assert!(matches!(Fps::new(0, 1), Err(ReelError::Validation(_))));
    assert!(matches!(Fps::new(30, 0), Err(ReelError::Validation(_))));
}

#[test]
fn deserializing_a_zero_rate_fails() {
    assert!(serde_json::from_str::<Fps>(r#"{"num":0,"den":1}"#).is_err());
    let fps: Fps = serde_json::from_str(r#"{"num":25,"den":1}"#).unwrap();
    assert_eq!(fps, Fps::integer(25).unwrap());
}

#[test]
fn frame_interval_is_exact_for_integer_rates() {
    assert_eq!(Fps::integer(50).unwrap().frame_interval(), Duration::from_millis(20));
    assert_eq!(
        Fps::new(30000, 1001).unwrap().frame_interval(),
        Duration::from_nanos(33_366_666)
    );
}

#[test]
fn slowest_rate_interval_does_not_overflow() {
    let fps = Fps::new(1, u32::MAX).unwrap();
    assert_eq!(fps.frame_interval().as_secs(), u64::from(u32::MAX));
}

#[test]
fn canvas_rejects_empty_sides_and_counts_wide_pixels() {
    assert!(Canvas::new(0, 4).is_err());
    assert!(Canvas::new(4, 0).is_err());
    assert_eq!(Canvas::new(70_000, 70_000).unwrap().pixels(), 4_900_000_000);
}
