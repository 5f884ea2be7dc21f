use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(ReelError::setup("x").to_string().contains("setup error:"));
    assert!(
        ReelError::resource("x")
            .to_string()
            .contains("resource error:")
    );
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::protocol("x")
            .to_string()
            .contains("protocol error:")
    );
    assert!(ReelError::render("x").to_string().contains("render error:"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn kind_and_message_rebuild_the_same_error() {
    let err = ReelError::resource("clip 'a.webm' missing");
    let rebuilt = ReelError::from_parts(err.kind(), err.message());
    assert!(matches!(rebuilt, ReelError::Resource(ref m) if m == "clip 'a.webm' missing"));

    let other = ReelError::Other(anyhow::anyhow!("disk on fire"));
    assert_eq!(other.kind(), ErrorKind::Render);
    assert!(other.message().contains("disk on fire"));
}

#[test]
fn aborted_is_detectable() {
    assert!(ReelError::Aborted.is_aborted());
    assert!(!ReelError::setup("x").is_aborted());
}
