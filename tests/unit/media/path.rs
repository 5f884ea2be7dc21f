use super::*;

#[test]
fn normalizes_separators_and_dots() {
    assert_eq!(normalize_rel_path("a\\b/./c.mp4").unwrap(), "a/b/c.mp4");
    assert_eq!(normalize_rel_path("clips//x.wav").unwrap(), "clips/x.wav");
}

#[test]
fn rejects_escaping_paths() {
    assert!(normalize_rel_path("/abs.mp4").is_err());
    assert!(normalize_rel_path("../up.mp4").is_err());
    assert!(normalize_rel_path("").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[test]
fn resolves_under_root() {
    let p = resolve_asset_path(Path::new("assets"), "img/a.png").unwrap();
    assert_eq!(p, Path::new("assets").join("img/a.png"));
}
