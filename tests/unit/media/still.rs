use std::io::Cursor;

use super::*;

fn png_1x1(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(1, 1, rgba.to_vec()).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let frame = decode_image(&png_1x1([100, 50, 200, 128])).unwrap();
    assert_eq!(frame.width, 1);
    assert_eq!(frame.height, 1);
    assert!(frame.premultiplied);
    assert_eq!(
        frame.data,
        vec![
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_garbage_is_resource_error() {
    let err = decode_image(b"not an image").unwrap_err();
    assert!(matches!(err, ReelError::Resource(_)));
}

#[test]
fn load_image_reads_relative_to_root() {
    let dir = std::env::temp_dir().join(format!("reelcraft_img_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("dot.png"), png_1x1([0, 0, 0, 255])).unwrap();

    let frame = load_image(&dir, "dot.png").unwrap();
    assert_eq!(frame.pixel(0, 0), Some([0, 0, 0, 255]));

    let missing = load_image(&dir, "nope.png").unwrap_err();
    assert!(matches!(missing, ReelError::Resource(_)));
    let _ = std::fs::remove_dir_all(dir);
}
