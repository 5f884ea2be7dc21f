use std::path::Path;

use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::media::path::resolve_asset_path;
use crate::render::frame::FrameRGBA;

/// Decode encoded image bytes into a premultiplied frame.
pub(crate) fn decode_image(bytes: &[u8]) -> ReelResult<FrameRGBA> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| ReelError::resource(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    FrameRGBA::new(width, height, data, true)
}

/// Read and decode the image `source` under `root`.
pub(crate) fn load_image(root: &Path, source: &str) -> ReelResult<FrameRGBA> {
    let path = resolve_asset_path(root, source)?;
    let bytes = std::fs::read(&path).map_err(|e| {
        ReelError::resource(format!("failed to read image '{}': {e}", path.display()))
    })?;
    decode_image(&bytes)
        .map_err(|e| ReelError::resource(format!("'{}': {}", path.display(), e.message())))
}

#[cfg(test)]
#[path = "../../tests/unit/media/still.rs"]
mod tests;
