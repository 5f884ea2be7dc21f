pub(crate) mod ffmpeg;
pub(crate) mod path;
pub(crate) mod source;
pub(crate) mod still;
