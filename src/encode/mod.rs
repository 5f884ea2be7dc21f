pub(crate) mod ffmpeg;
pub(crate) mod pacer;
pub(crate) mod sink;
