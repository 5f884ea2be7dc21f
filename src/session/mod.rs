pub(crate) mod clip;
pub(crate) mod context;
pub(crate) mod render_session;
pub(crate) mod source;
