pub(crate) mod clip_table;
pub(crate) mod host;
pub(crate) mod message;
pub(crate) mod worker;
