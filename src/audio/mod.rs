pub(crate) mod envelope;
pub(crate) mod instruction;
pub(crate) mod ledger;
pub(crate) mod mix;
