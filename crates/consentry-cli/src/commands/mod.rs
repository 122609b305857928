pub(crate) mod cookies;
pub(crate) mod policies;
