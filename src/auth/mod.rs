//! Request identity. Tokens are issued elsewhere; this service only verifies them.

pub mod claims;
pub(crate) mod extractors;
