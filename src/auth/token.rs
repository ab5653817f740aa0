//! Token secrets and the per-realm token pair.

pub mod pair;
pub mod secret;
