//! Realm routing, token secrets, and token pairs.

pub mod realm;
pub mod registry;
pub mod token;

pub use realm::*;
pub use registry::*;
pub use token::{pair::*, secret::*};
