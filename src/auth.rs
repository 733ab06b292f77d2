//! Auth-domain models: wire parameters and OAuth tokens.

pub mod pair;
pub mod token;

pub use pair::*;
pub use token::{secret::*, *};
