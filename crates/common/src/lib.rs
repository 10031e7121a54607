//! Common types shared by the coc-watch crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
