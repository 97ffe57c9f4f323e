//! litlens-common — Shared types, errors, and the sandboxed HTTP client used
//! across all LitLens crates.

pub mod error;
pub mod entities;
pub mod sandbox;

pub use error::{LitlensError, Result};
pub use entities::*;
pub use sandbox::SandboxClient;
