//! Secret handling utilities.
//!
//! Re-exports secrecy types so callers holding the database URL or the
//! prediction API key don't need a direct secrecy import.

pub use secrecy::{ExposeSecret, SecretString};
