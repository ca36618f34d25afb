//! Concrete integrations built on the core.
//!
//! - **sample**: the sample destination used by the CLI

pub mod sample;
