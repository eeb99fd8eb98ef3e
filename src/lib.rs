//! Prompt Blocks - block editor core for comma-separated prompts
//!
//! Splits a prompt into reorderable blocks, keeps a translation annotation
//! per block text, and talks to a rate-limited translation endpoint.

pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod notice;
pub mod source;
pub mod store;
pub mod tokens;
pub mod translate;
