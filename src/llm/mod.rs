// src/llm/mod.rs
pub mod client;
pub mod normalize;

pub use client::{LlmClient, LlmConfig};
