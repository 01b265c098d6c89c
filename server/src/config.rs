use anyhow::{Context, Result};

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2-instruct-0905";

/// Completion-endpoint settings, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
}

impl Config {
    /// `GROQ_API_KEY` is required; `GROQ_API_BASE` and `GROQ_MODEL` fall
    /// back to the hosted Groq endpoint and its default model.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY").context("GROQ_API_KEY must be set")?;
        let api_base =
            std::env::var("GROQ_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self { api_key, api_base, model })
    }
}
