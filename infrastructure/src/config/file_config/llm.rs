//! Completion endpoint settings from TOML (`[llm]` section)
//!
//! Any OpenAI-compatible chat completions endpoint works:
//!
//! ```toml
//! [llm]
//! base_url = "https://api.openai.com/v1"
//! model = "gpt-4o"
//! api_key_env = "OPENAI_API_KEY"
//! timeout_seconds = 120
//!
//! # Sampling for reviewers and moderator
//! review_temperature = 0.2
//! refine_temperature = 0.3
//! max_parse_attempts = 2
//! ```

use roundtable_application::AgentParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLlmConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    pub timeout_seconds: u64,
    pub review_temperature: f32,
    pub refine_temperature: f32,
    /// Attempts per review before a malformed response fails the agent
    pub max_parse_attempts: u32,
}

impl Default for FileLlmConfig {
    fn default() -> Self {
        let params = AgentParams::default();
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: 120,
            review_temperature: params.review_temperature,
            refine_temperature: params.refine_temperature,
            max_parse_attempts: params.max_parse_attempts,
        }
    }
}

impl FileLlmConfig {
    pub fn to_agent_params(&self) -> AgentParams {
        AgentParams::default()
            .with_review_temperature(self.review_temperature)
            .with_refine_temperature(self.refine_temperature)
            .with_max_parse_attempts(self.max_parse_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_llm_section() {
        let toml_str = r#"
[llm]
base_url = "http://localhost:11434/v1"
model = "llama3.1"
max_parse_attempts = 4
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");

        let params = config.llm.to_agent_params();
        assert_eq!(params.max_parse_attempts, 4);
        assert_eq!(params.review_temperature, 0.2);
    }
}
