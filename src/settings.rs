//! Orchestrator settings — config/orchestrator.toml
//!
//! 포트, 공유 토큰, 타임아웃 등 고정 상수를 하나의 명시적 설정 객체로 묶어
//! 각 컴포넌트 진입점에 전달합니다. 파일이 없으면 컴파일된 기본값을 사용합니다.

use serde::Deserialize;

/// Default shared secret between the orchestrator and the gateway.
///
/// A single compiled-in token is a known weakness: every installation that
/// does not override `gateway_token` in config/orchestrator.toml shares it.
/// It only ever guards a loopback-bound port.
pub const DEFAULT_GATEWAY_TOKEN: &str = "chatdock-local-gateway";

/// Fixed provider id under which the backend is registered in the
/// synthesized gateway configuration.
pub const PROVIDER_ID: &str = "llamacpp";

const SETTINGS_PATH: &str = "config/orchestrator.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSettings {
    /// Port the inference backend is told to listen on
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,

    /// Port the gateway is configured to bind
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,

    /// Bearer token shared between orchestrator and gateway
    #[serde(default = "default_gateway_token")]
    pub gateway_token: String,

    /// Context window forwarded to the backend (`-c`) and the provider entry
    #[serde(default = "default_context_size")]
    pub context_size: u32,

    /// Per-reply token cap written into the model descriptor
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Readiness probe deadline per service (seconds)
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,

    /// Chat request timeout (seconds) — bounds every relay turn
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Preference store location
    #[serde(default = "default_prefs_path")]
    pub prefs_path: String,

    /// Where the synthesized gateway configuration is written
    #[serde(default = "default_gateway_config_path")]
    pub gateway_config_path: String,
}

fn default_backend_port() -> u16 { 8080 }
fn default_gateway_port() -> u16 { 18789 }
fn default_gateway_token() -> String { DEFAULT_GATEWAY_TOKEN.to_string() }
fn default_context_size() -> u32 { 8192 }
fn default_max_tokens() -> u32 { 1024 }
fn default_ready_timeout() -> u64 { 120 }
fn default_request_timeout() -> u64 { 120 }
fn default_prefs_path() -> String { ".chatdock_prefs".to_string() }
fn default_gateway_config_path() -> String { "gateway.json".to_string() }

impl Default for OrchestratorSettings {
    fn default() -> Self {
        // 빈 TOML 역직렬화 = 모든 필드 기본값
        toml::from_str("").expect("empty settings must deserialize")
    }
}

impl OrchestratorSettings {
    /// Load from config/orchestrator.toml, falling back to defaults for a
    /// missing file or missing fields.
    pub fn load() -> Self {
        let s = std::fs::read_to_string(SETTINGS_PATH).unwrap_or_default();
        match toml::from_str(&s) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("Invalid {}: {} — using defaults", SETTINGS_PATH, e);
                Self::default()
            }
        }
    }

    /// OpenAI-compatible base URL of the backend, as the gateway sees it.
    pub fn backend_base_url(&self) -> String {
        format!("http://127.0.0.1:{}/v1", self.backend_port)
    }

    /// llama-server health endpoint (200 once the model is loaded).
    pub fn backend_health_url(&self) -> String {
        format!("http://127.0.0.1:{}/health", self.backend_port)
    }

    /// Gateway root — any HTTP response here proves the listener is up.
    pub fn gateway_base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.gateway_port)
    }

    /// Chat-completions endpoint the relay posts every turn to.
    pub fn chat_endpoint(&self) -> String {
        format!("http://127.0.0.1:{}/v1/chat/completions", self.gateway_port)
    }
}
