//! Gateway configuration synthesis.
//!
//! 환경설정 + 고정 상수로부터 게이트웨이 JSON 설정을 결정적으로 렌더링합니다.
//! 같은 입력이면 바이트 단위로 동일한 출력 — serde 구조체 필드 순서가 곧
//! 출력 순서입니다. 파일 쓰기는 write-temp-then-rename으로 원자적입니다.

use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::prefs::Preferences;
use crate::settings::{OrchestratorSettings, PROVIDER_ID};

// ─── Config Schema ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub messages: MessagingConfig,
    pub models: ModelsSection,
    pub agents: AgentsSection,
    pub gateway: GatewaySection,
}

/// Messaging behavior — replies are returned whole, not streamed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessagingConfig {
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelsSection {
    pub providers: Providers,
}

/// Exactly one provider registration. A struct rather than a map keeps the
/// rendered key set and order fixed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Providers {
    pub llamacpp: ProviderEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEntry {
    /// Points at the backend's OpenAI-compatible port
    pub base_url: String,
    /// Placeholder — llama-server ignores credentials
    pub api_key: String,
    pub supports_tools: bool,
    pub supports_vision: bool,
    pub models: Vec<ModelDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub reasoning: bool,
    /// Input modalities — local GGUF chat is text-only here
    pub input: Vec<String>,
    pub context_window: u32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentsSection {
    pub defaults: AgentDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    /// Always `<providerId>/<modelName>` with the single fixed provider id
    pub model: String,
    pub max_concurrent: u32,
    pub workspace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySection {
    pub bind: String,
    pub port: u16,
    pub auth: AuthConfig,
    pub tunnel: TunnelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub mode: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TunnelConfig {
    pub enabled: bool,
}

// ─── Derivations ─────────────────────────────────────────────

/// Final path segment of the model file, whichever separator was stored.
/// `"D:\m\phi-3.gguf"` and `"/m/phi-3.gguf"` both yield `"phi-3.gguf"`.
pub fn model_name(model_path: &str) -> String {
    model_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(model_path)
        .to_string()
}

/// Primary model reference: `llamacpp/<modelName>`.
pub fn primary_model_reference(model_path: &str) -> String {
    format!("{}/{}", PROVIDER_ID, model_name(model_path))
}

/// Workspace paths render with forward slashes regardless of how they were
/// stored (`C:\clawd` → `C:/clawd`).
pub fn normalize_workspace(path: &str) -> String {
    path.replace('\\', "/")
}

// ─── Synthesis ───────────────────────────────────────────────

/// Pure, deterministic template fill. Identical preferences and settings
/// produce an identical `GatewayConfig`.
pub fn synthesize(prefs: &Preferences, settings: &OrchestratorSettings) -> Result<GatewayConfig> {
    let model_path = prefs
        .model_path
        .as_deref()
        .context("model path preference is not set")?;
    let workspace = prefs
        .workspace_dir
        .as_deref()
        .context("workspace directory preference is not set")?;

    let name = model_name(model_path);

    Ok(GatewayConfig {
        messages: MessagingConfig { stream: false },
        models: ModelsSection {
            providers: Providers {
                llamacpp: ProviderEntry {
                    base_url: settings.backend_base_url(),
                    api_key: "not-needed".to_string(),
                    supports_tools: true,
                    supports_vision: false,
                    models: vec![ModelDescriptor {
                        id: name.clone(),
                        name,
                        reasoning: false,
                        input: vec!["text".to_string()],
                        context_window: settings.context_size,
                        max_tokens: settings.max_tokens,
                    }],
                },
            },
        },
        agents: AgentsSection {
            defaults: AgentDefaults {
                model: primary_model_reference(model_path),
                max_concurrent: 1,
                workspace: normalize_workspace(workspace),
            },
        },
        gateway: GatewaySection {
            bind: "loopback".to_string(),
            port: settings.gateway_port,
            auth: AuthConfig {
                mode: "token".to_string(),
                token: settings.gateway_token.clone(),
            },
            tunnel: TunnelConfig { enabled: false },
        },
    })
}

/// Render to UTF-8 JSON text. Field order follows the struct definitions,
/// so the output is byte-stable.
pub fn render(config: &GatewayConfig) -> Result<String> {
    let mut text = serde_json::to_string_pretty(config)?;
    text.push('\n');
    Ok(text)
}

/// Write the config atomically: temp file in the target directory, then
/// rename over the destination. The gateway can never observe a truncated
/// file, even if we crash mid-write.
pub fn write_config(path: &Path, text: &str) -> Result<()> {
    use std::io::Write;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };
    tmp.write_all(text.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("failed to move gateway config into place at {}", path.display()))?;
    tracing::info!("Gateway config written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs() -> Preferences {
        Preferences {
            backend_exe: Some("D:\\llama\\llama-server.exe".into()),
            model_path: Some("D:\\m\\phi-3.gguf".into()),
            gateway_exe: Some("D:\\gw\\gateway.exe".into()),
            workspace_dir: Some("C:\\clawd".into()),
        }
    }

    #[test]
    fn test_model_name_windows_and_unix_separators() {
        assert_eq!(model_name("D:\\m\\phi-3.gguf"), "phi-3.gguf");
        assert_eq!(model_name("/models/phi-3.gguf"), "phi-3.gguf");
        assert_eq!(model_name("phi-3.gguf"), "phi-3.gguf");
    }

    #[test]
    fn test_primary_model_reference() {
        assert_eq!(
            primary_model_reference("D:\\m\\phi-3.gguf"),
            "llamacpp/phi-3.gguf"
        );
    }

    #[test]
    fn test_workspace_normalization() {
        assert_eq!(normalize_workspace("C:\\clawd"), "C:/clawd");
        assert_eq!(normalize_workspace("/home/user/ws"), "/home/user/ws");
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let settings = OrchestratorSettings::default();
        let a = render(&synthesize(&prefs(), &settings).unwrap()).unwrap();
        let b = render(&synthesize(&prefs(), &settings).unwrap()).unwrap();
        // 같은 입력 → 바이트 단위 동일 출력
        assert_eq!(a, b);
    }

    #[test]
    fn test_model_descriptor_id_and_name_match() {
        let settings = OrchestratorSettings::default();
        let config = synthesize(&prefs(), &settings).unwrap();
        let descriptor = &config.models.providers.llamacpp.models[0];
        assert_eq!(descriptor.id, "phi-3.gguf");
        assert_eq!(descriptor.name, "phi-3.gguf");
        assert_eq!(config.agents.defaults.model, "llamacpp/phi-3.gguf");
        assert_eq!(config.agents.defaults.workspace, "C:/clawd");
    }

    #[test]
    fn test_rendered_config_is_valid_json_with_expected_wiring() {
        let settings = OrchestratorSettings::default();
        let text = render(&synthesize(&prefs(), &settings).unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(
            value["models"]["providers"]["llamacpp"]["baseUrl"],
            "http://127.0.0.1:8080/v1"
        );
        assert_eq!(value["gateway"]["port"], 18789);
        assert_eq!(value["gateway"]["bind"], "loopback");
        assert_eq!(value["gateway"]["tunnel"]["enabled"], false);
        assert_eq!(value["gateway"]["auth"]["mode"], "token");
        assert_eq!(value["messages"]["stream"], false);
    }

    #[test]
    fn test_synthesize_requires_model_and_workspace() {
        let settings = OrchestratorSettings::default();
        let mut p = prefs();
        p.model_path = None;
        assert!(synthesize(&p, &settings).is_err());

        let mut p = prefs();
        p.workspace_dir = None;
        assert!(synthesize(&p, &settings).is_err());
    }

    #[test]
    fn test_write_config_atomic_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");

        write_config(&path, "{\"a\":1}\n").unwrap();
        write_config(&path, "{\"a\":2}\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":2}\n");

        // 임시 파일이 남아있지 않아야 함
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
