//! Preference store — the four user-supplied paths, as plain `key=value` lines.
//!
//! 네 개의 경로(백엔드 실행 파일, 모델 파일, 게이트웨이 실행 파일, 워크스페이스)를
//! 저장/복원합니다. 누락된 필드는 대화형으로 입력받고, 저장은 항상 네 키 전체를
//! 고정 순서로 다시 씁니다 (`save(load())`는 no-op diff).

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use anyhow::Result;

/// Canonical key order. Every save writes exactly these, in this order.
const PREF_KEYS: [&str; 4] = ["backend_exe", "model_path", "gateway_exe", "workspace_dir"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    /// Inference backend executable (e.g. llama-server)
    pub backend_exe: Option<String>,
    /// GGUF model file
    pub model_path: Option<String>,
    /// Agent gateway executable
    pub gateway_exe: Option<String>,
    /// Workspace directory handed to the gateway's agents
    pub workspace_dir: Option<String>,
}

impl Preferences {
    pub fn is_complete(&self) -> bool {
        self.backend_exe.is_some()
            && self.model_path.is_some()
            && self.gateway_exe.is_some()
            && self.workspace_dir.is_some()
    }

    fn get(&self, key: &str) -> Option<&str> {
        match key {
            "backend_exe" => self.backend_exe.as_deref(),
            "model_path" => self.model_path.as_deref(),
            "gateway_exe" => self.gateway_exe.as_deref(),
            "workspace_dir" => self.workspace_dir.as_deref(),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: String) {
        let slot = match key {
            "backend_exe" => &mut self.backend_exe,
            "model_path" => &mut self.model_path,
            "gateway_exe" => &mut self.gateway_exe,
            "workspace_dir" => &mut self.workspace_dir,
            _ => return,  // 알 수 없는 키는 무시
        };
        *slot = if value.is_empty() { None } else { Some(value) };
    }
}

/// Strip embedded quote characters from an interactive answer.
/// Windows "Copy as path" wraps paths in double quotes.
pub fn strip_quotes(s: &str) -> String {
    s.trim().replace(['"', '\''], "")
}

pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Read the store if present. An absent file leaves all four fields unset.
    pub fn load(&self) -> Result<Preferences> {
        let mut prefs = Preferences::default();
        if !self.path.exists() {
            return Ok(prefs);
        }
        let content = std::fs::read_to_string(&self.path)?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                prefs.set(key.trim(), value.trim().to_string());
            }
        }
        Ok(prefs)
    }

    /// Overwrite the store with all four canonical keys in fixed order.
    /// Partial sets are never persisted — unset fields are written empty.
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        let mut out = String::new();
        for key in PREF_KEYS {
            out.push_str(key);
            out.push('=');
            out.push_str(prefs.get(key).unwrap_or(""));
            out.push('\n');
        }
        std::fs::write(&self.path, out)?;
        Ok(())
    }
}

/// Interactive labels, in capture order.
const PROMPTS: [(&str, &str); 4] = [
    ("backend_exe", "Path to the inference backend executable (llama-server)"),
    ("model_path", "Path to the GGUF model file"),
    ("gateway_exe", "Path to the agent gateway executable"),
    ("workspace_dir", "Workspace directory for the gateway's agents"),
];

/// Prompt for every unset field, in order: backend, model, gateway, workspace.
/// Answers are quote-stripped; empty answers re-prompt (missing preferences
/// are never fatal).
pub fn capture_missing(prefs: &mut Preferences) -> Result<()> {
    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    capture_missing_from(prefs, &mut reader, &mut writer)
}

/// Testable core of [`capture_missing`] — reads answers from any `BufRead`.
pub fn capture_missing_from<R: BufRead, W: Write>(
    prefs: &mut Preferences,
    reader: &mut R,
    writer: &mut W,
) -> Result<()> {
    for (key, label) in PROMPTS {
        if prefs.get(key).is_some() {
            continue;
        }
        loop {
            write!(writer, "{}: ", label)?;
            writer.flush()?;
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                anyhow::bail!("stdin closed while capturing preference '{}'", key);
            }
            let answer = strip_quotes(&line);
            if !answer.is_empty() {
                prefs.set(key, answer);
                break;
            }
            // 빈 입력 → 같은 항목 재질문
        }
    }
    Ok(())
}
