//! Chat relay - the interactive loop between the operator and the gateway.
//!
//! 한 줄 읽기 → 채팅 완성 요청 POST → 응답 출력. 턴 단위 실패는 그 턴에서만
//! 격리됩니다: 전송/상태/파싱 어느 단계에서 실패해도 고정 메시지 한 줄을
//! 출력하고 루프는 계속됩니다. 요청은 타임아웃으로 제한되고 Ctrl+C와
//! 경쟁(select)하므로 무한 대기가 없습니다.

use std::time::Duration;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::settings::OrchestratorSettings;

/// The one user-facing line printed for any failed turn. Transport errors,
/// non-2xx statuses, and malformed bodies all surface identically.
pub const TURN_FAILURE_MESSAGE: &str =
    "[!] No reply from the gateway for that turn. It may still be starting up — see logs/gateway.log.";

// ─── Wire Types ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

// ─── Input Classification ────────────────────────────────────

/// What one line of operator input means to the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayInput {
    /// "exit" — leave the loop
    Shutdown,
    /// "cls" — redraw the banner, dispatch nothing
    ClearScreen,
    /// Empty line — back to the prompt, dispatch nothing
    Skip,
    /// Everything else is relayed to the gateway
    Message(String),
}

pub fn classify_input(line: &str) -> RelayInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return RelayInput::Skip;
    }
    if trimmed.eq_ignore_ascii_case("exit") {
        return RelayInput::Shutdown;
    }
    if trimmed.eq_ignore_ascii_case("cls") {
        return RelayInput::ClearScreen;
    }
    RelayInput::Message(trimmed.to_string())
}

// ─── Relay ───────────────────────────────────────────────────

pub struct ChatRelay {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    /// Primary model reference (`llamacpp/<modelName>`) sent on every turn
    model: String,
    /// Shown in the banner
    model_display: String,
}

impl ChatRelay {
    pub fn new(settings: &OrchestratorSettings, model: String, model_display: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build relay HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.chat_endpoint(),
            token: settings.gateway_token.clone(),
            model,
            model_display,
        })
    }

    /// One turn: POST the single-message request, pull out the first choice.
    pub async fn send_turn(&self, user_text: &str) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: user_text.to_string(),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatResponse = response.json().await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .context("gateway response contained no choices")?;
        Ok(choice.message.content)
    }

    /// A turn never fails outward: any error collapses to the fixed message.
    pub async fn dispatch(&self, user_text: &str) -> String {
        match self.send_turn(user_text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Chat turn failed: {}", e);
                TURN_FAILURE_MESSAGE.to_string()
            }
        }
    }

    /// Run the interactive loop until "exit", EOF, or Ctrl+C.
    pub async fn run(&self) -> Result<()> {
        self.draw_banner();

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        loop {
            print_prompt();

            // 입력 대기와 Ctrl+C를 경쟁시킴 — 인터럽트는 곧장 Shutdown
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    tracing::info!("Interrupt received, leaving chat loop");
                    return Ok(());
                }
            };

            let Some(line) = line else {
                // stdin EOF
                return Ok(());
            };

            match classify_input(&line) {
                RelayInput::Shutdown => return Ok(()),
                RelayInput::Skip => continue,
                RelayInput::ClearScreen => {
                    clear_screen();
                    self.draw_banner();
                }
                RelayInput::Message(text) => {
                    // 진행 중인 요청도 Ctrl+C로 취소 가능해야 함
                    let reply = tokio::select! {
                        reply = self.dispatch(&text) => reply,
                        _ = tokio::signal::ctrl_c() => {
                            println!();
                            tracing::info!("Interrupt received, cancelling in-flight request");
                            return Ok(());
                        }
                    };
                    println!("\n  AI > {}\n", reply);
                }
            }
        }
    }

    fn draw_banner(&self) {
        println!();
        println!("  ==============================================");
        println!("   chatdock - local chat ready");
        println!("  ==============================================");
        println!("   Model:    {}", self.model_display);
        println!("   Endpoint: {}", self.endpoint);
        println!("   Commands: exit (quit) / cls (clear screen)");
        println!();
    }
}

fn print_prompt() {
    use std::io::Write;
    print!("  You > ");
    let _ = std::io::stdout().flush();
}

/// ANSI clear + cursor home.
pub fn clear_screen() {
    print!("\x1b[2J\x1b[H");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay_at(port: u16) -> ChatRelay {
        let settings: OrchestratorSettings =
            toml::from_str(&format!("gateway_port = {}\nrequest_timeout_secs = 1", port)).unwrap();
        ChatRelay::new(
            &settings,
            "llamacpp/phi-3.gguf".into(),
            "phi-3.gguf".into(),
        )
        .unwrap()
    }

    #[test]
    fn test_classify_input() {
        assert_eq!(classify_input("exit"), RelayInput::Shutdown);
        assert_eq!(classify_input("  EXIT  "), RelayInput::Shutdown);
        assert_eq!(classify_input("cls"), RelayInput::ClearScreen);
        assert_eq!(classify_input("CLS"), RelayInput::ClearScreen);
        assert_eq!(classify_input(""), RelayInput::Skip);
        assert_eq!(classify_input("   "), RelayInput::Skip);
        assert_eq!(
            classify_input("hello there"),
            RelayInput::Message("hello there".into())
        );
        // 예약어는 단독 입력일 때만 — 문장 속 exit는 일반 메시지
        assert_eq!(
            classify_input("please exit the room"),
            RelayInput::Message("please exit the room".into())
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "llamacpp/phi-3.gguf".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llamacpp/phi-3.gguf");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_response_first_choice_extraction() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hello!"}},
                      {"message":{"role":"assistant","content":"second"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hello!");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_yields_fixed_message() {
        // 포트 9 (discard) — 연결 불가
        let relay = relay_at(9);
        let reply = relay.dispatch("hello").await;
        assert_eq!(reply, TURN_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_turn_failure_does_not_poison_relay() {
        // 연속 실패 후에도 dispatch는 계속 같은 고정 메시지를 돌려줌
        let relay = relay_at(9);
        for _ in 0..3 {
            assert_eq!(relay.dispatch("still there?").await, TURN_FAILURE_MESSAGE);
        }
    }
}
