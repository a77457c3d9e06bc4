//! HTTP readiness probing with backoff.
//!
//! 고정 워밍업 sleep 대신 대상 엔드포인트를 지수 백오프로 폴링합니다.
//! 프로브 실패는 경고일 뿐 치명적이지 않습니다 — 아직 듣지 않는 게이트웨이는
//! 첫 턴의 실패로 나타나고, 릴레이는 그 턴만 격리합니다.

use std::time::Duration;

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Poll `url` until it answers or `deadline` elapses.
///
/// `require_success` distinguishes the two managed servers:
/// - backend `/health`: only HTTP 2xx counts (llama-server answers 503
///   while the model is still loading);
/// - gateway root: any HTTP response counts — an auth rejection still
///   proves the listener is up.
pub async fn wait_http_ready(
    client: &reqwest::Client,
    url: &str,
    require_success: bool,
    deadline: Duration,
) -> bool {
    let start = tokio::time::Instant::now();
    let mut backoff = INITIAL_BACKOFF;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match client.get(url).send().await {
            Ok(resp) if !require_success || resp.status().is_success() => {
                tracing::info!(
                    "{} ready after {} attempt(s) ({:.1}s)",
                    url,
                    attempts,
                    start.elapsed().as_secs_f64()
                );
                return true;
            }
            Ok(resp) => {
                tracing::debug!("{} not ready yet (status {})", url, resp.status());
            }
            Err(e) => {
                tracing::debug!("{} not reachable yet: {}", url, e);
            }
        }

        if start.elapsed() + backoff > deadline {
            tracing::warn!(
                "{} did not become ready within {:.0}s ({} attempts)",
                url,
                deadline.as_secs_f64(),
                attempts
            );
            return false;
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}
