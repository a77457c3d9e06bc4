use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chatdock::gateway_config;
use chatdock::prefs::{self, PreferenceStore};
use chatdock::relay::ChatRelay;
use chatdock::settings::OrchestratorSettings;
use chatdock::supervisor::readiness::wait_http_ready;
use chatdock::supervisor::service::ServiceSpec;
use chatdock::supervisor::Supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::info!("chatdock starting");

    let settings = OrchestratorSettings::load();

    // ── Preferences ──────────────────────────────────────────
    let store = PreferenceStore::new(&settings.prefs_path);
    let mut preferences = store.load()?;
    prefs::capture_missing(&mut preferences)?;
    // 항상 네 키 전체를 다시 기록
    store.save(&preferences)?;

    // ── Gateway config synthesis ─────────────────────────────
    let config = gateway_config::synthesize(&preferences, &settings)?;
    let config_text = gateway_config::render(&config)?;
    let config_path = absolute(&settings.gateway_config_path);
    gateway_config::write_config(&config_path, &config_text)?;

    let model_path = preferences.model_path.clone().unwrap_or_default();
    let model_name = gateway_config::model_name(&model_path);
    let model_reference = gateway_config::primary_model_reference(&model_path);

    // ── Managed servers ──────────────────────────────────────
    let mut supervisor = Supervisor::new();
    let ready_timeout = Duration::from_secs(settings.ready_timeout_secs);
    let probe_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let backend_spec = ServiceSpec::new(
        "backend",
        preferences.backend_exe.clone().unwrap_or_default(),
        vec![
            "-m".into(),
            model_path.clone(),
            "-c".into(),
            settings.context_size.to_string(),
            "--host".into(),
            "127.0.0.1".into(),
            "--port".into(),
            settings.backend_port.to_string(),
        ],
    );
    supervisor.ensure_running(&backend_spec).await?;

    // 모델 로딩이 끝날 때까지 /health 폴링 (고정 sleep 대신)
    if !wait_http_ready(&probe_client, &settings.backend_health_url(), true, ready_timeout).await {
        tracing::warn!("Backend not ready yet — first chat turns may fail");
    }

    let gateway_spec = ServiceSpec::new(
        "gateway",
        preferences.gateway_exe.clone().unwrap_or_default(),
        vec![config_path.to_string_lossy().to_string()],
    );
    supervisor.ensure_running(&gateway_spec).await?;

    // 게이트웨이는 어떤 HTTP 응답이든 리스너가 떠 있다는 증거
    if !wait_http_ready(&probe_client, &settings.gateway_base_url(), false, ready_timeout).await {
        tracing::warn!("Gateway not ready yet — first chat turns may fail");
    }

    // ── Chat loop ────────────────────────────────────────────
    let relay = ChatRelay::new(&settings, model_reference, model_name)?;
    relay.run().await?;

    // ── Shutdown ─────────────────────────────────────────────
    if confirm_stop()? {
        supervisor.stop_all().await;
        println!("  Servers stopped.");
    } else {
        println!("  Leaving servers running.");
    }

    tracing::info!("chatdock shutting down");
    Ok(())
}

/// Ask the operator whether the managed servers should be killed on exit.
/// Default is no — a later run re-adopts them by image name.
fn confirm_stop() -> anyhow::Result<bool> {
    print!("  Stop the backend and gateway? (y/N): ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    // 릴레이가 stdin 리더를 내려놓은 뒤라 동기 읽기로 충분
    if std::io::stdin().read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// The gateway receives its config path as an absolute argument.
fn absolute(path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() {
        p
    } else {
        std::env::current_dir().unwrap_or_default().join(p)
    }
}
