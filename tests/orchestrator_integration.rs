/// 오케스트레이터 통합 테스트 — 컴포넌트 경계를 넘는 시나리오만 검증.
/// 단위 수준 동작은 각 모듈의 #[cfg(test)]에 있습니다.

use chatdock::gateway_config;
use chatdock::prefs::{PreferenceStore, Preferences};
use chatdock::settings::OrchestratorSettings;

fn sample_prefs() -> Preferences {
    Preferences {
        backend_exe: Some("D:\\llama\\llama-server.exe".into()),
        model_path: Some("D:\\m\\phi-3.gguf".into()),
        gateway_exe: Some("D:\\gw\\gateway.exe".into()),
        workspace_dir: Some("C:\\clawd".into()),
    }
}

#[test]
fn prefs_roundtrip_through_real_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = PreferenceStore::new(dir.path().join(".chatdock_prefs"));

    // 빈 저장소 → 네 필드 모두 미설정
    assert!(!store.load().unwrap().is_complete());

    let prefs = sample_prefs();
    store.save(&prefs).unwrap();
    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, prefs);
    assert!(reloaded.is_complete());
}

#[test]
fn synthesized_config_lands_on_disk_as_valid_json() {
    let dir = tempfile::tempdir().unwrap();
    let settings = OrchestratorSettings::default();

    let config = gateway_config::synthesize(&sample_prefs(), &settings).unwrap();
    let text = gateway_config::render(&config).unwrap();
    let path = dir.path().join("gateway.json");
    gateway_config::write_config(&path, &text).unwrap();

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    // 시나리오: model_path = "D:\m\phi-3.gguf" → id/name 모두 "phi-3.gguf"
    let model = &on_disk["models"]["providers"]["llamacpp"]["models"][0];
    assert_eq!(model["id"], "phi-3.gguf");
    assert_eq!(model["name"], "phi-3.gguf");
    assert_eq!(on_disk["agents"]["defaults"]["model"], "llamacpp/phi-3.gguf");
    assert_eq!(on_disk["agents"]["defaults"]["workspace"], "C:/clawd");
    assert_eq!(
        on_disk["models"]["providers"]["llamacpp"]["baseUrl"],
        "http://127.0.0.1:8080/v1"
    );
}

#[test]
fn synthesis_is_byte_identical_across_runs() {
    let settings = OrchestratorSettings::default();
    let first =
        gateway_config::render(&gateway_config::synthesize(&sample_prefs(), &settings).unwrap())
            .unwrap();
    let second =
        gateway_config::render(&gateway_config::synthesize(&sample_prefs(), &settings).unwrap())
            .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn failed_turn_prints_fixed_message_and_loop_survives() {
    use chatdock::relay::{ChatRelay, TURN_FAILURE_MESSAGE};

    // 어디에도 게이트웨이가 없음 → 모든 턴이 고정 실패 메시지로 수렴
    let settings: OrchestratorSettings =
        toml::from_str("gateway_port = 9\nrequest_timeout_secs = 1").unwrap();
    let relay = ChatRelay::new(&settings, "llamacpp/phi-3.gguf".into(), "phi-3.gguf".into())
        .unwrap();

    assert_eq!(relay.dispatch("first").await, TURN_FAILURE_MESSAGE);
    // 실패한 턴이 릴레이를 오염시키지 않음
    assert_eq!(relay.dispatch("second").await, TURN_FAILURE_MESSAGE);
}

/// 실제 스폰 → 멱등성 → 강제 종료까지의 수명주기 (유닉스 전용:
/// 고유한 이름의 sleep 사본을 띄워 프로세스 테이블 모호성을 제거)
#[cfg(unix)]
#[tokio::test]
async fn spawn_is_idempotent_and_stop_kills() {
    use chatdock::process_monitor;
    use chatdock::supervisor::service::ServiceSpec;
    use chatdock::supervisor::Supervisor;

    let dir = tempfile::tempdir().unwrap();
    let sleeper = dir.path().join("cd-sleeper");
    std::fs::copy("/bin/sleep", &sleeper).expect("copy /bin/sleep");

    let mut supervisor = Supervisor::new();
    let spec = ServiceSpec::new("sleeper", &sleeper, vec!["300".into()]);

    let pid = supervisor.ensure_running(&spec).await.unwrap();
    assert!(process_monitor::is_running_async(pid).await);
    assert!(!supervisor.get("sleeper").unwrap().adopted);

    // 두 번째 호출은 새 인스턴스를 만들지 않음
    let pid2 = supervisor.ensure_running(&spec).await.unwrap();
    assert_eq!(pid, pid2);
    assert_eq!(supervisor.len(), 1);

    supervisor.stop_all().await;
    assert!(supervisor.is_empty());
    assert!(!process_monitor::is_running_async(pid).await);
}
