use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningProcess {
    pub pid: u32,
    pub name: String,
    pub executable_path: Option<String>,
}

/// 크로스 플랫폼: 실행 중인 모든 프로세스 목록 가져오기
pub fn get_running_processes() -> Vec<RunningProcess> {
    let mut sys = System::new_all();
    sys.refresh_all();

    let processes: Vec<RunningProcess> = sys
        .processes()
        .iter()
        .map(|(pid, process)| RunningProcess {
            pid: pid.as_u32(),
            name: process.name().to_string(),
            executable_path: process.exe().and_then(|p| p.to_str()).map(String::from),
        })
        .collect();

    tracing::debug!("Found {} running processes", processes.len());
    processes
}

/// Find every process whose image (file) name equals `name`, case-insensitively.
///
/// Detection is by file name only: two different executables that share a file
/// name are indistinguishable here. This is a known limitation of adopting
/// externally started processes — the supervisor prefers the handle it
/// captured at spawn time and only falls back to this lookup.
pub fn find_by_name(name: &str) -> Vec<RunningProcess> {
    get_running_processes()
        .into_iter()
        .filter(|p| image_name_matches(&p.name, name))
        .collect()
}

/// Linux는 /proc의 comm 값을 15바이트로 자르므로, 잘린 테이블 이름이
/// 질의 이름의 접두사인 경우도 일치로 취급합니다.
fn image_name_matches(table_name: &str, query: &str) -> bool {
    if table_name.eq_ignore_ascii_case(query) {
        return true;
    }
    table_name.len() == 15
        && query.len() > 15
        && query.to_lowercase().starts_with(&table_name.to_lowercase())
}

/// 특정 PID가 실행 중인지 확인 (크로스 플랫폼)
pub fn is_running(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_processes();
    sys.process(Pid::from_u32(pid)).is_some()
}

// ── Async wrappers ─────────────────────────────────────────
// sysinfo는 동기적으로 OS 프로세스 테이블 전체를 스캔합니다. tokio 워커에서
// 직접 호출하면 런타임이 블로킹되므로 spawn_blocking으로 감쌉니다.

/// `is_running`의 비동기 래퍼.
pub async fn is_running_async(pid: u32) -> bool {
    tokio::task::spawn_blocking(move || is_running(pid))
        .await
        .unwrap_or(false)
}

/// `find_by_name`의 비동기 래퍼.
pub async fn find_by_name_async(name: &str) -> Vec<RunningProcess> {
    let name = name.to_string();
    tokio::task::spawn_blocking(move || find_by_name(&name))
        .await
        .unwrap_or_default()
}
