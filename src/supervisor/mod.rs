pub mod error;
pub mod readiness;
pub mod service;

use std::collections::HashMap;

use error::SupervisorError;
use service::{ServiceSpec, SupervisedProcess};

use crate::process_monitor;

/// Keeps each managed server running, idempotently.
///
/// `ensure_running` prefers, in order:
/// 1. the handle already held for this service (a live entry short-circuits —
///    calling twice never spawns a second instance);
/// 2. adoption: an image-name match in the host process table (an operator
///    started the server by hand — treated as success, logged as a skip);
/// 3. a detached spawn.
///
/// There is no restart and no config-freshness check: an adopted instance
/// that was launched with a different configuration is indistinguishable from
/// a fresh one here.
pub struct Supervisor {
    services: HashMap<String, SupervisedProcess>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Make sure the service described by `spec` is running and return its pid.
    pub async fn ensure_running(&mut self, spec: &ServiceSpec) -> Result<u32, SupervisorError> {
        // 1. 이미 보유한 핸들이 살아있으면 그대로 사용
        if let Some(existing) = self.services.get_mut(&spec.name) {
            if existing.is_alive().await {
                tracing::debug!(
                    "'{}' already supervised (pid: {}), nothing to do",
                    spec.name,
                    existing.pid
                );
                return Ok(existing.pid);
            }
            tracing::warn!(
                "Supervised '{}' (pid: {}) disappeared, re-ensuring",
                spec.name,
                existing.pid
            );
            self.services.remove(&spec.name);
        }

        // 2. 프로세스 테이블에서 이미지 이름으로 채택 시도
        let matches = process_monitor::find_by_name_async(&spec.process_name).await;
        if let Some(found) = matches.first() {
            tracing::info!(
                "'{}' already running as '{}' (pid: {}), skipping spawn",
                spec.name,
                found.name,
                found.pid
            );
            let process = SupervisedProcess::adopted(&spec.name, found.pid);
            self.services.insert(spec.name.clone(), process);
            return Ok(found.pid);
        }

        // 3. 새로 스폰
        let process = service::spawn_detached(spec).await?;
        let pid = process.pid;
        self.services.insert(spec.name.clone(), process);
        Ok(pid)
    }

    pub fn get(&self, name: &str) -> Option<&SupervisedProcess> {
        self.services.get(name)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Hard-kill every managed server. Already-exited processes are ignored;
    /// no graceful shutdown signal is issued.
    pub async fn stop_all(&mut self) {
        for (name, process) in self.services.iter_mut() {
            tracing::info!("Stopping '{}' (pid: {})", name, process.pid);
            process.stop().await;
        }
        self.services.clear();
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_supervisor_is_empty() {
        let supervisor = Supervisor::new();
        assert!(supervisor.is_empty());
        assert!(supervisor.get("backend").is_none());
    }

    #[tokio::test]
    async fn test_missing_executable_propagates() {
        let mut supervisor = Supervisor::new();
        let spec = ServiceSpec::new(
            "backend",
            "/definitely/not/here/chatdock-test-backend",
            vec![],
        );
        let err = supervisor.ensure_running(&spec).await.unwrap_err();
        assert_eq!(err.error_code(), "EXECUTABLE_NOT_FOUND");
        assert!(supervisor.is_empty());
    }

    #[tokio::test]
    async fn test_adoption_of_existing_process() {
        // 테스트 프로세스가 테이블에 보이는 이름 그대로 스펙을 만들면
        // 채택 경로를 타게 됨
        let me = process_monitor::get_running_processes()
            .into_iter()
            .find(|p| p.pid == std::process::id())
            .expect("own process must be visible");
        let mut supervisor = Supervisor::new();
        let spec = ServiceSpec {
            name: "self".into(),
            process_name: me.name.clone(),
            executable: std::env::current_exe().unwrap(),
            args: vec![],
        };

        let pid = supervisor.ensure_running(&spec).await.unwrap();
        let process = supervisor.get("self").unwrap();
        assert!(process.adopted, "must adopt, not spawn");
        assert_eq!(process.pid, pid);

        // 두 번째 호출은 보유 핸들로 단락 — 새 항목이 생기지 않음
        let pid2 = supervisor.ensure_running(&spec).await.unwrap();
        assert_eq!(pid, pid2);
        assert_eq!(supervisor.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_all_ignores_already_exited() {
        let mut supervisor = Supervisor::new();
        supervisor.services.insert(
            "ghost".into(),
            SupervisedProcess::adopted("ghost", u32::MAX - 2),
        );
        // 이미 없는 PID라도 패닉/에러 없이 정리되어야 함
        supervisor.stop_all().await;
        assert!(supervisor.is_empty());
    }
}
