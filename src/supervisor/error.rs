//! Supervisor 전용 에러 타입 — 스폰 실패와 설정 오류를 구분해
//! 호출자가 적절히 보고할 수 있게 합니다.

use std::path::PathBuf;

/// Supervisor 작업 중 발생할 수 있는 에러 유형
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    #[error("Executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    #[error("Failed to spawn '{name}': {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Spawned process '{0}' reported no PID")]
    NoPid(String),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl SupervisorError {
    /// 머신 리더블 에러 코드
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ExecutableNotFound(_) => "EXECUTABLE_NOT_FOUND",
            Self::SpawnFailed { .. } => "SPAWN_FAILED",
            Self::NoPid(_) => "NO_PID",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
