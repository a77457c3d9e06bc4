pub mod supervisor;
pub mod process_monitor;
pub mod settings;
pub mod prefs;
pub mod gateway_config;  // 게이트웨이 JSON 설정 합성
pub mod relay;
pub mod utils;
