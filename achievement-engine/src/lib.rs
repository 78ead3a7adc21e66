//! Achievement Engine - 可重放的成就规则评估核心
//!
//! # 架构概述
//!
//! Ingests webhook events from a version-control platform and derives
//! per-user achievement unlocks:
//!
//! - **事件日志** (`events`): append-only, deduplicated, ingest-ordered
//! - **用户账本** (`users`): identity fragments merged into canonical users
//! - **成就** (`achievements`): state store, rule checkers, evaluation, replay
//! - **存储** (`storage`): one embedded redb database holding every table
//!
//! # 模块结构
//!
//! ```text
//! achievement-engine/src/
//! ├── core/          # 配置、错误、服务门面、评估 worker
//! ├── storage.rs     # redb 表定义
//! ├── events/        # 事件日志、指纹、目录导入
//! ├── users/         # 用户账本
//! ├── achievements/  # 状态存储、规则、引擎、重放
//! └── utils/         # 日志、时间
//! ```

pub mod achievements;
pub mod core;
pub mod events;
pub mod storage;
pub mod users;
pub mod utils;

// Re-export 公共类型
pub use self::achievements::{ReplayReport, RuleRegistry};
pub use self::core::{
    AchievementService, Config, CoreError, CoreResult, IngestHandle, IngestOutcome, IngestWorker,
    RuleConfig,
};
pub use events::{EventLog, ImportReport, import_directory};
pub use storage::{Storage, StorageError, StorageResult};
pub use users::UserLedger;

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

/// 设置运行环境 (dotenv, 数据目录, 日志)
pub fn setup_environment() -> std::io::Result<Config> {
    // .env is optional
    let _ = dotenv::dotenv();

    let (log_level, log_dir) = Config::logging_from_env();
    init_logger_with_file(Some(&log_level), log_dir.as_deref());

    let config = Config::from_env();
    std::fs::create_dir_all(&config.data_directory)?;

    Ok(config)
}
