use std::path::PathBuf;

/// 规则阈值 - tunable parameters of the rule checkers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfig {
    /// Night's watchman window start hour, inclusive (UTC)
    pub night_window_start_hour: u32,
    /// Night's watchman window end hour, exclusive (UTC)
    pub night_window_end_hour: u32,
    /// Distinct branches in one day for Branch juggler
    pub branch_juggler_threshold: usize,
    /// Failed pipelines in one day for Not your day
    pub failed_pipelines_threshold: u64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            night_window_start_hour: 1,
            night_window_end_hour: 4,
            branch_juggler_threshold: 5,
            failed_pipelines_threshold: 10,
        }
    }
}

impl RuleConfig {
    /// 从环境变量加载规则配置
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            night_window_start_hour: std::env::var("NIGHT_WINDOW_START_HOUR")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|h| *h < 24)
                .unwrap_or(defaults.night_window_start_hour),
            night_window_end_hour: std::env::var("NIGHT_WINDOW_END_HOUR")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|h| *h <= 24)
                .unwrap_or(defaults.night_window_end_hour),
            branch_juggler_threshold: defaults.branch_juggler_threshold,
            failed_pipelines_threshold: defaults.failed_pipelines_threshold,
        }
    }
}

/// 服务配置 - achievement engine configuration
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATA_DIRECTORY | ./data | 数据库目录 |
/// | DATABASE_FILE | achievements.redb | 数据库文件名 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (daily rolling) |
/// | REBUILD_FROM_SCRATCH | true | 启动重放前清空派生状态 |
/// | LOG_UNKNOWN_EVENTS | true | 记录无规则的事件类型 |
/// | IMPORT_DIRECTORY | - | 启动时导入的 webhook JSON 目录 |
/// | INGEST_QUEUE_CAPACITY | 1024 | 评估队列容量 |
/// | NIGHT_WINDOW_START_HOUR | 1 | 夜间窗口开始 (含, UTC) |
/// | NIGHT_WINDOW_END_HOUR | 4 | 夜间窗口结束 (不含, UTC) |
///
/// # 示例
///
/// ```ignore
/// DATA_DIRECTORY=/var/lib/achievements IMPORT_DIRECTORY=./webhooks cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 数据目录，存放数据库文件
    pub data_directory: String,
    pub database_file: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Clear users, unlocks and metadata before the startup replay
    pub rebuild_from_scratch: bool,
    /// Persist events whose kind has no rules
    pub log_unknown_events: bool,
    pub import_directory: Option<String>,
    pub ingest_queue_capacity: usize,
    pub rules: RuleConfig,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let (log_level, log_dir) = Self::logging_from_env();
        Self {
            data_directory: std::env::var("DATA_DIRECTORY").unwrap_or_else(|_| "./data".into()),
            database_file: std::env::var("DATABASE_FILE")
                .unwrap_or_else(|_| "achievements.redb".into()),
            log_level,
            log_dir,
            rebuild_from_scratch: env_flag("REBUILD_FROM_SCRATCH", true),
            log_unknown_events: env_flag("LOG_UNKNOWN_EVENTS", true),
            import_directory: std::env::var("IMPORT_DIRECTORY").ok().filter(|v| !v.is_empty()),
            ingest_queue_capacity: std::env::var("INGEST_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|c| *c > 0)
                .unwrap_or(1024),
            rules: RuleConfig::from_env(),
        }
    }

    /// 日志配置 (LOG_LEVEL, LOG_DIR)
    ///
    /// Read on its own so the logger can start before the rest of the
    /// configuration is parsed.
    pub fn logging_from_env() -> (String, Option<String>) {
        (
            std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            std::env::var("LOG_DIR").ok().filter(|v| !v.is_empty()),
        )
    }

    /// Full path of the database file
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_directory).join(&self.database_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Boolean setting; unset or unparsable falls back to `default`
fn env_flag(name: &str, default: bool) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return default;
    };
    parse_flag(&raw).unwrap_or_else(|| {
        tracing::warn!(name, value = %raw, default, "Unrecognized boolean setting, using default");
        default
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
