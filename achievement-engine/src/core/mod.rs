//! 核心模块 - 配置、错误、服务门面和评估 Worker
//!
//! # 模块结构
//!
//! - [`Config`] - 服务配置
//! - [`CoreError`] - 核心错误
//! - [`AchievementService`] - ingest / replay / queries
//! - [`IngestWorker`] - 单一评估路径

pub mod config;
pub mod error;
pub mod service;
pub mod worker;

pub use config::{Config, RuleConfig};
pub use error::{CoreError, CoreResult};
pub use service::{AchievementService, IngestOutcome};
pub use worker::{IngestHandle, IngestWorker};
