//! 工具模块 - 日志和时间工具

pub mod logger;
pub mod time;

pub use logger::init_logger_with_file;
pub use time::{date_label, hour_in_window, utc_datetime};
