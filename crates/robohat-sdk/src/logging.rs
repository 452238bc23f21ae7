//! 日志初始化
//!
//! 所有 crate 通过 `tracing` 输出日志。这里安装 fmt subscriber，
//! 并把依赖库的 `log` 记录桥接到 `tracing`。

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// 未设置 `RUST_LOG` 时的默认过滤规则
pub const DEFAULT_LOG_FILTER: &str = "robohat=info";

/// 日志初始化错误（通常是重复初始化）
#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("log bridge already installed: {0}")]
    LogBridge(#[from] log::SetLoggerError),
    #[error("global subscriber already set: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// 安装全局日志
///
/// 过滤规则取自 `RUST_LOG`，未设置时使用 [`DEFAULT_LOG_FILTER`]。
pub fn try_init_logger() -> Result<(), LoggerError> {
    tracing_log::LogTracer::init_with_filter(log::LevelFilter::Trace)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// 安装全局日志，已初始化时静默忽略
pub fn init_logger() {
    let _ = try_init_logger();
}
