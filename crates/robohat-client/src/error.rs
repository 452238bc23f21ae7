//! 客户端层错误类型定义

use robohat_driver::DriverError;
use std::path::PathBuf;
use thiserror::Error;

/// 客户端层错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 驱动层错误（通信超时、IO、参数越界）
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 参数校验失败（在访问硬件之前）
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// 动作组文件不存在
    #[error("Action set not found: {}", .0.display())]
    NotFound(PathBuf),

    /// 动作组读取/解析失败
    #[error("Failed to read action set {}: {message}", path.display())]
    Store { path: PathBuf, message: String },

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 调度器错误（启动失败或已停止）
    #[error("Playback scheduler error: {0}")]
    Scheduler(String),

    /// 调度器停止时播放尚未完成
    #[error("Playback aborted before completion")]
    PlaybackAborted,
}

impl ClientError {
    /// 是否为通信超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Driver(e) if e.is_timeout())
    }

    /// 是否为参数校验错误（包括驱动层的范围检查）
    pub fn is_validation(&self) -> bool {
        match self {
            ClientError::Validation(_) => true,
            ClientError::Driver(e) => e.is_out_of_range(),
            _ => false,
        }
    }
}
