//! 驱动层错误类型定义

use robohat_io::IoError;
use robohat_protocol::{Command, ProtocolError};
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 硬件 IO 错误
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// 协议编码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 参数超出范围（在任何硬件访问之前检查）
    #[error("{field} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// 重试次数耗尽仍未收到有效应答
    #[error("No valid response to {command:?} from servo {id} after {attempts} attempts")]
    Timeout {
        id: u8,
        command: Command,
        attempts: u32,
    },

    /// 定时线程启动失败
    #[error("Failed to spawn timer thread: {0}")]
    TimerSpawn(String),
}

impl DriverError {
    /// 是否为通信超时（调用方可自行决定重试或降级）
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }

    /// 是否为参数校验错误
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, DriverError::OutOfRange { .. })
    }
}
