//! # Robohat Protocol
//!
//! 总线舵机串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `command`: 指令码常量定义
//! - `frame`: 帧编码/解析
//! - `response`: 读指令应答解码
//!
//! ## 帧格式
//!
//! ```text
//! [0x55, 0x55, id, len, cmd, param_low, param_high, ..., checksum]
//! ```
//!
//! - `len` = 参数字节数 + 3
//! - `checksum` = 255 - (id..最后一个参数字节之和 mod 256)
//! - 多字节参数使用小端序（低字节在前）

pub mod command;
pub mod frame;
pub mod response;

// 重新导出常用类型
pub use command::Command;
pub use frame::*;
pub use response::{Response, ResponseShape, decode_response};

use thiserror::Error;

/// 协议解析错误类型
///
/// 对应总线上的"畸形帧"：传输层会静默丢弃并计入重试次数，不单独上报。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame header: {0:02X?}")]
    BadHeader([u8; 2]),

    #[error("Command mismatch: expected {expected}, got {actual}")]
    CommandMismatch { expected: u8, actual: u8 },

    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    BadChecksum { expected: u8, actual: u8 },

    #[error("Unknown command code: {0}")]
    UnknownCommand(u8),

    #[error("Invalid length field: {0}")]
    InvalidLength(u8),

    #[error("Payload too long: {0} bytes")]
    PayloadTooLong(usize),

    #[error("Unexpected reply shape to command {command}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        command: u8,
        expected: ResponseShape,
        actual: ResponseShape,
    },
}

/// 计算校验和
///
/// `body` 为 id 到最后一个参数字节（不含帧头与校验位）。
pub fn checksum(body: &[u8]) -> u8 {
    let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    255 - sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_move_time_write() {
        // id=1, len=7, cmd=1, 500 -> F4 01, 1000 -> E8 03
        let body = [0x01, 0x07, 0x01, 0xF4, 0x01, 0xE8, 0x03];
        // 1 + 7 + 1 + 244 + 1 + 232 + 3 = 489, 489 % 256 = 233
        assert_eq!(checksum(&body), 255 - 233);
        assert_eq!(checksum(&body), 0x16);
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0xFF);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[0xFF, 0x01]), 0xFF);
        assert_eq!(checksum(&[0xFF, 0xFF]), 0x01);
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::CommandMismatch {
            expected: 28,
            actual: 26,
        };
        assert_eq!(format!("{}", err), "Command mismatch: expected 28, got 26");

        let err = ProtocolError::BadChecksum {
            expected: 0x16,
            actual: 0x17,
        };
        assert!(format!("{}", err).contains("0x16"));
    }
}
