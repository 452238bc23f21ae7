//! 指令码定义
//!
//! 每条指令对应一个固定的整数操作码。写指令无应答，读指令的应答帧携带相同的指令码。

use crate::response::ResponseShape;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 总线舵机指令码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Command {
    /// 位置 + 时间（立即执行）
    MoveTimeWrite = 1,
    MoveTimeRead = 2,
    /// 位置 + 时间（等待 MoveStart 再执行）
    MoveTimeWaitWrite = 7,
    MoveTimeWaitRead = 8,
    MoveStart = 11,
    MoveStop = 12,
    IdWrite = 13,
    IdRead = 14,
    /// 偏差调整（不掉电保存）
    AngleOffsetAdjust = 17,
    /// 偏差写入（掉电保存）
    AngleOffsetWrite = 18,
    AngleOffsetRead = 19,
    AngleLimitWrite = 20,
    AngleLimitRead = 21,
    VinLimitWrite = 22,
    VinLimitRead = 23,
    TempMaxLimitWrite = 24,
    TempMaxLimitRead = 25,
    TempRead = 26,
    VinRead = 27,
    PosRead = 28,
    /// 舵机/电机模式切换
    OrMotorModeWrite = 29,
    OrMotorModeRead = 30,
    LoadOrUnloadWrite = 31,
    LoadOrUnloadRead = 32,
    LedCtrlWrite = 33,
    LedCtrlRead = 34,
    LedErrorWrite = 35,
    LedErrorRead = 36,
}

impl Command {
    /// 原始操作码
    pub fn code(self) -> u8 {
        self.into()
    }

    /// 读指令的应答形状，写指令返回 `None`
    pub fn response_shape(self) -> Option<ResponseShape> {
        match self {
            Command::MoveTimeRead
            | Command::MoveTimeWaitRead
            | Command::AngleLimitRead
            | Command::VinLimitRead
            | Command::OrMotorModeRead => Some(ResponseShape::ValuePair),
            Command::IdRead
            | Command::AngleOffsetRead
            | Command::TempMaxLimitRead
            | Command::TempRead
            | Command::VinRead
            | Command::PosRead
            | Command::LoadOrUnloadRead
            | Command::LedCtrlRead
            | Command::LedErrorRead => Some(ResponseShape::Value),
            _ => None,
        }
    }

    /// 是否为读指令（需要等待应答帧）
    pub fn is_read(self) -> bool {
        self.response_shape().is_some()
    }
}
