//! 动作组播放的执行目标
//!
//! 动作组只关心"通道 N 在 T 毫秒内转到位置 P"，不关心通道背后是总线舵机还是 PWM 舵机。

use crate::error::ClientError;
use crate::pwm::PwmServoBank;
use crate::servo::SerialServo;

/// 位置指令接收端
///
/// 通道号从 1 开始。实现必须是非阻塞的单次写入：播放器在两行之间睡眠，
/// 不会在写入期间长时间占用任何锁。
pub trait MotionSink: Send + Sync {
    fn set_position(&self, channel: u8, position: i32, duration_ms: u32) -> Result<(), ClientError>;
}

/// 通道号即舵机 ID
impl MotionSink for SerialServo {
    fn set_position(&self, channel: u8, position: i32, duration_ms: u32) -> Result<(), ClientError> {
        SerialServo::set_position(self, channel, position, duration_ms)
    }
}

/// 位置即脉宽（微秒）
impl MotionSink for PwmServoBank {
    fn set_position(&self, channel: u8, position: i32, duration_ms: u32) -> Result<(), ClientError> {
        let width = u32::try_from(position).map_err(|_| {
            ClientError::Validation(format!("negative pulse width {} for channel {}", position, channel))
        })?;
        PwmServoBank::set_position(self, channel, width, duration_ms)
    }
}
