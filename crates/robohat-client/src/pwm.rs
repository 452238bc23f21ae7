//! PWM 舵机组
//!
//! 扩展板上的 PWM 舵机接口按通道号（从 1 开始）编址，每个通道一个独立的插值器。

use crate::error::ClientError;
use robohat_driver::{PwmConfig, PwmServo};
use robohat_io::PwmDriver;
use std::sync::Arc;
use tracing::info;

/// 默认的 PWM 舵机引脚
pub const DEFAULT_PWM_PINS: [u8; 2] = [12, 13];

/// 多通道 PWM 舵机
pub struct PwmServoBank {
    servos: Vec<PwmServo>,
}

impl PwmServoBank {
    /// 为每个引脚创建一个通道并启动插值定时器
    ///
    /// `pins[0]` 对应通道 1。
    pub fn new(driver: Arc<dyn PwmDriver>, pins: &[u8], config: PwmConfig) -> Result<Self, ClientError> {
        let servos = pins
            .iter()
            .map(|&pin| PwmServo::new(driver.clone(), pin, config.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        info!("PWM servo bank ready on pins {:?}", pins);
        Ok(Self { servos })
    }

    /// 通道数
    pub fn len(&self) -> usize {
        self.servos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servos.is_empty()
    }

    /// 按通道号取舵机
    pub fn servo(&self, channel: u8) -> Result<&PwmServo, ClientError> {
        (channel as usize)
            .checked_sub(1)
            .and_then(|index| self.servos.get(index))
            .ok_or_else(|| {
                ClientError::Validation(format!(
                    "PWM channel {} not in [1, {}]",
                    channel,
                    self.servos.len()
                ))
            })
    }

    /// 设置目标脉宽，`duration_ms == 0` 立即跳转
    pub fn set_position(&self, channel: u8, width: u32, duration_ms: u32) -> Result<(), ClientError> {
        self.servo(channel)?.set_position(width, duration_ms)?;
        Ok(())
    }

    /// 当前脉宽
    pub fn get_position(&self, channel: u8) -> Result<u32, ClientError> {
        Ok(self.servo(channel)?.position())
    }

    pub fn set_deviation(&self, channel: u8, deviation: i32) -> Result<(), ClientError> {
        self.servo(channel)?.set_deviation(deviation)?;
        Ok(())
    }

    pub fn get_deviation(&self, channel: u8) -> Result<i32, ClientError> {
        Ok(self.servo(channel)?.deviation())
    }
}
