//! 扩展板配置文件
//!
//! 所有字段可选，缺省值与硬件默认一致：
//!
//! ```toml
//! serial_device = "/dev/ttyAMA0"
//! pwm_pins = [12, 13]
//! action_dir = "/home/pi/actions"
//!
//! [transport]
//! baud_rate = 115200
//! read_retries = 50
//!
//! [pwm]
//! min_width = 500
//! max_width = 2500
//! ```

use crate::error::ClientError;
use crate::pwm::DEFAULT_PWM_PINS;
use crate::servo::ClientConfig;
use robohat_driver::{PwmConfig, TransportConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认串口设备
pub const DEFAULT_SERIAL_DEVICE: &str = "/dev/ttyAMA0";

/// `[transport]` 段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    pub baud_rate: u32,
    pub rx_enable_pin: u8,
    pub tx_enable_pin: u8,
    pub read_retries: u32,
    pub inter_request_delay_us: u64,
    pub response_settle_ms: u64,
    pub reset_settle_ms: u64,
}

impl Default for TransportSection {
    fn default() -> Self {
        TransportConfig::default().into()
    }
}

impl From<TransportConfig> for TransportSection {
    fn from(config: TransportConfig) -> Self {
        Self {
            baud_rate: config.baud_rate,
            rx_enable_pin: config.rx_enable_pin,
            tx_enable_pin: config.tx_enable_pin,
            read_retries: config.read_retries,
            inter_request_delay_us: config.inter_request_delay.as_micros() as u64,
            response_settle_ms: config.response_settle.as_millis() as u64,
            reset_settle_ms: config.reset_settle.as_millis() as u64,
        }
    }
}

impl From<&TransportSection> for TransportConfig {
    fn from(section: &TransportSection) -> Self {
        Self {
            baud_rate: section.baud_rate,
            rx_enable_pin: section.rx_enable_pin,
            tx_enable_pin: section.tx_enable_pin,
            read_retries: section.read_retries,
            inter_request_delay: Duration::from_micros(section.inter_request_delay_us),
            response_settle: Duration::from_millis(section.response_settle_ms),
            reset_settle: Duration::from_millis(section.reset_settle_ms),
        }
    }
}

/// `[pwm]` 段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PwmSection {
    pub min_width: u32,
    pub max_width: u32,
    pub initial_width: u32,
    pub deviation: i32,
    pub tick_period_ms: u64,
}

impl Default for PwmSection {
    fn default() -> Self {
        let config = PwmConfig::default();
        Self {
            min_width: config.min_width,
            max_width: config.max_width,
            initial_width: config.initial_width,
            deviation: config.deviation,
            tick_period_ms: config.tick_period.as_millis() as u64,
        }
    }
}

impl From<&PwmSection> for PwmConfig {
    fn from(section: &PwmSection) -> Self {
        Self {
            min_width: section.min_width,
            max_width: section.max_width,
            initial_width: section.initial_width,
            deviation: section.deviation,
            tick_period: Duration::from_millis(section.tick_period_ms),
        }
    }
}

/// 扩展板配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HatConfig {
    /// 总线舵机串口设备
    pub serial_device: String,
    /// PWM 舵机引脚，下标 0 对应通道 1
    pub pwm_pins: Vec<u8>,
    /// 动作组文件目录（相对路径据此解析）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_dir: Option<PathBuf>,
    /// `reset_all` 两次写入之间的等待（毫秒）
    pub reset_settle_ms: u64,
    pub transport: TransportSection,
    pub pwm: PwmSection,
}

impl Default for HatConfig {
    fn default() -> Self {
        Self {
            serial_device: DEFAULT_SERIAL_DEVICE.to_string(),
            pwm_pins: DEFAULT_PWM_PINS.to_vec(),
            action_dir: None,
            reset_settle_ms: ClientConfig::default().reset_settle.as_millis() as u64,
            transport: TransportSection::default(),
            pwm: PwmSection::default(),
        }
    }
}

impl HatConfig {
    /// 从 TOML 文本解析
    pub fn from_toml_str(text: &str) -> Result<Self, ClientError> {
        let config: Self = toml::from_str(text).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ClientError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ClientError> {
        toml::to_string(self).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// 检查字段间的一致性
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.pwm.min_width > self.pwm.max_width {
            return Err(ClientError::Config(format!(
                "pwm.min_width {} exceeds pwm.max_width {}",
                self.pwm.min_width, self.pwm.max_width
            )));
        }
        if self.pwm.tick_period_ms == 0 {
            return Err(ClientError::Config("pwm.tick_period_ms must be positive".to_string()));
        }
        if self.transport.rx_enable_pin == self.transport.tx_enable_pin {
            return Err(ClientError::Config(
                "transport rx and tx enable pins must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn transport_config(&self) -> TransportConfig {
        (&self.transport).into()
    }

    pub fn pwm_config(&self) -> PwmConfig {
        (&self.pwm).into()
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            reset_settle: Duration::from_millis(self.reset_settle_ms),
        }
    }
}
