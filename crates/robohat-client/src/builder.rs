//! Builder 模式实现
//!
//! 提供链式构造 [`Hat`] 实例的便捷方式。数字 IO 与 PWM 驱动由调用方注入；
//! 串口未注入时按配置打开系统串口。

use crate::action::{ActionSequencer, ActionTableStore, PlaybackScheduler, TomlActionStore};
use crate::config::HatConfig;
use crate::error::ClientError;
use crate::pwm::PwmServoBank;
use crate::servo::SerialServo;
use robohat_driver::SerialTransport;
use robohat_io::{DigitalPort, PwmDriver, SerialLine};
use std::sync::Arc;
use tracing::info;

/// 扩展板执行器集合
///
/// - 总线舵机客户端
/// - PWM 舵机组
/// - 分别驱动两类舵机的动作组播放器（共享同一个后台调度器）
pub struct Hat {
    servo: Arc<SerialServo>,
    pwm: Arc<PwmServoBank>,
    servo_actions: ActionSequencer,
    pwm_actions: ActionSequencer,
    scheduler: Arc<PlaybackScheduler>,
}

impl Hat {
    /// 总线舵机
    pub fn servo(&self) -> &Arc<SerialServo> {
        &self.servo
    }

    /// PWM 舵机组
    pub fn pwm(&self) -> &Arc<PwmServoBank> {
        &self.pwm
    }

    /// 以总线舵机为目标的动作组播放器
    pub fn servo_actions(&self) -> &ActionSequencer {
        &self.servo_actions
    }

    /// 以 PWM 舵机为目标的动作组播放器
    pub fn pwm_actions(&self) -> &ActionSequencer {
        &self.pwm_actions
    }

    /// 停止后台调度器；进行中的后台播放以 `PlaybackAborted` 结束
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

/// Hat Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// # use robohat_client::{HatBuilder, HatConfig};
/// # use robohat_io::{DigitalPort, PwmDriver};
/// # use std::sync::Arc;
/// # fn demo(pins: Arc<dyn DigitalPort>, pwm: Arc<dyn PwmDriver>) -> Result<(), robohat_client::ClientError> {
/// let hat = HatBuilder::new()
///     .config(HatConfig::load("/etc/robohat.toml")?)
///     .digital_port(pins)
///     .pwm_driver(pwm)
///     .build()?;
/// hat.servo().set_position(1, 500, 1000)?;
/// # Ok(()) }
/// ```
#[derive(Default)]
pub struct HatBuilder {
    config: HatConfig,
    serial: Option<Box<dyn SerialLine>>,
    pins: Option<Arc<dyn DigitalPort>>,
    pwm_driver: Option<Arc<dyn PwmDriver>>,
    store: Option<Arc<dyn ActionTableStore>>,
}

impl HatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置完整配置（默认 [`HatConfig::default`]）
    pub fn config(mut self, config: HatConfig) -> Self {
        self.config = config;
        self
    }

    /// 注入串口线路（不注入则打开 `config.serial_device`）
    pub fn serial_line(mut self, line: impl SerialLine + 'static) -> Self {
        self.serial = Some(Box::new(line));
        self
    }

    /// 注入数字 IO（方向切换引脚，必需）
    pub fn digital_port(mut self, pins: Arc<dyn DigitalPort>) -> Self {
        self.pins = Some(pins);
        self
    }

    /// 注入 PWM 驱动（必需）
    pub fn pwm_driver(mut self, driver: Arc<dyn PwmDriver>) -> Self {
        self.pwm_driver = Some(driver);
        self
    }

    /// 注入动作表存储（默认为 TOML 文件，相对路径基于 `config.action_dir`）
    pub fn action_store(mut self, store: Arc<dyn ActionTableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 构建 Hat
    ///
    /// # 错误
    /// - `Config`: 配置无效，或缺少必需的硬件能力
    /// - `Driver`: 串口打开或引脚初始化失败
    pub fn build(self) -> Result<Hat, ClientError> {
        self.config.validate()?;

        let pins = self
            .pins
            .ok_or_else(|| ClientError::Config("digital port not set".to_string()))?;
        let pwm_driver = self
            .pwm_driver
            .ok_or_else(|| ClientError::Config("PWM driver not set".to_string()))?;

        let transport_config = self.config.transport_config();
        let serial = match self.serial {
            Some(serial) => serial,
            None => open_system_serial(&self.config.serial_device, transport_config.baud_rate)?,
        };

        let transport = Arc::new(SerialTransport::new(serial, pins, transport_config)?);
        let servo = Arc::new(SerialServo::with_config(transport, self.config.client_config()));
        let pwm = Arc::new(PwmServoBank::new(
            pwm_driver,
            &self.config.pwm_pins,
            self.config.pwm_config(),
        )?);

        let store: Arc<dyn ActionTableStore> = match self.store {
            Some(store) => store,
            None => Arc::new(match &self.config.action_dir {
                Some(dir) => TomlActionStore::with_root(dir.clone()),
                None => TomlActionStore::new(),
            }),
        };
        let scheduler = Arc::new(PlaybackScheduler::start()?);
        let servo_actions = ActionSequencer::new(servo.clone(), store.clone(), scheduler.clone());
        let pwm_actions = ActionSequencer::new(pwm.clone(), store, scheduler.clone());

        info!(
            "Robot hat ready ({} PWM channels)",
            self.config.pwm_pins.len()
        );
        Ok(Hat {
            servo,
            pwm,
            servo_actions,
            pwm_actions,
            scheduler,
        })
    }
}

#[cfg(feature = "serialport")]
fn open_system_serial(device: &str, baud_rate: u32) -> Result<Box<dyn SerialLine>, ClientError> {
    let port = robohat_io::SystemSerialPort::open(device, baud_rate)
        .map_err(robohat_driver::DriverError::from)?;
    Ok(Box::new(port))
}

#[cfg(not(feature = "serialport"))]
fn open_system_serial(device: &str, _baud_rate: u32) -> Result<Box<dyn SerialLine>, ClientError> {
    Err(ClientError::Config(format!(
        "no serial line injected and serialport backend disabled (device {})",
        device
    )))
}
