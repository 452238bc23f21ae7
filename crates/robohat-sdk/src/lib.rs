//! Robohat SDK - 机器人扩展板执行器 Rust SDK
//!
//! 驱动扩展板上的总线舵机（单线半双工串口）与 PWM 舵机，并回放多通道动作组。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 总线舵机帧编码/解码，纯函数
//! - **IO 层** (`io`): 串口、数字 IO、PWM 硬件能力抽象
//! - **驱动层** (`driver`): 半双工传输、PWM 插值定时器
//! - **客户端层** (`client`): 类型化舵机指令、PWM 舵机组、动作组播放
//!
//! # 快速开始
//!
//! ```no_run
//! use robohat_sdk::prelude::*;
//! # use std::sync::Arc;
//! # fn demo(pins: Arc<dyn robohat_sdk::io::DigitalPort>, pwm: Arc<dyn robohat_sdk::io::PwmDriver>) -> Result<(), ClientError> {
//! robohat_sdk::init_logger();
//!
//! let hat = HatBuilder::new()
//!     .digital_port(pins)
//!     .pwm_driver(pwm)
//!     .build()?;
//!
//! hat.servo().set_position(1, 500, 1000)?;
//! hat.pwm().set_position(1, 1500, 500)?;
//! hat.servo_actions()
//!     .run_action_set(ActionRequest::new("wave.toml"), PlayMode::Blocking, None)?;
//! # Ok(()) }
//! ```

pub use robohat_client as client;
pub use robohat_driver as driver;
pub use robohat_io as io;
pub use robohat_protocol as protocol;

mod logging;
pub mod prelude;

pub use logging::{DEFAULT_LOG_FILTER, LoggerError, init_logger, try_init_logger};

// --- 用户以此为界 ---
// 以下是通过 Facade Pattern 提供的公共 API

// 协议层错误
pub use protocol::ProtocolError;

// 驱动层（高级用户使用）
pub use driver::{DriverError, PwmServo, SerialTransport};

// 客户端层（普通用户使用）- 这是推荐的入口点
pub use client::{
    ActionRequest, ActionSequencer, ClientError, Hat, HatBuilder, HatConfig, PlayMode, Playback,
    PlaybackHandle, PwmServoBank, SerialServo,
};
