//! 驱动层模块
//!
//! 本模块提供扩展板执行器的底层驱动功能，包括：
//! - 半双工串口传输（方向切换、请求/应答互斥、有界重试）
//! - PWM 舵机位置插值（每通道独立锁 + 20ms 周期定时器）
//!
//! # 使用场景
//!
//! 适用于需要直接收发总线舵机帧、或需要单独驱动 PWM 通道的场景。
//! 大多数用户应该使用 `robohat-client` 提供的更高级接口。

mod error;
pub mod pwm;
pub mod timer;
pub mod transport;

pub use error::DriverError;
pub use pwm::{ChannelState, PwmChannel, PwmConfig, PwmServo};
pub use timer::PeriodicTimer;
pub use transport::{Direction, SerialTransport, TransportConfig, TransportStats};
