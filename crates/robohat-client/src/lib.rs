//! 客户端接口模块
//!
//! 本模块提供扩展板执行器的用户友好接口，包括：
//! - 总线舵机类型化指令（位置、ID、限位、遥测）
//! - PWM 舵机组（按通道号编址的平滑运动）
//! - 动作组加载与播放（阻塞 / 后台、单组 / 多组同步）
//! - 配置文件与 Builder
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。如果需要直接收发帧或单独驱动某个 PWM 引脚，
//! 可以使用 `robohat-driver`。

pub mod action;
pub mod builder;
pub mod config;
mod error;
pub mod motion;
pub mod pwm;
pub mod servo;

pub use action::{
    ActionRequest, ActionRow, ActionSequencer, ActionSet, ActionTableStore, ChannelLocks,
    CompletionCallback, MemoryActionStore, PlayMode, Playback, PlaybackHandle,
    PlaybackScheduler, TomlActionStore,
};
pub use builder::{Hat, HatBuilder};
pub use config::HatConfig;
pub use error::ClientError;
pub use motion::MotionSink;
pub use pwm::PwmServoBank;
pub use servo::{ClientConfig, SerialServo, ServoMode};
