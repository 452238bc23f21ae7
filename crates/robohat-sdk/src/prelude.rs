//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use robohat_sdk::prelude::*;
//! ```

// 客户端层（推荐使用）
pub use crate::client::{
    ActionRequest, ActionRow, ActionSequencer, ActionSet, ChannelLocks, Hat, HatBuilder, HatConfig,
    MotionSink, PlayMode, Playback, PlaybackHandle, PwmServoBank, SerialServo, ServoMode,
};

// 驱动层
pub use crate::driver::{PwmConfig, TransportConfig};

// 错误类型
pub use crate::client::ClientError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
