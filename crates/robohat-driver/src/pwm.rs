//! PWM 舵机位置插值
//!
//! 每个 PWM 通道一个实例。`set_position(target, duration)` 只记录目标和步数，
//! 由 20ms 周期定时器逐步输出中间脉宽，最后一步直接写入目标值，消除取整误差。
//!
//! # 算法
//!
//! ```text
//! ticks = round(duration / 20)
//! delta = (current - target) / ticks
//! 每个 tick: remaining -= 1
//!   remaining > 0 : width = target + trunc(delta * remaining)
//!   remaining == 0: width = target（最终对齐）
//! ```
//!
//! 因为 `delta * remaining` 随 `remaining` 单调变化，输出序列单调逼近目标，
//! 并且恰好在 `ticks` 步后等于目标。

use crate::error::DriverError;
use crate::timer::PeriodicTimer;
use parking_lot::Mutex;
use robohat_io::PwmDriver;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

/// 最短运动时间（毫秒），小于此值按此值处理
pub const MIN_MOVE_DURATION_MS: u32 = 20;

/// 最长运动时间（毫秒），大于此值按此值处理
pub const MAX_MOVE_DURATION_MS: u32 = 30_000;

/// 偏差绝对值上限（不含）
pub const DEVIATION_LIMIT: i32 = 300;

/// 插值周期
pub const TICK_PERIOD: Duration = Duration::from_millis(20);

/// PWM 通道配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwmConfig {
    /// 脉宽下限（微秒）
    pub min_width: u32,
    /// 脉宽上限（微秒）
    pub max_width: u32,
    /// 上电时认为的当前脉宽（微秒）
    pub initial_width: u32,
    /// 初始偏差（微秒）
    pub deviation: i32,
    /// 插值周期
    pub tick_period: Duration,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self {
            min_width: 50,
            max_width: 2500,
            initial_width: 1500,
            deviation: 0,
            tick_period: TICK_PERIOD,
        }
    }
}

/// 通道状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelState {
    /// 当前脉宽
    pub current_width: u32,
    /// 目标脉宽
    pub target_width: u32,
    /// 剩余步数，`None` 表示空闲
    pub remaining_ticks: Option<u32>,
    /// 每步增量（current - target 方向）
    pub per_tick_delta: f64,
    /// 偏差
    pub deviation: i32,
    /// 脉宽下限
    pub min_width: u32,
    /// 脉宽上限
    pub max_width: u32,
}

impl ChannelState {
    /// 是否正在插值
    pub fn is_moving(&self) -> bool {
        self.remaining_ticks.is_some()
    }
}

/// 把运动时间换算为插值步数（先夹紧到 [20, 30000] ms，再四舍五入）
pub fn ticks_for_duration(duration_ms: u32) -> u32 {
    let duration_ms = duration_ms.clamp(MIN_MOVE_DURATION_MS, MAX_MOVE_DURATION_MS);
    (duration_ms + MIN_MOVE_DURATION_MS / 2) / MIN_MOVE_DURATION_MS
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), DriverError> {
    if value < min || value > max {
        return Err(DriverError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_deviation(deviation: i32) -> Result<(), DriverError> {
    check_range(
        "deviation",
        deviation as i64,
        -(DEVIATION_LIMIT as i64) + 1,
        DEVIATION_LIMIT as i64 - 1,
    )
}

/// 单个 PWM 通道的插值状态机
///
/// 状态只在本通道的锁内修改；不同通道互不阻塞。
pub struct PwmChannel {
    pin: u8,
    driver: Arc<dyn PwmDriver>,
    state: Mutex<ChannelState>,
}

impl PwmChannel {
    /// 创建通道（不写硬件）
    ///
    /// # 错误
    /// - `OutOfRange`: 初始脉宽不在上下限内，或偏差超出 (-300, 300)
    pub fn new(driver: Arc<dyn PwmDriver>, pin: u8, config: &PwmConfig) -> Result<Self, DriverError> {
        check_range(
            "initial width",
            config.initial_width as i64,
            config.min_width as i64,
            config.max_width as i64,
        )?;
        check_deviation(config.deviation)?;

        Ok(Self {
            pin,
            driver,
            state: Mutex::new(ChannelState {
                current_width: config.initial_width,
                target_width: config.initial_width,
                remaining_ticks: None,
                per_tick_delta: 0.0,
                deviation: config.deviation,
                min_width: config.min_width,
                max_width: config.max_width,
            }),
        })
    }

    /// 引脚号
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// 设置目标脉宽
    ///
    /// - `duration_ms == 0`：立即跳转，写一次硬件
    /// - 否则：时间夹紧到 [20, 30000] ms，由定时器插值
    ///
    /// # 错误
    /// - `OutOfRange`: 脉宽超出上下限（不写硬件）
    pub fn set_position(&self, width: u32, duration_ms: u32) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        check_range(
            "pulse width",
            width as i64,
            state.min_width as i64,
            state.max_width as i64,
        )?;

        if duration_ms == 0 {
            state.current_width = width;
            state.target_width = width;
            state.remaining_ticks = None;
            state.per_tick_delta = 0.0;
            return self.output(&state, width);
        }

        let ticks = ticks_for_duration(duration_ms);
        state.per_tick_delta = (state.current_width as f64 - width as f64) / ticks as f64;
        state.target_width = width;
        state.remaining_ticks = Some(ticks);
        trace!(
            "PWM pin {}: {} -> {} in {} ticks",
            self.pin, state.current_width, width, ticks
        );
        Ok(())
    }

    /// 推进一步插值（由周期定时器调用）
    ///
    /// 空闲时不做任何事。
    pub fn tick(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let Some(remaining) = state.remaining_ticks else {
            return Ok(());
        };

        let remaining = remaining.saturating_sub(1);
        let width = if remaining > 0 {
            state.remaining_ticks = Some(remaining);
            let offset = (state.per_tick_delta * remaining as f64) as i64;
            (state.target_width as i64 + offset).max(0) as u32
        } else {
            state.remaining_ticks = None;
            state.target_width
        };

        state.current_width = width;
        self.output(&state, width)
    }

    /// 当前脉宽
    pub fn position(&self) -> u32 {
        self.state.lock().current_width
    }

    /// 目标脉宽
    pub fn target(&self) -> u32 {
        self.state.lock().target_width
    }

    /// 是否正在插值
    pub fn is_moving(&self) -> bool {
        self.state.lock().is_moving()
    }

    /// 设置偏差（范围 (-300, 300)）
    ///
    /// 下一次硬件写入生效。
    pub fn set_deviation(&self, deviation: i32) -> Result<(), DriverError> {
        check_deviation(deviation)?;
        self.state.lock().deviation = deviation;
        Ok(())
    }

    /// 当前偏差
    pub fn deviation(&self) -> i32 {
        self.state.lock().deviation
    }

    /// 状态快照
    pub fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    fn output(&self, state: &ChannelState, width: u32) -> Result<(), DriverError> {
        let pulse = (width as i64 + state.deviation as i64).max(0) as u32;
        self.driver.set_pulse_width(self.pin, pulse)?;
        Ok(())
    }
}

/// PWM 舵机：插值通道 + 专属 20ms 定时线程
///
/// Drop 时停止定时线程。
pub struct PwmServo {
    channel: Arc<PwmChannel>,
    _timer: PeriodicTimer,
}

impl PwmServo {
    /// 创建 PWM 舵机并启动插值定时器
    pub fn new(driver: Arc<dyn PwmDriver>, pin: u8, config: PwmConfig) -> Result<Self, DriverError> {
        let channel = Arc::new(PwmChannel::new(driver, pin, &config)?);
        let ticking = channel.clone();
        let timer = PeriodicTimer::spawn(format!("pwm-{}", pin), config.tick_period, move || {
            if let Err(e) = ticking.tick() {
                warn!("PWM pin {} update failed: {}", pin, e);
            }
        })?;

        Ok(Self {
            channel,
            _timer: timer,
        })
    }

    /// 底层通道
    pub fn channel(&self) -> &Arc<PwmChannel> {
        &self.channel
    }

    pub fn pin(&self) -> u8 {
        self.channel.pin()
    }

    /// 见 [`PwmChannel::set_position`]
    pub fn set_position(&self, width: u32, duration_ms: u32) -> Result<(), DriverError> {
        self.channel.set_position(width, duration_ms)
    }

    pub fn position(&self) -> u32 {
        self.channel.position()
    }

    pub fn is_moving(&self) -> bool {
        self.channel.is_moving()
    }

    pub fn set_deviation(&self, deviation: i32) -> Result<(), DriverError> {
        self.channel.set_deviation(deviation)
    }

    pub fn deviation(&self) -> i32 {
        self.channel.deviation()
    }
}
