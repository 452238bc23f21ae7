//! 总线舵机客户端
//!
//! 在 [`SerialTransport`] 之上提供类型化的指令集。所有 `set_*` 都是单向写入，
//! 所有 `get_*` 都是带有界重试的读请求，失败时返回超时错误而不是阻塞。
//!
//! # Example
//!
//! ```no_run
//! # use robohat_client::SerialServo;
//! # fn demo(servo: &SerialServo) -> Result<(), robohat_client::ClientError> {
//! servo.set_position(1, 500, 1000)?;
//! let pos = servo.get_position(1)?;
//! let temp = servo.get_temperature(1)?;
//! # Ok(()) }
//! ```

use crate::error::ClientError;
use robohat_driver::{DriverError, SerialTransport};
use robohat_protocol::{
    BROADCAST_ID, Command, Params, ProtocolError, Response, ResponseShape, ServoFrame,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// 位置上限（位置范围 0-1000）
pub const POSITION_MAX: i32 = 1000;

/// 单次运动时间上限（毫秒）
pub const MOVE_TIME_MAX_MS: u32 = 30_000;

/// 角度偏差范围
pub const DEVIATION_MIN: i32 = -125;
pub const DEVIATION_MAX: i32 = 125;

/// 电机模式速度范围
pub const MOTOR_SPEED_MAX: i16 = 1000;

/// 中位
const CENTER_POSITION: u16 = 500;
const CENTER_MOVE_TIME_MS: u16 = 1000;

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `reset_all` 两次写入之间的等待
    pub reset_settle: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reset_settle: Duration::from_millis(100),
        }
    }
}

/// 舵机工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoMode {
    /// 位置控制
    Servo,
    /// 连续旋转，速度范围 [-1000, 1000]
    Motor { speed: i16 },
}

/// 总线舵机客户端
///
/// 可在多个线程间共享（`Arc<SerialServo>`），并发调用由传输层串行化。
pub struct SerialServo {
    transport: Arc<SerialTransport>,
    config: ClientConfig,
}

fn validate_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ClientError> {
    if value < min || value > max {
        return Err(ClientError::Validation(format!(
            "{} {} not in [{}, {}]",
            field, value, min, max
        )));
    }
    Ok(())
}

fn validate_bounds(field: &str, low: i64, high: i64) -> Result<(), ClientError> {
    if low > high {
        return Err(ClientError::Validation(format!(
            "{} lower bound {} exceeds upper bound {}",
            field, low, high
        )));
    }
    Ok(())
}

/// 传输层已按指令校验应答形状，这里只在指令本身没有约定形状时才会失败
fn shape_mismatch(command: Command, expected: ResponseShape, response: Response) -> ClientError {
    DriverError::Protocol(ProtocolError::ShapeMismatch {
        command: command.code(),
        expected,
        actual: response.shape(),
    })
    .into()
}

fn expect_value(command: Command, response: Response) -> Result<i16, ClientError> {
    response
        .value()
        .ok_or_else(|| shape_mismatch(command, ResponseShape::Value, response))
}

fn expect_pair(command: Command, response: Response) -> Result<(i16, i16), ClientError> {
    response
        .pair()
        .ok_or_else(|| shape_mismatch(command, ResponseShape::ValuePair, response))
}

fn ensure_write(command: Command) -> Result<(), ClientError> {
    if command.is_read() {
        return Err(ClientError::Validation(format!(
            "{:?} is a read command",
            command
        )));
    }
    Ok(())
}

fn ensure_read(command: Command) -> Result<(), ClientError> {
    if !command.is_read() {
        return Err(ClientError::Validation(format!(
            "{:?} is not a read command",
            command
        )));
    }
    Ok(())
}

impl SerialServo {
    pub fn new(transport: Arc<SerialTransport>) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: Arc<SerialTransport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// 底层传输
    pub fn transport(&self) -> &Arc<SerialTransport> {
        &self.transport
    }

    /// 发送任意写指令
    pub fn send(&self, id: u8, command: Command, params: Params) -> Result<(), ClientError> {
        ensure_write(command)?;
        self.transport.write(&ServoFrame::new(id, command, params))?;
        Ok(())
    }

    /// 发送任意读请求，使用指定重试次数
    pub fn query_with_retries(
        &self,
        id: u8,
        command: Command,
        retries: u32,
    ) -> Result<Response, ClientError> {
        ensure_read(command)?;
        Ok(self.transport.read(&ServoFrame::request(id, command), retries)?)
    }

    /// 发送任意读请求，使用默认重试次数（50）
    pub fn query(&self, id: u8, command: Command) -> Result<Response, ClientError> {
        ensure_read(command)?;
        Ok(self.transport.read_default(&ServoFrame::request(id, command))?)
    }

    fn query_value(&self, id: u8, command: Command) -> Result<i16, ClientError> {
        expect_value(command, self.query(id, command)?)
    }

    fn query_pair(&self, id: u8, command: Command) -> Result<(i16, i16), ClientError> {
        expect_pair(command, self.query(id, command)?)
    }

    // ==================== ID ====================

    /// 修改舵机 ID（`old_id` 为广播 ID 时修改总线上唯一的舵机）
    pub fn set_id(&self, old_id: u8, new_id: u8) -> Result<(), ClientError> {
        validate_range("servo id", new_id as i64, 0, robohat_protocol::MAX_SERVO_ID as i64)?;
        info!("Changing servo id {} -> {}", old_id, new_id);
        self.send(old_id, Command::IdWrite, Params::Byte(new_id))
    }

    /// 读取舵机 ID（`None` 使用广播 ID，总线上只能接一个舵机）
    pub fn get_id(&self, id: Option<u8>) -> Result<u8, ClientError> {
        let id = id.unwrap_or(BROADCAST_ID);
        Ok(self.query_value(id, Command::IdRead)? as u8)
    }

    // ==================== 运动 ====================

    /// 转到指定位置
    ///
    /// 位置夹紧到 [0, 1000]，时间夹紧到 [0, 30000] ms。
    pub fn set_position(&self, id: u8, position: i32, duration_ms: u32) -> Result<(), ClientError> {
        let position = position.clamp(0, POSITION_MAX) as u16;
        let duration = duration_ms.min(MOVE_TIME_MAX_MS) as u16;
        self.send(id, Command::MoveTimeWrite, Params::pair(position, duration))
    }

    /// 读取最近一次的目标位置与运动时间
    pub fn get_move_time(&self, id: u8) -> Result<(u16, u16), ClientError> {
        let (position, duration) = self.query_pair(id, Command::MoveTimeRead)?;
        Ok((position as u16, duration as u16))
    }

    /// 停止运动
    pub fn stop(&self, id: u8) -> Result<(), ClientError> {
        self.send(id, Command::MoveStop, Params::None)
    }

    // ==================== 偏差 ====================

    /// 调整偏差（不掉电保存），范围 [-125, 125]
    ///
    /// 负值按补码单字节发送。
    pub fn set_deviation(&self, id: u8, deviation: i32) -> Result<(), ClientError> {
        validate_range("deviation", deviation as i64, DEVIATION_MIN as i64, DEVIATION_MAX as i64)?;
        self.send(id, Command::AngleOffsetAdjust, Params::Byte(deviation as i8 as u8))
    }

    /// 将当前偏差写入舵机存储
    pub fn save_deviation(&self, id: u8) -> Result<(), ClientError> {
        self.send(id, Command::AngleOffsetWrite, Params::None)
    }

    pub fn get_deviation(&self, id: u8) -> Result<i8, ClientError> {
        Ok(self.query_value(id, Command::AngleOffsetRead)? as u8 as i8)
    }

    // ==================== 限位 ====================

    /// 设置转动范围（0-1000）
    pub fn set_position_limit(&self, id: u8, low: u16, high: u16) -> Result<(), ClientError> {
        validate_range("position limit", high as i64, 0, POSITION_MAX as i64)?;
        validate_bounds("position limit", low as i64, high as i64)?;
        self.send(id, Command::AngleLimitWrite, Params::pair(low, high))
    }

    /// 读取转动范围 (下限, 上限)
    pub fn get_position_limit(&self, id: u8) -> Result<(u16, u16), ClientError> {
        let (low, high) = self.query_pair(id, Command::AngleLimitRead)?;
        Ok((low as u16, high as u16))
    }

    /// 设置输入电压范围（毫伏）
    pub fn set_vin_limit(&self, id: u8, low_mv: u16, high_mv: u16) -> Result<(), ClientError> {
        validate_bounds("voltage limit", low_mv as i64, high_mv as i64)?;
        self.send(id, Command::VinLimitWrite, Params::pair(low_mv, high_mv))
    }

    /// 读取输入电压范围 (下限, 上限)，单位毫伏
    pub fn get_vin_limit(&self, id: u8) -> Result<(u16, u16), ClientError> {
        let (low, high) = self.query_pair(id, Command::VinLimitRead)?;
        Ok((low as u16, high as u16))
    }

    /// 设置最高温度报警阈值（摄氏度）
    pub fn set_thermal_limit(&self, id: u8, max_temp: u8) -> Result<(), ClientError> {
        self.send(id, Command::TempMaxLimitWrite, Params::Byte(max_temp))
    }

    pub fn get_thermal_limit(&self, id: u8) -> Result<u8, ClientError> {
        Ok(self.query_value(id, Command::TempMaxLimitRead)? as u8)
    }

    // ==================== 遥测 ====================

    /// 当前位置（可能略超出 0-1000）
    pub fn get_position(&self, id: u8) -> Result<i16, ClientError> {
        self.query_value(id, Command::PosRead)
    }

    /// 当前温度（摄氏度）
    pub fn get_temperature(&self, id: u8) -> Result<u8, ClientError> {
        Ok(self.query_value(id, Command::TempRead)? as u8)
    }

    /// 当前输入电压（毫伏）
    pub fn get_vin(&self, id: u8) -> Result<u16, ClientError> {
        Ok(self.query_value(id, Command::VinRead)? as u16)
    }

    // ==================== 负载 / 模式 / LED ====================

    /// 掉电（舵机可被手动转动）
    pub fn unload(&self, id: u8) -> Result<(), ClientError> {
        self.send(id, Command::LoadOrUnloadWrite, Params::Byte(0))
    }

    /// 上电锁定
    pub fn load(&self, id: u8) -> Result<(), ClientError> {
        self.send(id, Command::LoadOrUnloadWrite, Params::Byte(1))
    }

    /// 是否处于上电锁定状态
    pub fn get_load_state(&self, id: u8) -> Result<bool, ClientError> {
        Ok(self.query_value(id, Command::LoadOrUnloadRead)? != 0)
    }

    /// 切换位置控制 / 电机模式
    pub fn set_motor_mode(&self, id: u8, mode: ServoMode) -> Result<(), ClientError> {
        let (flag, speed) = match mode {
            ServoMode::Servo => (0u16, 0i16),
            ServoMode::Motor { speed } => {
                validate_range(
                    "motor speed",
                    speed as i64,
                    -(MOTOR_SPEED_MAX as i64),
                    MOTOR_SPEED_MAX as i64,
                )?;
                (1u16, speed)
            },
        };
        // 参数布局：模式(1 字节) + 空字节 + 速度(16 位补码)
        self.send(id, Command::OrMotorModeWrite, Params::pair(flag, speed as u16))
    }

    pub fn get_motor_mode(&self, id: u8) -> Result<ServoMode, ClientError> {
        let (flag, speed) = self.query_pair(id, Command::OrMotorModeRead)?;
        if flag & 0xFF == 0 {
            Ok(ServoMode::Servo)
        } else {
            Ok(ServoMode::Motor { speed })
        }
    }

    /// LED 开关（协议中 0 为常亮，1 为熄灭）
    pub fn set_led(&self, id: u8, on: bool) -> Result<(), ClientError> {
        self.send(id, Command::LedCtrlWrite, Params::Byte(if on { 0 } else { 1 }))
    }

    pub fn get_led(&self, id: u8) -> Result<bool, ClientError> {
        Ok(self.query_value(id, Command::LedCtrlRead)? == 0)
    }

    /// 设置 LED 报警条件掩码（bit0 过温，bit1 过压，bit2 堵转）
    pub fn set_led_error_mask(&self, id: u8, mask: u8) -> Result<(), ClientError> {
        validate_range("led error mask", mask as i64, 0, 7)?;
        self.send(id, Command::LedErrorWrite, Params::Byte(mask))
    }

    pub fn get_led_error_mask(&self, id: u8) -> Result<u8, ClientError> {
        Ok(self.query_value(id, Command::LedErrorRead)? as u8)
    }

    // ==================== 维护 ====================

    /// 清零偏差后回到中位 (500, 1000ms)
    pub fn reset_all(&self, id: u8) -> Result<(), ClientError> {
        debug!("Resetting servo {}", id);
        self.set_deviation(id, 0)?;
        spin_sleep::sleep(self.config.reset_settle);
        self.send(
            id,
            Command::MoveTimeWrite,
            Params::pair(CENTER_POSITION, CENTER_MOVE_TIME_MS),
        )
    }

    /// 关闭并重新打开串口线路（持续通信失败后使用）
    pub fn recover_line(&self) -> Result<(), ClientError> {
        self.transport.reset_line()?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use robohat_driver::TransportConfig;
    use robohat_io::mock::{MockDigitalPort, MockSerialPort};
    use std::collections::HashMap;

    pub(crate) fn fast_transport_config() -> TransportConfig {
        TransportConfig {
            read_retries: 5,
            inter_request_delay: Duration::ZERO,
            response_settle: Duration::ZERO,
            reset_settle: Duration::ZERO,
            ..Default::default()
        }
    }

    /// 模拟一个按指令码应答的舵机
    fn servo_with_replies(replies: HashMap<Command, Params>) -> (SerialServo, MockSerialPort) {
        let port = MockSerialPort::new();
        port.set_responder(move |request| {
            let frame = ServoFrame::parse(request).ok()?;
            let params = replies.get(&frame.command)?.clone();
            let reply = ServoFrame::new(frame.id, frame.command, params);
            Some(reply.encode().ok()?.to_vec())
        });
        let transport = SerialTransport::new(
            port.clone(),
            Arc::new(MockDigitalPort::new()),
            fast_transport_config(),
        )
        .unwrap();
        let config = ClientConfig {
            reset_settle: Duration::ZERO,
        };
        (SerialServo::with_config(Arc::new(transport), config), port)
    }

    fn silent_servo() -> (SerialServo, MockSerialPort) {
        servo_with_replies(HashMap::new())
    }

    fn last_frame(port: &MockSerialPort) -> ServoFrame {
        ServoFrame::parse(port.written().last().unwrap()).unwrap()
    }

    #[test]
    fn test_set_position_clamps() {
        let (servo, port) = silent_servo();
        servo.set_position(1, 500, 1000).unwrap();
        assert_eq!(
            port.written()[0],
            vec![0x55, 0x55, 0x01, 0x07, 0x01, 0xF4, 0x01, 0xE8, 0x03, 0x16]
        );

        servo.set_position(2, 1500, 40_000).unwrap();
        assert_eq!(last_frame(&port).params, Params::pair(1000, 30_000));

        servo.set_position(2, -20, 0).unwrap();
        assert_eq!(last_frame(&port).params, Params::pair(0, 0));
    }

    #[test]
    fn test_negative_deviation_encoded_as_twos_complement() {
        let (servo, port) = silent_servo();
        servo.set_deviation(3, -10).unwrap();
        let frame = last_frame(&port);
        assert_eq!(frame.command, Command::AngleOffsetAdjust);
        assert_eq!(frame.params, Params::Byte(0xF6));

        assert!(servo.set_deviation(3, 126).unwrap_err().is_validation());
        assert_eq!(port.write_count(), 1);
    }

    #[test]
    fn test_get_deviation_signed() {
        let mut replies = HashMap::new();
        replies.insert(Command::AngleOffsetRead, Params::Byte(0xF6));
        let (servo, _port) = servo_with_replies(replies);
        assert_eq!(servo.get_deviation(1).unwrap(), -10);
    }

    #[test]
    fn test_telemetry_reads() {
        let mut replies = HashMap::new();
        replies.insert(Command::PosRead, Params::from_values(&[612]));
        replies.insert(Command::TempRead, Params::Byte(41));
        replies.insert(Command::VinRead, Params::from_values(&[7400]));
        replies.insert(Command::AngleLimitRead, Params::pair(100, 900));
        replies.insert(Command::VinLimitRead, Params::pair(4500, 12_000));
        replies.insert(Command::TempMaxLimitRead, Params::Byte(85));
        replies.insert(Command::LoadOrUnloadRead, Params::Byte(1));
        replies.insert(Command::IdRead, Params::Byte(1));
        replies.insert(Command::MoveTimeRead, Params::pair(500, 1000));
        let (servo, _port) = servo_with_replies(replies);

        assert_eq!(servo.get_position(1).unwrap(), 612);
        assert_eq!(servo.get_temperature(1).unwrap(), 41);
        assert_eq!(servo.get_vin(1).unwrap(), 7400);
        assert_eq!(servo.get_position_limit(1).unwrap(), (100, 900));
        assert_eq!(servo.get_vin_limit(1).unwrap(), (4500, 12_000));
        assert_eq!(servo.get_thermal_limit(1).unwrap(), 85);
        assert!(servo.get_load_state(1).unwrap());
        assert_eq!(servo.get_id(None).unwrap(), 1);
        assert_eq!(servo.get_move_time(1).unwrap(), (500, 1000));
    }

    #[test]
    fn test_wrong_shape_reply_is_retried() {
        let port = MockSerialPort::new();
        let mut calls = 0;
        port.set_responder(move |request| {
            let frame = ServoFrame::parse(request).ok()?;
            calls += 1;
            // 前两次分别回无参数帧和一对值，第三次才是正确的单值
            let params = match calls {
                1 => Params::None,
                2 => Params::pair(1, 2),
                _ => Params::from_values(&[612]),
            };
            Some(ServoFrame::new(frame.id, frame.command, params).encode().ok()?.to_vec())
        });
        let transport = SerialTransport::new(
            port.clone(),
            Arc::new(MockDigitalPort::new()),
            fast_transport_config(),
        )
        .unwrap();
        let servo = SerialServo::new(Arc::new(transport));

        assert_eq!(servo.get_position(1).unwrap(), 612);
        assert_eq!(port.write_count(), 3);
        assert_eq!(servo.transport().stats().discarded_responses, 2);
    }

    #[test]
    fn test_wrong_shape_until_budget_is_timeout() {
        let mut replies = HashMap::new();
        replies.insert(Command::VinLimitRead, Params::from_values(&[4500]));
        let (servo, port) = servo_with_replies(replies);

        let err = servo.get_vin_limit(1).unwrap_err();
        assert!(err.is_timeout());
        assert!(!err.is_validation());
        assert_eq!(port.write_count(), 5);
    }

    #[test]
    fn test_unshaped_reply_is_protocol_error() {
        let err = expect_pair(Command::MoveStop, Response::Value(3)).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Driver(DriverError::Protocol(ProtocolError::ShapeMismatch {
                command: 12,
                expected: ResponseShape::ValuePair,
                actual: ResponseShape::Value,
            }))
        ));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_command_direction_checked_before_io() {
        let (servo, port) = silent_servo();
        assert!(
            servo
                .send(1, Command::PosRead, Params::None)
                .unwrap_err()
                .is_validation()
        );
        assert!(servo.query(1, Command::MoveTimeWrite).unwrap_err().is_validation());
        assert!(
            servo
                .query_with_retries(1, Command::MoveStop, 3)
                .unwrap_err()
                .is_validation()
        );
        assert_eq!(port.write_count(), 0);
    }

    #[test]
    fn test_get_id_uses_broadcast() {
        let mut replies = HashMap::new();
        replies.insert(Command::IdRead, Params::Byte(7));
        let (servo, port) = servo_with_replies(replies);
        servo.get_id(None).unwrap();
        assert_eq!(port.written()[0], vec![0x55, 0x55, 0xFE, 0x03, 0x0E, 0xF0]);
    }

    #[test]
    fn test_get_times_out_with_default_budget() {
        let (servo, port) = silent_servo();
        let err = servo.get_temperature(4).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(port.write_count(), 5);
    }

    #[test]
    fn test_query_with_explicit_retries() {
        let (servo, port) = silent_servo();
        assert!(servo.query_with_retries(4, Command::VinRead, 2).is_err());
        assert_eq!(port.write_count(), 2);
    }

    #[test]
    fn test_limits_sent_to_addressed_servo() {
        let (servo, port) = silent_servo();
        servo.set_thermal_limit(6, 80).unwrap();
        let frame = last_frame(&port);
        assert_eq!(frame.id, 6);
        assert_eq!(frame.params, Params::Byte(80));

        servo.set_position_limit(6, 100, 900).unwrap();
        assert_eq!(last_frame(&port).params, Params::pair(100, 900));
        assert!(servo.set_position_limit(6, 900, 100).is_err());
        assert!(servo.set_position_limit(6, 0, 1200).is_err());

        servo.set_vin_limit(6, 4500, 12_000).unwrap();
        assert_eq!(last_frame(&port).command, Command::VinLimitWrite);
        assert_eq!(port.write_count(), 3);
    }

    #[test]
    fn test_motor_mode_round_trip() {
        let mut replies = HashMap::new();
        replies.insert(Command::OrMotorModeRead, Params::pair(1, (-300i16) as u16));
        let (servo, port) = servo_with_replies(replies);

        servo
            .set_motor_mode(2, ServoMode::Motor { speed: -300 })
            .unwrap();
        let bytes = port.written()[0].clone();
        assert_eq!(&bytes[5..9], &[0x01, 0x00, 0xD4, 0xFE]);

        assert_eq!(
            servo.get_motor_mode(2).unwrap(),
            ServoMode::Motor { speed: -300 }
        );
        assert!(
            servo
                .set_motor_mode(2, ServoMode::Motor { speed: 1001 })
                .is_err()
        );
    }

    #[test]
    fn test_load_unload_and_led() {
        let (servo, port) = silent_servo();
        servo.unload(1).unwrap();
        assert_eq!(last_frame(&port).params, Params::Byte(0));
        servo.load(1).unwrap();
        assert_eq!(last_frame(&port).params, Params::Byte(1));
        servo.set_led(1, false).unwrap();
        assert_eq!(last_frame(&port).params, Params::Byte(1));
        assert!(servo.set_led_error_mask(1, 8).is_err());
    }

    #[test]
    fn test_reset_all_sequence() {
        let (servo, port) = silent_servo();
        servo.reset_all(5).unwrap();

        let frames: Vec<ServoFrame> = port
            .written()
            .iter()
            .map(|b| ServoFrame::parse(b).unwrap())
            .collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, Command::AngleOffsetAdjust);
        assert_eq!(frames[0].params, Params::Byte(0));
        assert_eq!(frames[1].command, Command::MoveTimeWrite);
        assert_eq!(frames[1].params, Params::pair(500, 1000));
    }

    #[test]
    fn test_recover_line() {
        let (servo, port) = silent_servo();
        servo.recover_line().unwrap();
        assert_eq!(port.close_count(), 1);
        assert_eq!(port.open_count(), 1);
    }
}
