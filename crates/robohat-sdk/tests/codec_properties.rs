//! 帧编解码属性测试

use proptest::prelude::*;
use robohat_sdk::protocol::{
    Command, MAX_SERVO_ID, Params, ProtocolError, Response, ServoFrame, checksum, decode_response,
};

const ALL_CODES: [u8; 28] = [
    1, 2, 7, 8, 11, 12, 13, 14, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32,
    33, 34, 35, 36,
];

fn command_strategy() -> impl Strategy<Value = Command> {
    prop::sample::select(ALL_CODES.to_vec()).prop_map(|code| Command::try_from(code).unwrap())
}

fn params_strategy() -> impl Strategy<Value = Params> {
    prop_oneof![
        Just(Params::None),
        any::<u8>().prop_map(Params::Byte),
        prop::collection::vec(any::<u16>(), 1..=4)
            .prop_map(|words| Params::Words(words.into_iter().collect())),
    ]
}

proptest! {
    #[test]
    fn encode_then_parse_is_identity(
        id in 0..=MAX_SERVO_ID,
        command in command_strategy(),
        params in params_strategy(),
    ) {
        let frame = ServoFrame::new(id, command, params);
        let bytes = frame.encode().unwrap();
        prop_assert_eq!(ServoFrame::parse(&bytes).unwrap(), frame);
    }

    #[test]
    fn checksum_complements_body(
        id in 0..=MAX_SERVO_ID,
        command in command_strategy(),
        params in params_strategy(),
    ) {
        let bytes = ServoFrame::new(id, command, params).encode().unwrap();
        let body = &bytes[2..bytes.len() - 1];
        let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        prop_assert_eq!(sum.wrapping_add(bytes[bytes.len() - 1]), 0xFF);
        prop_assert_eq!(checksum(body), bytes[bytes.len() - 1]);
        prop_assert_eq!(bytes[3] as usize, bytes.len() - 3);
    }

    #[test]
    fn small_single_value_is_one_byte(value in 0u16..=255) {
        prop_assert_eq!(Params::from_values(&[value]), Params::Byte(value as u8));
    }

    #[test]
    fn value_pairs_decode(first in any::<u16>(), second in any::<u16>()) {
        let reply = ServoFrame::new(1, Command::AngleLimitRead, Params::pair(first, second))
            .encode()
            .unwrap();
        prop_assert_eq!(
            decode_response(&reply, Command::AngleLimitRead).unwrap(),
            Response::ValuePair(first as i16, second as i16)
        );
    }

    #[test]
    fn truncated_replies_never_decode(cut in 1usize..7) {
        let reply = ServoFrame::new(1, Command::PosRead, Params::from_values(&[700]))
            .encode()
            .unwrap();
        let short = &reply[..reply.len() - cut];
        prop_assert!(decode_response(short, Command::PosRead).is_err());
    }

    #[test]
    fn corrupted_byte_rejected(index in 2usize..8, flip in 1u8..=255) {
        let mut reply = ServoFrame::new(3, Command::VinRead, Params::from_values(&[7400]))
            .encode()
            .unwrap()
            .to_vec();
        reply[index] ^= flip;
        prop_assert!(decode_response(&reply, Command::VinRead).is_err());
    }
}

#[test]
fn move_time_write_example_frame() {
    let bytes = ServoFrame::new(1, Command::MoveTimeWrite, Params::pair(500, 1000))
        .encode()
        .unwrap();
    // 0x01 + 0x07 + 0x01 + 0xF4 + 0x01 + 0xE8 + 0x03 = 489；489 mod 256 = 233；255 - 233 = 22
    assert_eq!(
        bytes.as_slice(),
        &[0x55, 0x55, 0x01, 0x07, 0x01, 0xF4, 0x01, 0xE8, 0x03, 0x16]
    );
}

#[test]
fn wrong_command_in_reply() {
    let reply = ServoFrame::new(1, Command::TempRead, Params::Byte(40))
        .encode()
        .unwrap();
    assert!(matches!(
        decode_response(&reply, Command::VinRead),
        Err(ProtocolError::CommandMismatch {
            expected: 27,
            actual: 26
        })
    ));
}
