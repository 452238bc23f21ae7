//! PWM 插值属性测试
//!
//! 直接驱动 `PwmChannel::tick()`，不依赖定时线程。

use proptest::prelude::*;
use robohat_sdk::driver::pwm::ticks_for_duration;
use robohat_sdk::driver::{PwmChannel, PwmConfig};
use robohat_sdk::io::mock::MockPwmDriver;
use std::sync::Arc;

const PIN: u8 = 12;

fn channel(initial: u32) -> (PwmChannel, MockPwmDriver) {
    let driver = MockPwmDriver::new();
    let config = PwmConfig {
        initial_width: initial,
        ..Default::default()
    };
    let channel = PwmChannel::new(Arc::new(driver.clone()), PIN, &config).unwrap();
    (channel, driver)
}

fn drive(channel: &PwmChannel, ticks: u32) {
    for _ in 0..ticks {
        channel.tick().unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn converges_exactly_after_ceil_ticks(
        start in 50u32..=2500,
        target in 50u32..=2500,
        duration in 20u32..=30_000,
    ) {
        let (channel, driver) = channel(start);
        channel.set_position(target, duration).unwrap();
        drive(&channel, duration.div_ceil(20));

        prop_assert_eq!(channel.position(), target);
        prop_assert!(!channel.is_moving());
        prop_assert_eq!(driver.widths(PIN).len() as u32, ticks_for_duration(duration));
        prop_assert_eq!(driver.last_width(PIN), Some(target));
    }

    #[test]
    fn every_tick_moves_toward_target(
        start in 50u32..=2500,
        target in 50u32..=2500,
        duration in 20u32..=5_000,
    ) {
        let (channel, driver) = channel(start);
        channel.set_position(target, duration).unwrap();
        drive(&channel, ticks_for_duration(duration));

        let mut previous = start;
        for width in driver.widths(PIN) {
            if target >= start {
                prop_assert!(width >= previous && width <= target);
            } else {
                prop_assert!(width <= previous && width >= target);
            }
            previous = width;
        }
    }

    #[test]
    fn short_durations_behave_like_minimum(
        start in 50u32..=2500,
        target in 50u32..=2500,
        duration in 1u32..20,
    ) {
        let (a, driver_a) = channel(start);
        let (b, driver_b) = channel(start);
        a.set_position(target, duration).unwrap();
        b.set_position(target, 20).unwrap();
        prop_assert_eq!(a.state(), b.state());

        drive(&a, 3);
        drive(&b, 3);
        prop_assert_eq!(driver_a.widths(PIN), driver_b.widths(PIN));
    }

    #[test]
    fn long_durations_behave_like_maximum(
        start in 50u32..=2500,
        target in 50u32..=2500,
        duration in 30_001u32..=120_000,
    ) {
        let (a, _) = channel(start);
        let (b, _) = channel(start);
        a.set_position(target, duration).unwrap();
        b.set_position(target, 30_000).unwrap();
        prop_assert_eq!(a.state(), b.state());
    }

    #[test]
    fn out_of_bounds_never_writes(width in prop_oneof![0u32..50, 2501u32..10_000], duration in 0u32..1000) {
        let (channel, driver) = channel(1500);
        prop_assert!(channel.set_position(width, duration).is_err());
        drive(&channel, 5);
        prop_assert!(driver.history().is_empty());
        prop_assert_eq!(channel.target(), 1500);
    }
}
