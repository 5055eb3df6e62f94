use std::time::Duration;

use gym_config::GymConfig;
use serial_test::serial;
use utils::EnvVarGuard;

#[test]
#[serial(config_env)]
fn test_defaults_without_environment() {
    let _g1 = EnvVarGuard::remove("RTC_GYM_CALL_PORT_POOL_SIZE");
    let _g2 = EnvVarGuard::remove("RTC_GYM_STATS_SHORT_WINDOW_MS");

    let config = GymConfig::new();
    assert_eq!(config.call.port_pool_size, 10);
    assert_eq!(config.call.sender_start_delay, Duration::from_secs(3));
    assert_eq!(config.call.exit_timeout, Duration::from_secs(35));
    assert_eq!(config.call.dest_ip, "127.0.0.1");
    assert_eq!(config.stats.short_window_ms, 60);
    assert_eq!(config.long_window_ms(), 600);
    assert_eq!(config.stats.sequence_number_bits, 16);
    assert_eq!(config.engine.min_bandwidth_bps, 300_000.0);
    assert_eq!(config.engine.max_bandwidth_bps, 6_000_000.0);
    assert_eq!(config.engine.seed, None);
    assert_eq!(config.log.prefix, "rtc_gym");
}

#[test]
#[serial(config_env)]
fn test_environment_overrides_by_group() {
    let _g1 = EnvVarGuard::set("RTC_GYM_CALL_PORT_POOL_SIZE", "4");
    let _g2 = EnvVarGuard::set("RTC_GYM_CALL_EXIT_TIMEOUT", "2s");
    let _g3 = EnvVarGuard::set("RTC_GYM_STATS_SHORT_WINDOW_MS", "100");
    let _g4 = EnvVarGuard::set("RTC_GYM_ENGINE_SEED", "7");
    let _g5 = EnvVarGuard::set("RTC_GYM_LOG_FORMAT", "json");

    let config = GymConfig::new();
    assert_eq!(config.call.port_pool_size, 4);
    assert_eq!(config.call.exit_timeout, Duration::from_secs(2));
    assert_eq!(config.stats.short_window_ms, 100);
    assert_eq!(config.long_window_ms(), 1000);
    assert_eq!(config.engine.seed, Some(7));
    assert_eq!(config.log.format.as_deref(), Some("json"));
}

#[test]
#[serial(config_env)]
fn test_unparsable_override_keeps_default() {
    let _g = EnvVarGuard::set("RTC_GYM_CALL_PORT_MIN", "not-a-port");

    let config = GymConfig::new();
    assert_eq!(config.call.port_min, 1024);
}
