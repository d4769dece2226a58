use super::*;
use clap::Parser;
use time::macros::offset;

#[derive(Parser)]
struct TestCli {
    #[command(flatten)]
    config: ConfigArgs,
}

fn args(overrides: &[&str]) -> ConfigArgs {
    let argv = std::iter::once("test").chain(overrides.iter().copied());
    TestCli::try_parse_from(argv).unwrap().config
}

#[test]
fn explicit_flags_override_defaults() {
    let cfg = DashboardConfig::from_args(&args(&[
        "--backend-url",
        "https://monitor.example.test/",
        "--refresh-interval-secs",
        "12",
        "--request-timeout-secs",
        "42",
        "--connect-timeout-secs",
        "7",
        "--utc-offset",
        "+09:00",
        "--log-level",
        "DEBUG",
    ]))
    .unwrap();

    assert_eq!(cfg.backend_url, "https://monitor.example.test");
    assert_eq!(cfg.refresh_interval, Duration::from_secs(12));
    assert_eq!(cfg.timeouts, ApiTimeouts { request: Duration::from_secs(42), connect: Duration::from_secs(7) });
    assert_eq!(cfg.utc_offset, offset!(+9));
    assert_eq!(cfg.log_level, Level::DEBUG);
}

#[test]
fn zero_interval_is_accepted() {
    let cfg = DashboardConfig::from_args(&args(&["--refresh-interval-secs", "0"])).unwrap();
    assert!(cfg.refresh_interval.is_zero());
}

#[test]
fn rejects_non_http_backend_url() {
    let err = DashboardConfig::from_args(&args(&["--backend-url", "ftp://example.test"])).unwrap_err();
    assert_eq!(err, ConfigError::InvalidBackendUrl("ftp://example.test".into()));

    let err = DashboardConfig::from_args(&args(&["--backend-url", "http://"])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBackendUrl(_)));
}

#[test]
fn rejects_unknown_log_level() {
    let err = DashboardConfig::from_args(&args(&["--log-level", "trace"])).unwrap_err();
    assert_eq!(err, ConfigError::InvalidLogLevel("trace".into()));
}

#[test]
fn utc_offset_accepts_signed_hours_and_z() {
    assert_eq!(parse_utc_offset("Z").unwrap(), UtcOffset::UTC);
    assert_eq!(parse_utc_offset("+00:00").unwrap(), UtcOffset::UTC);
    assert_eq!(parse_utc_offset("-05:30").unwrap(), offset!(-5:30));
    assert_eq!(parse_utc_offset("+09:00").unwrap(), offset!(+9));
}

#[test]
fn utc_offset_rejects_malformed_values() {
    for raw in ["9", "09:00", "+9", "+09", "JST", ""] {
        assert!(parse_utc_offset(raw).is_err(), "{raw} should be rejected");
    }
}

#[test]
fn negative_offset_flag_is_not_taken_for_an_option() {
    let cfg = DashboardConfig::from_args(&args(&["--utc-offset", "-03:00"])).unwrap();
    assert_eq!(cfg.utc_offset, offset!(-3));
}
