use std::str::FromStr;

use tracing::{Level, event, info, warn};

pub const INFORMATION_LOG_LEVEL: Level = Level::DEBUG;

/// A trait to control how a value is parsed from an environment string or other config source
/// if it's present.
pub trait ParsableConfigValue: std::fmt::Debug + Sized {
    fn parse_user_value(value: &str) -> Option<Self>;

    /// Parse the value, returning the default if it can't be parsed or the string is empty.
    /// Issue a warning if it can't be parsed.
    fn parse(variable_name: &str, value: Option<String>, default: Self) -> Self {
        match value {
            Some(v) => match Self::parse_user_value(&v) {
                Some(v) => {
                    info!("Config: {variable_name} = {v:?} (user set)");
                    v
                },
                None => {
                    warn!(
                        "Configuration value {v} for {variable_name} cannot be parsed into correct type; reverting to default."
                    );
                    info!("Config: {variable_name} = {default:?} (default due to parse error)");
                    default
                },
            },
            None => {
                event!(INFORMATION_LOG_LEVEL, "Config: {variable_name} = {default:?} (default)");
                default
            },
        }
    }
}

/// Most values work with the FromStr implementation, but we want to override the behavior for some types
/// (e.g. Option<T> and bool) to have custom parsing behavior.
pub trait FromStrParseable: FromStr + std::fmt::Debug {}

impl<T: FromStrParseable> ParsableConfigValue for T {
    fn parse_user_value(value: &str) -> Option<Self> {
        value.trim().parse::<T>().ok()
    }
}

impl FromStrParseable for usize {}
impl FromStrParseable for u8 {}
impl FromStrParseable for u16 {}
impl FromStrParseable for u32 {}
impl FromStrParseable for u64 {}
impl FromStrParseable for i32 {}
impl FromStrParseable for i64 {}
impl FromStrParseable for f64 {}
impl FromStrParseable for String {}

/// Special handling for bool:
/// - true: "1","true","yes","y","on"  -> true
/// - false: "0","false","no","n","off" -> false
pub fn parse_bool_value(value: &str) -> Option<bool> {
    let t = value.trim().to_ascii_lowercase();

    match t.as_str() {
        "0" | "false" | "no" | "n" | "off" => Some(false),
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        _ => None,
    }
}

impl ParsableConfigValue for bool {
    fn parse_user_value(value: &str) -> Option<Self> {
        parse_bool_value(value)
    }
}

/// Enable Option<T> to allow the default value to be None if nothing is set and appear as
/// Some(Value) if the user specifies the value.
impl<T: ParsableConfigValue> ParsableConfigValue for Option<T> {
    fn parse_user_value(value: &str) -> Option<Self> {
        T::parse_user_value(value).map(Some)
    }
}

/// Durations accept the suffixes understood by the duration_str crate, e.g. "50ms", "3s", "10m".
impl ParsableConfigValue for std::time::Duration {
    fn parse_user_value(value: &str) -> Option<Self> {
        duration_str::parse(value.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_parse_bool_words() {
        assert_eq!(bool::parse("X", Some("yes".to_owned()), false), true);
        assert_eq!(bool::parse("X", Some("OFF".to_owned()), true), false);
        assert_eq!(bool::parse("X", Some("maybe".to_owned()), true), true);
        assert_eq!(bool::parse("X", None, false), false);
    }

    #[test]
    fn test_parse_numbers_fall_back_to_default() {
        assert_eq!(usize::parse("X", Some("16".to_owned()), 10), 16);
        assert_eq!(usize::parse("X", Some("-3".to_owned()), 10), 10);
        assert_eq!(f64::parse("X", Some(" 0.5 ".to_owned()), 1.0), 0.5);
    }

    #[test]
    fn test_parse_option_and_duration() {
        assert_eq!(Option::<u64>::parse("X", Some("7".to_owned()), None), Some(7));
        assert_eq!(Option::<u64>::parse("X", None, None), None);
        assert_eq!(Duration::parse("X", Some("50ms".to_owned()), Duration::ZERO), Duration::from_millis(50));
        assert_eq!(Duration::parse("X", Some("3s".to_owned()), Duration::ZERO), Duration::from_secs(3));
    }
}
