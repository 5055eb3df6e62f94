pub mod groups;
pub mod macros;

// Re-exported for use inside `config_group!` expansions.
pub use utils::configuration_utils::ParsableConfigValue;

/// Prefix shared by every configuration environment variable.
pub const ENV_PREFIX: &str = "RTC_GYM_";

/// `RTC_GYM_<GROUP>_<FIELD>`, where the group is the last segment of `module_path`.
pub fn env_var_name(module_path: &str, field: &str) -> String {
    let group = module_path.rsplit("::").next().unwrap_or_default();
    format!("{ENV_PREFIX}{}_{}", group.to_uppercase(), field.to_uppercase())
}

/// All configuration groups of the gym, each loaded from `RTC_GYM_<GROUP>_<FIELD>`.
#[derive(Debug, Clone, Default)]
pub struct GymConfig {
    pub stats: groups::stats::ConfigValueGroup,
    pub call: groups::call::ConfigValueGroup,
    pub engine: groups::engine::ConfigValueGroup,
    pub log: groups::log::ConfigValueGroup,
}

impl GymConfig {
    /// Defaults with environment overrides applied.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.stats.apply_env_overrides();
        config.call.apply_env_overrides();
        config.engine.apply_env_overrides();
        config.log.apply_env_overrides();
        config
    }

    /// The long statistics horizon derived from the short one.
    pub fn long_window_ms(&self) -> u64 {
        self.stats.short_window_ms * self.stats.long_window_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name_uses_last_module_segment() {
        assert_eq!(env_var_name("gym_config::groups::call", "dest_ip"), "RTC_GYM_CALL_DEST_IP");
        assert_eq!(env_var_name("stats", "history_len"), "RTC_GYM_STATS_HISTORY_LEN");
    }
}
