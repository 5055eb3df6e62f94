crate::config_group!({

    /// The short statistics horizon, roughly one control interval, in milliseconds.
    ///
    /// The default value is 60.
    ///
    /// Use the environment variable `RTC_GYM_STATS_SHORT_WINDOW_MS` to set this value.
    ref short_window_ms: u64 = 60;

    /// The long horizon is this multiple of the short one.
    ///
    /// The default value is 10.
    ///
    /// Use the environment variable `RTC_GYM_STATS_LONG_WINDOW_MULTIPLIER` to set this value.
    ref long_window_multiplier: u64 = 10;

    /// Bit width of the RTP sequence number space used for wraparound handling.
    ///
    /// The default value is 16.
    ///
    /// Use the environment variable `RTC_GYM_STATS_SEQUENCE_NUMBER_BITS` to set this value.
    ref sequence_number_bits: u32 = 16;

    /// Delay assigned to the first packet of an episode; later delays are relative to it.
    ///
    /// The default value is 0.
    ///
    /// Use the environment variable `RTC_GYM_STATS_BASE_DELAY_MS` to set this value.
    ref base_delay_ms: i64 = 0;

    /// Number of samples kept in the state vector history.
    ///
    /// The default value is 20.
    ///
    /// Use the environment variable `RTC_GYM_STATS_HISTORY_LEN` to set this value.
    ref history_len: usize = 20;

});
