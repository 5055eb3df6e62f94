crate::config_group!({

    /// Lower end of the bandwidth range an action maps to, in bits per second.
    ///
    /// The default value is 300000.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_MIN_BANDWIDTH_BPS` to set this value.
    ref min_bandwidth_bps: f64 = 300_000.0;

    /// Upper end of the bandwidth range an action maps to, in bits per second.
    ///
    /// The default value is 6000000.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_MAX_BANDWIDTH_BPS` to set this value.
    ref max_bandwidth_bps: f64 = 6_000_000.0;

    /// Estimate in effect before the first request of an episode.
    ///
    /// The default value is 300000.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_INITIAL_BANDWIDTH_BPS` to set this value.
    ref initial_bandwidth_bps: f64 = 300_000.0;

    /// Delay normalization floor in milliseconds.
    ///
    /// The default value is 1.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_MIN_RTT_MS` to set this value.
    ref min_rtt_ms: f64 = 1.0;

    /// Delay normalization ceiling in milliseconds.
    ///
    /// The default value is 3000.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_MAX_RTT_MS` to set this value.
    ref max_rtt_ms: f64 = 3000.0;

    /// Step size of learned policy updates.
    ///
    /// The default value is 0.01.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_LEARNING_RATE` to set this value.
    ref learning_rate: f64 = 0.01;

    /// Standard deviation of the Gaussian exploration noise for continuous actions.
    ///
    /// The default value is 0.1.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_EXPLORATION_STD` to set this value.
    ref exploration_std: f64 = 0.1;

    /// Probability of a random rung for discrete actions in train mode.
    ///
    /// The default value is 0.1.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_EPSILON` to set this value.
    ref epsilon: f64 = 0.1;

    /// Transitions collected by on-policy algorithms before each update.
    ///
    /// The default value is 32.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_ROLLOUT_LEN` to set this value.
    ref rollout_len: usize = 32;

    /// Maximum transitions retained by off-policy algorithms.
    ///
    /// The default value is 10000.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_REPLAY_CAPACITY` to set this value.
    ref replay_capacity: usize = 10_000;

    /// Minibatch size of off-policy updates.
    ///
    /// The default value is 16.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_BATCH_SIZE` to set this value.
    ref batch_size: usize = 16;

    /// Seed for exploration; drawn from the OS when unset.
    ///
    /// The default value is None.
    ///
    /// Use the environment variable `RTC_GYM_ENGINE_SEED` to set this value.
    ref seed: Option<u64> = None;

});
