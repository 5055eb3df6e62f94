use std::time::Duration;

crate::config_group!({

    /// Number of ports drawn into the port pool at startup.
    ///
    /// The default value is 10.
    ///
    /// Use the environment variable `RTC_GYM_CALL_PORT_POOL_SIZE` to set this value.
    ref port_pool_size: usize = 10;

    /// Lowest port considered when drawing the port pool.
    ///
    /// The default value is 1024.
    ///
    /// Use the environment variable `RTC_GYM_CALL_PORT_MIN` to set this value.
    ref port_min: u16 = 1024;

    /// Highest port considered when drawing the port pool.
    ///
    /// The default value is 65535.
    ///
    /// Use the environment variable `RTC_GYM_CALL_PORT_MAX` to set this value.
    ref port_max: u16 = 65535;

    /// Random draws allowed before giving up on filling the port pool.
    ///
    /// The default value is 10000.
    ///
    /// Use the environment variable `RTC_GYM_CALL_PORT_DRAW_ATTEMPTS` to set this value.
    ref port_draw_attempts: usize = 10000;

    /// Delay between starting the receiver and starting the sender, so the receiver can bind.
    ///
    /// The default value is 3s.
    ///
    /// Use the environment variable `RTC_GYM_CALL_SENDER_START_DELAY` to set this value.
    ref sender_start_delay: Duration = Duration::from_secs(3);

    /// How long to wait for both processes to exit once the receiver stream has ended.
    ///
    /// The default value is 35s.
    ///
    /// Use the environment variable `RTC_GYM_CALL_EXIT_TIMEOUT` to set this value.
    ref exit_timeout: Duration = Duration::from_secs(35);

    /// Upper bound on the whole call, after which both process trees are killed.
    ///
    /// The default value is 10min.
    ///
    /// Use the environment variable `RTC_GYM_CALL_EPISODE_TIMEOUT` to set this value.
    ref episode_timeout: Duration = Duration::from_secs(10 * 60);

    /// Interval between liveness checks while supervising the call processes.
    ///
    /// The default value is 50ms.
    ///
    /// Use the environment variable `RTC_GYM_CALL_POLL_INTERVAL` to set this value.
    ref poll_interval: Duration = Duration::from_millis(50);

    /// Destination IP handed to both peers.
    ///
    /// The default value is "127.0.0.1".
    ///
    /// Use the environment variable `RTC_GYM_CALL_DEST_IP` to set this value.
    ref dest_ip: String = "127.0.0.1".to_string();

    /// The peer connection binary, relative to the base path unless absolute.
    ///
    /// The default value is "peerconnection_serverless.r3net".
    ///
    /// Use the environment variable `RTC_GYM_CALL_CALL_APP` to set this value.
    ref call_app: String = "peerconnection_serverless.r3net".to_string();

    /// The trace-shaping wrapper the sender runs under. Empty runs the sender unshaped.
    ///
    /// The default value is "mm-link".
    ///
    /// Use the environment variable `RTC_GYM_CALL_SHAPING_TOOL` to set this value.
    ref shaping_tool: String = "mm-link".to_string();

    /// Video resolution tag selecting `receiver_<res>.json` and `sender_<res>.json`.
    ///
    /// The default value is "360p".
    ///
    /// Use the environment variable `RTC_GYM_CALL_VIDEO_RES` to set this value.
    ref video_res: String = "360p".to_string();

});
