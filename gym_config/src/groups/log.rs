crate::config_group!({

    /// The log destination. By default, logs go to the dated directory under
    /// `$EMU_GYM_PATH/rl_training/logs`, or to the console when no base path is known.
    ///
    /// If this path exists as a directory or the path ends with a /, then logs will be written into that directory.
    /// If it is given but empty, then logs are dumped to the console.
    ///
    /// The default value is None.
    ///
    /// Use the environment variable `RTC_GYM_LOG_DEST` to set this value.
    ref dest: Option<String> = None;

    /// The format the logs are printed in. If "json", then logs are dumped as json blobs; otherwise they
    /// are treated as text. By default logging to files is done in json and console logging is done with text.
    ///
    /// The default value is None.
    ///
    /// Use the environment variable `RTC_GYM_LOG_FORMAT` to set this value.
    ref format: Option<String> = None;

    /// The base name for a log file when logging to a directory. The timestamp and pid are appended to this
    /// name to form the log file.
    ///
    /// The default value is "rtc_gym".
    ///
    /// Use the environment variable `RTC_GYM_LOG_PREFIX` to set this value.
    ref prefix: String = "rtc_gym".to_string();

});
