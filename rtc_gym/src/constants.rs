// Line protocol
pub const REQUEST_BANDWIDTH_COMMAND: &str = "RequestBandwidth";

// The current version of executable
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROGRAM_NAME: &str = "rtc-gym";

// Environment variable names
pub const EMU_GYM_PATH_ENV: &str = "EMU_GYM_PATH";

// Layout under the base path
pub const TRAINING_DIR: &str = "rl_training";
pub const TRACES_DIR: &str = "traces";
pub const SIMPLE_TRACE: &str = "300kbps";
pub const CHECKPOINTS_DIR: &str = "checkpoints";
pub const EPISODES_DIR: &str = "episodes";

// Per-episode files
pub const PORT_FILE_NAME: &str = "port.txt";
pub const RECEIVER_LOG_NAME: &str = "receiver.log";
pub const SENDER_LOG_NAME: &str = "sender.log";
