pub mod app;
pub mod call;
pub mod constants;
pub mod errors;
pub mod line_protocol;
pub mod media_config;
pub mod rtc_env;
mod test_utils;

pub use call::{Call, CallSession, EpisodeStatus, TraceType};
pub use errors::{GymError, Result};
pub use line_protocol::{BandwidthController, dispatch_loop};
pub use rtc_env::{EpisodeReport, GymController, RtcEnv};
