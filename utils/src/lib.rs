pub mod configuration_utils;
pub use configuration_utils::ParsableConfigValue;

mod exp_weighted_moving_avg;
pub use exp_weighted_moving_avg::ExpWeightedMovingAvg;

mod guards;
pub use guards::EnvVarGuard;
