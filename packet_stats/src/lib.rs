mod record;
mod seq;
mod window;

pub use record::PacketRecord;
pub use seq::SequenceUnwrapper;
pub use window::{PacketStatsWindow, WindowConfig};
