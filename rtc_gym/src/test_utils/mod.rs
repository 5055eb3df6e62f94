mod fake_gym;

#[cfg(all(test, unix))]
pub use fake_gym::{FakeGym, SHORT_SENDER, SILENT_RECEIVER, chatty_receiver};
