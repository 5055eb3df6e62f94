use std::env;
use std::ffi::OsStr;

/// Sets an environment variable for the lifetime of the guard and restores the previous
/// value (or removes the variable) on drop.
///
/// Environment mutation is process-global, so tests using this guard should be marked
/// `#[serial]`.
///
/// ```no_run
/// use utils::EnvVarGuard;
///
/// let _guard = EnvVarGuard::set("EMU_GYM_PATH", "/tmp/gym");
/// ```
pub struct EnvVarGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvVarGuard {
    pub fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
        let prev = env::var(key).ok();
        unsafe {
            env::set_var(key, value);
        }
        Self { key, prev }
    }

    pub fn remove(key: &'static str) -> Self {
        let prev = env::var(key).ok();
        unsafe {
            env::remove_var(key);
        }
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => unsafe {
                env::set_var(self.key, v);
            },
            None => unsafe {
                env::remove_var(self.key);
            },
        }
    }
}
