//! Bridge configuration.

use std::env;

use serde::{Deserialize, Serialize};

use crate::core::DispatchSettings;

/// Environment variable prefix read by [`BridgeConfig::from_env`].
pub const ENV_PREFIX: &str = "BRIDGE_";

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Worker threads of the parallel runtime.
    pub worker_threads: usize,
    /// Worker threads of the interactive runtime; 0 disables it.
    pub interactive_threads: usize,
    /// Run a single-threaded runtime on its own thread for `scheduleasync_local`.
    pub local_pool: bool,
    /// Name of the dispatch worker thread.
    pub dispatch_thread_name: String,
    /// Stack size of the dispatch worker thread in bytes.
    pub dispatch_stack_size: usize,
    /// Initial value of the color flag.
    pub color: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let dispatch = DispatchSettings::default();
        Self {
            worker_threads: num_cpus::get(),
            interactive_threads: 0,
            local_pool: true,
            dispatch_thread_name: dispatch.thread_name,
            dispatch_stack_size: dispatch.stack_size,
            color: false,
        }
    }
}

impl BridgeConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parallel runtime's worker thread count.
    #[must_use]
    pub const fn with_worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    /// Set the interactive runtime's worker thread count (0 disables it).
    #[must_use]
    pub const fn with_interactive_threads(mut self, n: usize) -> Self {
        self.interactive_threads = n;
        self
    }

    /// Enable or disable the single-threaded local pool.
    #[must_use]
    pub const fn with_local_pool(mut self, enabled: bool) -> Self {
        self.local_pool = enabled;
        self
    }

    /// Set the dispatch thread's name.
    #[must_use]
    pub fn with_dispatch_thread_name(mut self, name: impl Into<String>) -> Self {
        self.dispatch_thread_name = name.into();
        self
    }

    /// Set the dispatch thread's stack size.
    #[must_use]
    pub const fn with_dispatch_stack_size(mut self, bytes: usize) -> Self {
        self.dispatch_stack_size = bytes;
        self
    }

    /// Set the initial color flag.
    #[must_use]
    pub const fn with_color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    /// Settings for the dispatch worker.
    #[must_use]
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            thread_name: self.dispatch_thread_name.clone(),
            stack_size: self.dispatch_stack_size,
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_threads == 0 {
            return Err("worker_threads must be greater than 0".into());
        }
        if self.dispatch_thread_name.trim().is_empty() {
            return Err("dispatch_thread_name must not be empty".into());
        }
        if self.dispatch_stack_size < 64 * 1024 {
            return Err("dispatch_stack_size must be at least 65536 bytes".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `BRIDGE_*` environment variables, loading `.env` first.
    ///
    /// Recognised: `BRIDGE_WORKER_THREADS`, `BRIDGE_INTERACTIVE_THREADS`,
    /// `BRIDGE_LOCAL_POOL`, `BRIDGE_DISPATCH_THREAD_NAME`, `BRIDGE_DISPATCH_STACK_SIZE`, `BRIDGE_COLOR`.
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or a validation message.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary `BRIDGE_*` lookup.
    ///
    /// # Errors
    ///
    /// Same as [`BridgeConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(v) = var("WORKER_THREADS") {
            cfg.worker_threads = parse_var("WORKER_THREADS", &v)?;
        }
        if let Some(v) = var("INTERACTIVE_THREADS") {
            cfg.interactive_threads = parse_var("INTERACTIVE_THREADS", &v)?;
        }
        if let Some(v) = var("LOCAL_POOL") {
            cfg.local_pool = parse_var("LOCAL_POOL", &v)?;
        }
        if let Some(v) = var("DISPATCH_THREAD_NAME") {
            cfg.dispatch_thread_name = v;
        }
        if let Some(v) = var("DISPATCH_STACK_SIZE") {
            cfg.dispatch_stack_size = parse_var("DISPATCH_STACK_SIZE", &v)?;
        }
        if let Some(v) = var("COLOR") {
            cfg.color = parse_var("COLOR", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = BridgeConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.worker_threads > 0);
        assert_eq!(cfg.interactive_threads, 0);
        assert!(cfg.local_pool);
        assert_eq!(cfg.dispatch_thread_name, "bridge-dispatch");
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BRIDGE_WORKER_THREADS", "3"),
            ("BRIDGE_INTERACTIVE_THREADS", "1"),
            ("BRIDGE_LOCAL_POOL", "false"),
            ("BRIDGE_COLOR", "true"),
        ]
        .into_iter()
        .collect();

        let cfg = BridgeConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
        assert_eq!(cfg.worker_threads, 3);
        assert_eq!(cfg.interactive_threads, 1);
        assert!(!cfg.local_pool);
        assert!(cfg.color);
    }

    #[test]
    fn test_lookup_reports_bad_value() {
        let err = BridgeConfig::from_lookup(|k| {
            (k == "BRIDGE_WORKER_THREADS").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(err.starts_with("BRIDGE_WORKER_THREADS:"), "{err}");
    }

    #[test]
    fn test_dispatch_settings_follow_config() {
        let cfg = BridgeConfig::new()
            .with_dispatch_thread_name("ffi-dispatch")
            .with_dispatch_stack_size(512 * 1024);
        let settings = cfg.dispatch_settings();
        assert_eq!(settings.thread_name, "ffi-dispatch");
        assert_eq!(settings.stack_size, 512 * 1024);
    }
}
