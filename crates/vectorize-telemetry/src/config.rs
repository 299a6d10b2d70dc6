//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log filter directives (`info`, `vectorize=debug`, ...)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "vectorize".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: vectorize)
    /// - `VECTORIZE_LOG_LEVEL` or `RUST_LOG`: Filter directives (default: info)
    /// - `VECTORIZE_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "vectorize".to_string()),

            log_level: env::var("VECTORIZE_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("VECTORIZE_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "OTEL_SERVICE_NAME",
        "VECTORIZE_LOG_LEVEL",
        "RUST_LOG",
        "VECTORIZE_JSON_LOGS",
        "KUBERNETES_SERVICE_HOST",
        "DOCKER_CONTAINER",
    ];

    /// Run `f` with exactly `vars` set among the telemetry variables.
    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let saved: Vec<_> = VARS.iter().map(|k| (*k, env::var(k).ok())).collect();
        for key in VARS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let out = f();
        for (key, value) in saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
        out
    }

    #[test]
    fn test_config_from_env() {
        let config = with_env(
            &[
                ("OTEL_SERVICE_NAME", "kernels"),
                ("VECTORIZE_LOG_LEVEL", "vectorize=debug"),
                ("RUST_LOG", "warn"),
                ("VECTORIZE_JSON_LOGS", "1"),
            ],
            TelemetryConfig::from_env,
        );
        assert_eq!(config.service_name, "kernels");
        assert_eq!(config.log_level, "vectorize=debug");
        assert!(config.json_logs);
    }

    #[test]
    fn test_log_level_falls_back_to_rust_log() {
        let config = with_env(&[("RUST_LOG", "warn")], TelemetryConfig::from_env);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_config_from_env_defaults_when_unset() {
        let config = with_env(&[], TelemetryConfig::from_env);
        assert_eq!(config, TelemetryConfig::default());
    }

    #[test]
    fn test_json_logs_default_on_in_containers() {
        let config = with_env(&[("DOCKER_CONTAINER", "1")], TelemetryConfig::from_env);
        assert!(config.json_logs);

        let config = with_env(
            &[
                ("KUBERNETES_SERVICE_HOST", "10.0.0.1"),
                ("VECTORIZE_JSON_LOGS", "false"),
            ],
            TelemetryConfig::from_env,
        );
        assert!(!config.json_logs);
    }

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "vectorize");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_builders() {
        let config = TelemetryConfig::default()
            .with_log_level("vectorize=trace")
            .with_json_logs(true);
        assert_eq!(config.log_level, "vectorize=trace");
        assert!(config.json_logs);
    }
}
