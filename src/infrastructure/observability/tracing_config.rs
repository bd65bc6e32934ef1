const DEFAULT_DIRECTIVES: &str = "info,vidgen=debug,tower_http=debug";

/// Configuration for tracing initialization.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
    /// Used when `RUST_LOG` is unset.
    pub default_directives: String,
}

impl TracingConfig {
    pub fn new(environment: impl Into<String>, json_format: bool, level: Option<&str>) -> Self {
        Self {
            environment: environment.into(),
            json_format,
            default_directives: level
                .filter(|l| !l.trim().is_empty())
                .map_or_else(|| DEFAULT_DIRECTIVES.to_string(), str::to_string),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            environment: std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".to_string()),
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            default_directives: DEFAULT_DIRECTIVES.to_string(),
        }
    }
}
