use crate::pdf::ClassifierThresholds;
use serde::Deserialize;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_data_dir")]
    pub data_dir: String,
    #[serde(default = "crate::config::defaults::default_storage_quota_bytes")]
    pub storage_quota_bytes: Option<u64>,
    #[serde(default = "crate::config::defaults::default_wpm")]
    pub default_wpm: u32,
    #[serde(default = "crate::config::defaults::default_min_wpm")]
    pub min_wpm: u32,
    #[serde(default = "crate::config::defaults::default_max_wpm")]
    pub max_wpm: u32,
    #[serde(default = "crate::config::defaults::default_wpm_step")]
    pub wpm_step: u32,
    #[serde(default = "crate::config::defaults::default_skip_count")]
    pub skip_count: usize,
    #[serde(default = "crate::config::defaults::default_progress_save_interval_ms")]
    pub progress_save_interval_ms: u64,
    #[serde(default = "crate::config::defaults::default_max_logged_sessions")]
    pub max_logged_sessions: usize,
    #[serde(default = "crate::config::defaults::default_reading_mode")]
    pub default_mode: ReadingMode,
    #[serde(default = "crate::config::defaults::default_anchor_column")]
    pub anchor_column: usize,
    #[serde(default)]
    pub classifier: ClassifierThresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        use crate::config::defaults;
        AppConfig {
            log_level: defaults::default_log_level(),
            data_dir: defaults::default_data_dir(),
            storage_quota_bytes: defaults::default_storage_quota_bytes(),
            default_wpm: defaults::default_wpm(),
            min_wpm: defaults::default_min_wpm(),
            max_wpm: defaults::default_max_wpm(),
            wpm_step: defaults::default_wpm_step(),
            skip_count: defaults::default_skip_count(),
            progress_save_interval_ms: defaults::default_progress_save_interval_ms(),
            max_logged_sessions: defaults::default_max_logged_sessions(),
            default_mode: defaults::default_reading_mode(),
            anchor_column: defaults::default_anchor_column(),
            classifier: ClassifierThresholds::default(),
        }
    }
}

impl AppConfig {
    /// Keep the WPM bounds ordered and the default inside them, whatever the
    /// file said.
    pub fn normalized(mut self) -> Self {
        if self.min_wpm == 0 {
            self.min_wpm = 1;
        }
        if self.max_wpm < self.min_wpm {
            self.max_wpm = self.min_wpm;
        }
        self.default_wpm = self.default_wpm.clamp(self.min_wpm, self.max_wpm);
        self.wpm_step = self.wpm_step.max(1);
        self.max_logged_sessions = self.max_logged_sessions.max(1);
        self
    }
}

/// How the book is being presented.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadingMode {
    #[default]
    Rsvp,
    Traditional,
}

impl std::fmt::Display for ReadingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReadingMode::Rsvp => "rsvp",
            ReadingMode::Traditional => "traditional",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for ReadingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rsvp" => Ok(ReadingMode::Rsvp),
            "traditional" | "scroll" => Ok(ReadingMode::Traditional),
            other => Err(format!("unknown reading mode: {other}")),
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
