use super::defaults;
use super::models::{AppConfig, LogLevel, ReadingMode};
use crate::pdf::ClassifierThresholds;
use serde::Deserialize;

/// On-disk layout of `config.toml`: one table per concern.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    stats: StatsConfig,
    #[serde(default)]
    classifier: ClassifierThresholds,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            data_dir: tables.storage.data_dir,
            storage_quota_bytes: tables.storage.quota_bytes,
            progress_save_interval_ms: tables.storage.progress_save_interval_ms,
            default_wpm: tables.playback.default_wpm,
            min_wpm: tables.playback.min_wpm,
            max_wpm: tables.playback.max_wpm,
            wpm_step: tables.playback.wpm_step,
            skip_count: tables.playback.skip_count,
            default_mode: tables.playback.default_mode,
            anchor_column: tables.playback.anchor_column,
            max_logged_sessions: tables.stats.max_logged_sessions,
            classifier: tables.classifier,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            storage: StorageConfig {
                data_dir: config.data_dir.clone(),
                quota_bytes: config.storage_quota_bytes,
                progress_save_interval_ms: config.progress_save_interval_ms,
            },
            playback: PlaybackConfig {
                default_wpm: config.default_wpm,
                min_wpm: config.min_wpm,
                max_wpm: config.max_wpm,
                wpm_step: config.wpm_step,
                skip_count: config.skip_count,
                default_mode: config.default_mode,
                anchor_column: config.anchor_column,
            },
            stats: StatsConfig {
                max_logged_sessions: config.max_logged_sessions,
            },
            classifier: config.classifier.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_data_dir")]
    data_dir: String,
    #[serde(default = "defaults::default_storage_quota_bytes")]
    quota_bytes: Option<u64>,
    #[serde(default = "defaults::default_progress_save_interval_ms")]
    progress_save_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: defaults::default_data_dir(),
            quota_bytes: defaults::default_storage_quota_bytes(),
            progress_save_interval_ms: defaults::default_progress_save_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_wpm")]
    default_wpm: u32,
    #[serde(default = "defaults::default_min_wpm")]
    min_wpm: u32,
    #[serde(default = "defaults::default_max_wpm")]
    max_wpm: u32,
    #[serde(default = "defaults::default_wpm_step")]
    wpm_step: u32,
    #[serde(default = "defaults::default_skip_count")]
    skip_count: usize,
    #[serde(default = "defaults::default_reading_mode")]
    default_mode: ReadingMode,
    #[serde(default = "defaults::default_anchor_column")]
    anchor_column: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            default_wpm: defaults::default_wpm(),
            min_wpm: defaults::default_min_wpm(),
            max_wpm: defaults::default_max_wpm(),
            wpm_step: defaults::default_wpm_step(),
            skip_count: defaults::default_skip_count(),
            default_mode: defaults::default_reading_mode(),
            anchor_column: defaults::default_anchor_column(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StatsConfig {
    #[serde(default = "defaults::default_max_logged_sessions")]
    max_logged_sessions: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            max_logged_sessions: defaults::default_max_logged_sessions(),
        }
    }
}
