pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}

pub(crate) fn default_data_dir() -> String {
    ".cache/speed-reader".to_string()
}

pub(crate) fn default_storage_quota_bytes() -> Option<u64> {
    None
}

pub(crate) fn default_wpm() -> u32 {
    300
}

pub(crate) fn default_min_wpm() -> u32 {
    150
}

pub(crate) fn default_max_wpm() -> u32 {
    1000
}

pub(crate) fn default_wpm_step() -> u32 {
    50
}

pub(crate) fn default_skip_count() -> usize {
    10
}

pub(crate) fn default_progress_save_interval_ms() -> u64 {
    5000
}

pub(crate) fn default_max_logged_sessions() -> usize {
    100
}

pub(crate) fn default_reading_mode() -> crate::config::ReadingMode {
    crate::config::ReadingMode::Rsvp
}

pub(crate) fn default_anchor_column() -> usize {
    20
}
