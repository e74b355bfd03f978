use super::config::Config;

pub fn level_filter(level: &str) -> log::LevelFilter {
    match level {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Off,
    }
}

/// Initializes `env_logger` at the configured level; `RUST_LOG` filters still apply.
pub fn setup_logger(config: &Config) {
    let _ = env_logger::Builder::new()
        .filter_level(level_filter(&config.log_level))
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}
