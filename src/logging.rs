use log::LevelFilter;

pub fn level_from_env() -> LevelFilter {
    std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

// Console logging: timestamp, level and target on every line
pub fn setup_logger(level: LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // mail protocol crates are chatty at debug
        .level_for("async_imap", LevelFilter::Warn)
        .level_for("lettre", LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}
