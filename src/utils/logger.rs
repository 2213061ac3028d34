use chrono::Local;
use eyre::Result;
use fern::Dispatch;
use log::LevelFilter;

/// Level used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// Sets up the console logger.
///
/// The level comes from `RUST_LOG` (a single level name such as `debug`). HTTP
/// plumbing is capped at `warn` so request chatter does not drown out the loops.
///
/// # Errors
/// * If a global logger is already installed
pub fn setup_logger() -> Result<()> {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(DEFAULT_LEVEL);

    Dispatch::new()
        .level(level)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stdout())
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ));
        })
        .apply()?;
    Ok(())
}
