//! Logging to stderr through `flexi_logger`.

use eyre::{Result, WrapErr};
use flexi_logger::{Logger, LoggerHandle};

/// Overrides the level chosen by the verbosity flags.
pub const LOG_ENV: &str = "WEFT_LOG";

/// Level spec for the verbosity flags.
pub fn level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Start the logger. The returned handle must stay alive for the whole run.
pub fn init(verbose: u8, quiet: bool) -> Result<LoggerHandle> {
    let spec = std::env::var(LOG_ENV).unwrap_or_else(|_| level(verbose, quiet).to_string());

    Logger::try_with_str(&spec)
        .wrap_err_with(|| format!("invalid log spec '{}'", spec))?
        .log_to_stderr()
        .format(flexi_logger::colored_default_format)
        .start()
        .wrap_err("failed to start logger")
}
