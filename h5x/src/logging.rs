//! Optional terminal logging.
//!
//! h5x only emits through the `log` facade. Applications that don't install a logger of their
//! own can call [`init_logging`] to get create/open/close events on stderr.

pub use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Install a stderr logger at `level`.
///
/// This function is optional, if it is not called then no logger is installed. Returns `false`
/// if another logger was already installed.
pub fn init_logging(level: LevelFilter) -> bool {
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_logger_is_installed() {
        let first = init_logging(LevelFilter::Warn);
        assert!(!init_logging(LevelFilter::Trace) || !first);
    }
}
