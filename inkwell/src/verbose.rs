//! `-v`/`-q` flags mapped onto a tracing level, warnings shown by default.

use tracing::{level_filters::LevelFilter, Level};

#[derive(clap::Args, Debug, Clone, Default)]
pub struct Verbosity {
    /// More output per occurrence
    #[clap(long, short = 'v', parse(from_occurrences), global = true)]
    verbose: i8,

    /// Less output per occurrence
    #[clap(
        long,
        short = 'q',
        parse(from_occurrences),
        global = true,
        conflicts_with = "verbose"
    )]
    quiet: i8,
}

const DEFAULT_VERBOSITY: i8 = 1;

impl Verbosity {
    pub fn log_level_filter(&self) -> LevelFilter {
        level_enum(DEFAULT_VERBOSITY - self.quiet + self.verbose)
            .map(LevelFilter::from_level)
            .unwrap_or(LevelFilter::OFF)
    }
}

fn level_enum(verbosity: i8) -> Option<Level> {
    match verbosity {
        i8::MIN..=-1 => None,
        0 => Some(Level::ERROR),
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        4..=i8::MAX => Some(Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(verbose: i8, quiet: i8) -> LevelFilter {
        Verbosity { verbose, quiet }.log_level_filter()
    }

    #[test]
    fn test_levels() {
        assert_eq!(filter(0, 0), LevelFilter::WARN);
        assert_eq!(filter(1, 0), LevelFilter::INFO);
        assert_eq!(filter(2, 0), LevelFilter::DEBUG);
        assert_eq!(filter(9, 0), LevelFilter::TRACE);
        assert_eq!(filter(0, 1), LevelFilter::ERROR);
        assert_eq!(filter(0, 2), LevelFilter::OFF);
    }
}
