//! CLI argument parsing for the car monitor

use clap::Parser;
use std::path::PathBuf;

/// CarMonitor - simulated car telemetry over a single-owner value store
#[derive(Parser, Debug)]
#[command(name = "cm")]
#[command(author, version, about = "Simulated car telemetry monitor", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Telemetry log file (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop after this many milliseconds instead of waiting for a signal
    #[arg(short = 'd', long = "duration-ms")]
    pub duration_ms: Option<u64>,

    /// Do not print values to stdout
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::parse_from([
            "cm",
            "-c",
            "cm.yml",
            "--log-level",
            "debug",
            "-o",
            "out.txt",
            "--duration-ms",
            "250",
            "--quiet",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("cm.yml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.output, Some(PathBuf::from("out.txt")));
        assert_eq!(cli.duration_ms, Some(250));
        assert!(cli.quiet);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["cm"]);
        assert!(cli.config.is_none());
        assert!(cli.duration_ms.is_none());
        assert!(!cli.quiet);
    }
}
