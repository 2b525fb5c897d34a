use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failed checks
    Quiet,
    /// Show check results
    #[default]
    Normal,
    /// Show every notification
    Verbose,
}

/// Notification rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable lines
    #[default]
    Human,
    /// One JSON object per notification
    Json,
}

/// Live-validate lines read from stdin against a remote endpoint
#[derive(Parser, Debug, Clone)]
#[command(name = "auto-check")]
#[command(about = "Debounced live validation of input values against a remote endpoint")]
#[command(version)]
pub struct Cli {
    /// Validation endpoint (absolute, or relative to --base-url)
    #[arg(long = "src")]
    pub src: Option<String>,

    /// Authenticity token sent with every check
    #[arg(long = "csrf")]
    pub csrf: Option<String>,

    /// Base URL relative endpoints resolve against
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Quiet period before a check runs, in milliseconds
    #[arg(long = "debounce-ms")]
    pub debounce_ms: Option<u64>,

    /// HTTP request timeout in seconds (none by default)
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Print every notification
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Only print failed checks
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_basic_cli_parsing() {
        let args = vec![
            "auto-check",
            "--src",
            "/validate",
            "--csrf",
            "tok1",
            "--base-url",
            "https://example.com/",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.src.as_deref(), Some("/validate"));
        assert_eq!(cli.csrf.as_deref(), Some("tok1"));
        assert_eq!(cli.base_url.as_deref(), Some("https://example.com/"));
        assert_eq!(cli.output_format, None);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_format_and_timing_flags() {
        let args = vec![
            "auto-check",
            "--format",
            "json",
            "--debounce-ms",
            "150",
            "--timeout",
            "5",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.output_format, Some(OutputFormat::Json));
        assert_eq!(cli.debounce_ms, Some(150));
        assert_eq!(cli.timeout, Some(5));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = Cli::try_parse_from(vec!["auto-check", "-v", "-q"]);
        assert!(result.is_err());
    }
}
