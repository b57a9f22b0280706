//! Command-line argument parsing for wasmboot
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// wasmboot - Bootstrap a WASM frontend from whichever build output is reachable
#[derive(Parser, Debug)]
#[command(name = "wasmboot")]
#[command(version)]
#[command(about = "Try candidate WASM builds for a page, or render the diagnostic fallback", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except the result)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bootstrap sequence against a deployed page
    Run {
        /// Page URL (e.g. http://localhost:8080/index.html)
        url: String,

        /// Write the rendered fallback HTML here when no candidate loads
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check every candidate and binary artifact for a deployed page
    Doctor {
        /// Page URL
        url: String,
    },

    /// List the ordered candidate list for a deployed page
    Candidates {
        /// Page URL
        url: String,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Check if should show progress and summaries
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show per-candidate events
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let args = Args::try_parse_from(["wasmboot", "run", "http://localhost:8080/", "-o", "out.html"]).unwrap();
        match &args.command {
            Commands::Run { url, output, json } => {
                assert_eq!(url, "http://localhost:8080/");
                assert_eq!(output, &Some(PathBuf::from("out.html")));
                assert!(!*json);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["wasmboot", "doctor", "http://x/", "-vv"]).unwrap();
        assert_eq!(args.verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_quiet_wins() {
        let args = Args::try_parse_from(["wasmboot", "-q", "-v", "config"]).unwrap();
        assert_eq!(args.verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["wasmboot"]).is_err());
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());
        assert!(!Verbosity::Normal.show_events());
        assert!(Verbosity::Verbose.show_events());
        assert_eq!(Verbosity::VeryVerbose.as_str(), "very_verbose");
    }
}
