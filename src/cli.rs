//! Command-line interface definitions for dupefind.
//!
//! Every flag is optional. Flags that tune the pipeline override the config
//! file and `DUPEFIND_*` environment variables (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Scan the current directory, append groups to duplifind_result.csv
//! dupefind
//!
//! # Scan a directory with smaller reads and fewer hashing workers
//! dupefind ~/Downloads --chunk-size 64KiB --hash-workers 4
//!
//! # Verbose mode for debugging
//! dupefind -v ~/Downloads -o dupes.csv
//! ```

use clap::Parser;
use std::path::PathBuf;

use crate::config::Overrides;

/// Concurrent duplicate file finder.
///
/// Walks a directory tree, narrows candidates by size and content hash, and
/// confirms duplicates byte by byte. Each group of identical files is
/// appended to the output file as one comma-separated line.
#[derive(Debug, Parser)]
#[command(name = "dupefind")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Directory to scan for duplicates
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// File to append duplicate groups to [default: duplifind_result.csv]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Bytes per read when hashing and verifying (e.g. 65536, 64KiB, 1MB)
    #[arg(long, value_name = "SIZE", value_parser = parse_chunk_size)]
    pub chunk_size: Option<usize>,

    /// Number of hashing workers [default: 16]
    #[arg(long, value_name = "N")]
    pub hash_workers: Option<usize>,

    /// Number of byte verification workers [default: 4]
    #[arg(long, value_name = "N")]
    pub verify_workers: Option<usize>,

    /// Read settings from this TOML file instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The flags that override lower configuration layers.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            output: self.output.clone(),
            chunk_size: self.chunk_size,
            hash_workers: self.hash_workers,
            verify_workers: self.verify_workers,
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupefind::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}

fn parse_chunk_size(s: &str) -> Result<usize, String> {
    let bytes = parse_size(s)?;
    if bytes == 0 {
        return Err("Chunk size must be greater than 0".to_string());
    }
    usize::try_from(bytes).map_err(|_| format!("Chunk size too large: {bytes}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("1024B").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1_000);
        assert_eq!(parse_size("1kib").unwrap(), 1_024);
        assert_eq!(parse_size("10MB").unwrap(), 10_000_000);
        assert_eq!(parse_size("1GiB").unwrap(), 1_073_741_824);
        assert_eq!(parse_size("1.5MB").unwrap(), 1_500_000);
        assert_eq!(parse_size(" 1 MB ").unwrap(), 1_000_000);
    }

    #[test]
    fn test_parse_size_errors() {
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("1XB").is_err());
        assert!(parse_size("-1MB").is_err());
    }

    #[test]
    fn test_parse_chunk_size_rejects_zero() {
        assert!(parse_chunk_size("0").is_err());
        assert_eq!(parse_chunk_size("64KiB").unwrap(), 65_536);
    }

    #[test]
    fn test_cli_no_arguments() {
        let cli = Cli::try_parse_from(["dupefind"]).unwrap();

        assert_eq!(cli.path, PathBuf::from("."));
        assert!(cli.output.is_none());
        assert!(cli.chunk_size.is_none());
        assert!(cli.config.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(!cli.json_errors);
    }

    #[test]
    fn test_cli_all_flags() {
        let cli = Cli::try_parse_from([
            "dupefind",
            "/data",
            "-o",
            "out.csv",
            "--chunk-size",
            "4KiB",
            "--hash-workers",
            "8",
            "--verify-workers",
            "2",
            "--config",
            "custom.toml",
            "-vv",
            "--json-errors",
        ])
        .unwrap();

        assert_eq!(cli.path, PathBuf::from("/data"));
        assert_eq!(cli.output, Some(PathBuf::from("out.csv")));
        assert_eq!(cli.chunk_size, Some(4096));
        assert_eq!(cli.hash_workers, Some(8));
        assert_eq!(cli.verify_workers, Some(2));
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert_eq!(cli.verbose, 2);
        assert!(cli.json_errors);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from(["dupefind", "--hash-workers", "3"]).unwrap();
        let overrides = cli.overrides();

        assert_eq!(overrides.hash_workers, Some(3));
        assert!(overrides.output.is_none());
        assert!(overrides.chunk_size.is_none());
        assert!(overrides.verify_workers.is_none());
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["dupefind", "-v", "-q"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_zero_chunk_size() {
        let result = Cli::try_parse_from(["dupefind", "--chunk-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_version_flag() {
        let result = Cli::try_parse_from(["dupefind", "--version"]);
        assert!(result.is_err());
    }
}
