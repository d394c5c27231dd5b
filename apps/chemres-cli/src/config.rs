//! Command-line arguments and configuration loading

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chemres_core::{Cid, ResolverConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Chemical identifier resolver
///
/// Maps names, CAS numbers, SMILES and InChIKeys to PubChem compound IDs and
/// fetches standardized records for them.
#[derive(Parser, Debug)]
#[command(name = "chemres", version)]
#[command(about = "Resolve chemical identifiers and fetch PubChem records", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML). Defaults to <config dir>/chemres/config.toml
    #[arg(long, env = "CHEMRES_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// PUG REST root URL
    #[arg(long, env = "CHEMRES_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Minimum spacing between requests, in milliseconds
    #[arg(long, global = true)]
    pub min_interval_ms: Option<u64>,

    /// Attempts per request, including the first
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Identifiers resolved concurrently
    #[arg(long, global = true)]
    pub resolution_concurrency: Option<usize>,

    /// Enrichment batches in flight at once
    #[arg(long, global = true)]
    pub enrichment_concurrency: Option<usize>,

    /// CIDs per enrichment request
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Only try the primary strategy for each identifier
    #[arg(long, global = true)]
    pub no_fallback: bool,

    /// Remember lookups for the rest of the run
    #[arg(long, global = true)]
    pub memoize: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Map identifiers to CIDs
    Resolve {
        #[command(flatten)]
        input: IdentifierInput,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Fetch records for CIDs
    Enrich {
        /// CIDs to fetch
        cids: Vec<Cid>,

        /// File with one CID per line
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Output CSV file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Keep records already in the output file and fetch only new CIDs
        #[arg(long, requires = "output")]
        update: bool,
    },

    /// Resolve identifiers, then fetch records for every resolved CID
    Run {
        #[command(flatten)]
        input: IdentifierInput,

        /// Output CSV file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Keep records already in the output file and fetch only new CIDs
        #[arg(long, requires = "output")]
        update: bool,
    },
}

/// Identifiers from the command line and/or a file
#[derive(Args, Debug)]
pub struct IdentifierInput {
    /// Identifiers to resolve
    pub identifiers: Vec<String>,

    /// File with one identifier per line
    #[arg(long, short)]
    pub input: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl Cli {
    /// Configuration file, then flag overrides, then validation
    pub fn resolver_config(&self) -> Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => load_config_file(&path)?,
                _ => ResolverConfig::default(),
            },
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut ResolverConfig) {
        if let Some(url) = &self.base_url {
            config.service.base_url = url.clone();
        }
        if let Some(ms) = self.min_interval_ms {
            config.rate_limit.min_interval_ms = ms;
        }
        if let Some(attempts) = self.max_attempts {
            config.rate_limit.max_attempts = attempts;
        }
        if let Some(n) = self.resolution_concurrency {
            config.resolution.concurrency = n;
        }
        if let Some(n) = self.enrichment_concurrency {
            config.enrichment.concurrency = n;
        }
        if let Some(n) = self.batch_size {
            config.enrichment.batch_size = n;
        }
        if self.no_fallback {
            config.resolution.fallback = false;
        }
        if self.memoize {
            config.memoize = true;
        }
    }
}

impl IdentifierInput {
    /// Command-line identifiers followed by those read from the file
    pub fn collect(&self) -> Result<Vec<String>> {
        let mut identifiers = self.identifiers.clone();
        if let Some(path) = &self.input {
            identifiers.extend(read_lines(path)?);
        }
        Ok(identifiers)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chemres").join("config.toml"))
}

pub fn load_config_file(path: &Path) -> Result<ResolverConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    ResolverConfig::from_toml(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Non-empty lines of a file. Other whitespace is kept: it is part of the
/// identifier as supplied.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(text
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let mut config = ResolverConfig::default();
        let cli = parse(&[
            "chemres",
            "--batch-size",
            "5",
            "--no-fallback",
            "--memoize",
            "resolve",
            "hexanal",
        ]);
        cli.apply_overrides(&mut config);

        assert_eq!(config.enrichment.batch_size, 5);
        assert!(!config.resolution.fallback);
        assert!(config.memoize);
        assert_eq!(config.rate_limit.min_interval_ms, 200);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["chemres", "enrich", "7410", "6184", "--max-attempts", "2"]);
        assert_eq!(cli.max_attempts, Some(2));
        match cli.command {
            Command::Enrich { cids, .. } => assert_eq!(cids.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_cid_rejected() {
        assert!(Cli::try_parse_from(["chemres", "enrich", "0"]).is_err());
    }

    #[test]
    fn test_config_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[enrichment]\nbatch_size = 20\nconcurrency = 2").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let cli = parse(&[
            "chemres",
            "--config",
            path.as_str(),
            "--enrichment-concurrency",
            "8",
            "run",
            "hexanal",
        ]);
        let config = cli.resolver_config().unwrap();

        assert_eq!(config.enrichment.batch_size, 20);
        assert_eq!(config.enrichment.concurrency, 8);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let cli = parse(&["chemres", "--config", "/nonexistent/chemres.toml", "resolve"]);
        assert!(cli.resolver_config().is_err());
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let cli = parse(&["chemres", "--batch-size", "500", "resolve"]);
        assert!(cli.resolver_config().is_err());
    }

    #[test]
    fn test_read_lines_skips_empty_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "hexanal\n\n98-86-2\n CCO\n").unwrap();

        let lines = read_lines(file.path()).unwrap();

        assert_eq!(lines, vec!["hexanal", "98-86-2", " CCO"]);
    }
}
