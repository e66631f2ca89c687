//! Command-line interface definitions for Archive Miner.
//!
//! Everything here can also be given through environment variables (or a
//! `.env` file); secrets such as the Groq API key normally come from there.

use crate::archive::Strategy;
use crate::collaborators::cleanup::{DEFAULT_GROQ_ENDPOINT, DEFAULT_GROQ_MODEL};
use clap::Parser;

/// Command-line arguments for the Archive Miner application.
///
/// # Examples
///
/// ```sh
/// # Defaults: search-form strategy, rows written under ./output
/// archive_miner
///
/// # Try the loader endpoint when the search form finds nothing
/// archive_miner --strategy search-form --strategy direct-loader
///
/// # Clean bodies with Groq and post each row to WordPress
/// GROQ_API_KEY=... archive_miner --wp-url https://example.com/wp-json/miner/v1/post
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "ARCHIVE_MINER_CONFIG")]
    pub config: Option<String>,

    /// Output directory for the JSON result files
    #[arg(short, long, default_value = "./output")]
    pub output_dir: String,

    /// Snapshot strategy to try, in order; repeat to chain several.
    /// Overrides `archive.strategies` from the config file.
    #[arg(long = "strategy", value_enum)]
    pub strategies: Vec<Strategy>,

    /// Process at most this many collected links
    #[arg(long)]
    pub max_links: Option<usize>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headful: bool,

    /// Groq API key; cleanup is skipped when absent
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: Option<String>,

    /// Model used for body cleanup
    #[arg(long, env = "GROQ_MODEL", default_value = DEFAULT_GROQ_MODEL)]
    pub groq_model: String,

    /// Chat-completions endpoint used for body cleanup
    #[arg(long, env = "GROQ_ENDPOINT", default_value = DEFAULT_GROQ_ENDPOINT)]
    pub groq_endpoint: String,

    /// WordPress endpoint receiving each row; publishing is skipped when absent
    #[arg(long, env = "WP_URL")]
    pub wp_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["archive_miner"]);

        assert_eq!(cli.output_dir, "./output");
        assert!(cli.strategies.is_empty());
        assert_eq!(cli.max_links, None);
        assert!(!cli.headful);
        assert_eq!(cli.groq_model, DEFAULT_GROQ_MODEL);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["archive_miner", "-o", "/tmp/rows", "-c", "/etc/miner.yaml"]);

        assert_eq!(cli.output_dir, "/tmp/rows");
        assert_eq!(cli.config.as_deref(), Some("/etc/miner.yaml"));
    }

    #[test]
    fn test_cli_repeated_strategies_keep_order() {
        let cli = Cli::parse_from([
            "archive_miner",
            "--strategy",
            "direct-loader",
            "--strategy",
            "direct-navigate-revisit",
            "--max-links",
            "5",
            "--headful",
        ]);

        assert_eq!(
            cli.strategies,
            vec![Strategy::DirectLoader, Strategy::DirectNavigateRevisit]
        );
        assert_eq!(cli.max_links, Some(5));
        assert!(cli.headful);
    }
}
