//! Pipeline configuration loaded from an optional YAML file.
//!
//! Every field carries a default, so a missing or empty file yields a working
//! configuration aimed at HBR's "The Latest" listing and archive.is. Durations
//! are stored in milliseconds and exposed as [`Duration`] accessors.
//!
//! ```yaml
//! archive:
//!   strategies: [search-form, direct-loader]
//! extraction:
//!   min_content_len: 60
//! throttle:
//!   link_delay_ms: 3000
//! ```

use crate::archive::Strategy;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0 Safari/537.36";

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub index: IndexConfig,
    pub archive: ArchiveConfig,
    pub extraction: ExtractionConfig,
    pub retry: RetryConfig,
    pub throttle: ThrottleConfig,
    pub browser: BrowserSettings,
}

impl PipelineConfig {
    /// Load a configuration file, falling back to defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!(path, strategies = ?config.archive.strategies, "Loaded configuration");
        Ok(config)
    }

    /// Parse YAML text; blank input is treated as an empty document.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

/// Index page location, selectors and pagination bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub url: String,
    /// Origin every collected href is resolved against.
    pub base_url: String,
    pub title_selector: String,
    pub load_more_selector: String,
    /// Substrings identifying the network response that completes a "load more".
    pub pagination_patterns: Vec<String>,
    pub navigation_timeout_ms: u64,
    pub title_wait_ms: u64,
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub max_pages: usize,
}

impl IndexConfig {
    pub fn navigation_timeout(&self) -> Duration {
        ms(self.navigation_timeout_ms)
    }

    pub fn title_wait(&self) -> Duration {
        ms(self.title_wait_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        ms(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        ms(self.poll_interval_ms)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "https://hbr.org/the-latest".to_string(),
            base_url: "https://hbr.org".to_string(),
            title_selector: "h3.hed a".to_string(),
            load_more_selector: r#"li.load-more a[js-target="load-ten-more-link"]"#.to_string(),
            pagination_patterns: vec!["/latest".to_string(), "/load".to_string()],
            navigation_timeout_ms: 80_000,
            title_wait_ms: 80_000,
            settle_delay_ms: 800,
            poll_interval_ms: 250,
            max_pages: 50,
        }
    }
}

/// Archive provider endpoints, selectors and wait budgets for every strategy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Strategies tried in order until one locates a snapshot.
    pub strategies: Vec<Strategy>,
    pub landing_url: String,
    pub search_input_selector: String,
    /// `name` attribute of the frame archive search results may render in.
    pub results_frame_name: String,
    pub snapshot_link_selector: String,
    /// Regex a frame URL must match to count as a snapshot.
    pub snapshot_url_pattern: String,
    pub loader_url: String,
    pub run_url: String,
    pub heading_selector: String,
    pub article_selector: String,
    pub navigation_timeout_ms: u64,
    pub search_input_wait_ms: u64,
    pub snapshot_link_wait_ms: u64,
    pub loader_wait_ms: u64,
    pub poll_interval_ms: u64,
    pub revisit_settle_ms: u64,
    pub article_wait_ms: u64,
    /// Upper bound for one whole `locate` call across all strategies.
    /// Unset means the sum of each configured strategy's worst-case pass.
    pub attempt_budget_ms: Option<u64>,
}

impl ArchiveConfig {
    pub fn navigation_timeout(&self) -> Duration {
        ms(self.navigation_timeout_ms)
    }

    pub fn search_input_wait(&self) -> Duration {
        ms(self.search_input_wait_ms)
    }

    pub fn snapshot_link_wait(&self) -> Duration {
        ms(self.snapshot_link_wait_ms)
    }

    pub fn loader_wait(&self) -> Duration {
        ms(self.loader_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        ms(self.poll_interval_ms)
    }

    pub fn revisit_settle(&self) -> Duration {
        ms(self.revisit_settle_ms)
    }

    pub fn article_wait(&self) -> Duration {
        ms(self.article_wait_ms)
    }

    /// Longest a single pass of `strategy` can take before its own waits
    /// give up, counting every bounded navigation and poll it performs.
    pub fn worst_case(&self, strategy: Strategy) -> Duration {
        let nav = self.navigation_timeout();
        match strategy {
            // landing, submit, follow link
            Strategy::SearchForm => {
                nav * 3 + self.search_input_wait() + self.snapshot_link_wait()
            }
            Strategy::DirectLoader => nav + self.loader_wait(),
            // run URL, then the snapshot twice
            Strategy::DirectNavigateRevisit => {
                nav * 3 + self.revisit_settle() + self.snapshot_link_wait() + self.article_wait()
            }
        }
    }

    /// Sum of [`worst_case`](Self::worst_case) over the configured strategies.
    pub fn derived_budget(&self) -> Duration {
        self.strategies.iter().map(|s| self.worst_case(*s)).sum()
    }

    /// The explicit `attempt_budget_ms`, or [`derived_budget`](Self::derived_budget).
    pub fn attempt_budget(&self) -> Duration {
        self.attempt_budget_ms
            .map(ms)
            .unwrap_or_else(|| self.derived_budget())
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            strategies: vec![Strategy::SearchForm],
            landing_url: "https://archive.is/".to_string(),
            search_input_selector: r#"form#search input[name="q"]"#.to_string(),
            results_frame_name: "frame".to_string(),
            snapshot_link_selector: r#"div.TEXT-BLOCK a[href^="https://archive.is/"]"#.to_string(),
            snapshot_url_pattern: r"^https?://archive\.(is|ph|today|li|md|vn|fo)/[A-Za-z0-9]{4,}"
                .to_string(),
            loader_url: "https://archive.is/newest/".to_string(),
            run_url: "https://archive.is/?run=1&url=".to_string(),
            heading_selector: "h1".to_string(),
            article_selector: "#CONTENT h1, article h1, h1".to_string(),
            navigation_timeout_ms: 60_000,
            search_input_wait_ms: 45_000,
            snapshot_link_wait_ms: 15_000,
            loader_wait_ms: 60_000,
            poll_interval_ms: 500,
            revisit_settle_ms: 5_000,
            article_wait_ms: 30_000,
            attempt_budget_ms: None,
        }
    }
}

/// Noise-filtering knobs for body extraction.
///
/// The denylist and the minimum content length were tuned by hand against a
/// handful of snapshots and should be recalibrated against real fixtures.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Blocks whose trimmed text equals one of these are dropped.
    pub denylist: Vec<String>,
    /// Blocks matching this regex are dropped. The default catches short
    /// blocks ending in a percentage, such as "37%" or "Loading 37%", and
    /// leaves longer prose that happens to end in one.
    pub percentage_pattern: String,
    /// The body starts at the first block longer than this many characters.
    pub min_content_len: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let denylist = [
            "Subscribe",
            "Sign In",
            "Read more",
            "Post",
            "Share",
            "Save",
            "Print",
            "{{terminalError}}",
            "Recaptcha requires verification",
            "Privacy - Terms",
        ];
        Self {
            denylist: denylist.iter().map(|s| s.to_string()).collect(),
            percentage_pattern: r"^\D{0,30}\d{1,3}%\s*$".to_string(),
            min_content_len: 40,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub backoff_ms: u64,
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        ms(self.backoff_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Pause after every link, successful or not.
    pub link_delay_ms: u64,
}

impl ThrottleConfig {
    pub fn link_delay(&self) -> Duration {
        ms(self.link_delay_ms)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            link_delay_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Patch the automation fingerprints archive.is uses to serve a captcha.
    pub stealth: bool,
    pub user_agent: String,
    pub args: Vec<String>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        let args = [
            "--no-sandbox",
            "--disable-setuid-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
        ];
        Self {
            headless: true,
            stealth: true,
            user_agent: CHROME_USER_AGENT.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            window_width: 1920,
            window_height: 1080,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_yaml_is_default() {
        let config = PipelineConfig::from_yaml("  \n").unwrap();
        assert_eq!(config.extraction.min_content_len, 40);
        assert_eq!(config.archive.strategies, vec![Strategy::SearchForm]);
        assert_eq!(config.throttle.link_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
archive:
  strategies: [direct-loader, direct-navigate-revisit]
extraction:
  min_content_len: 60
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.archive.strategies,
            vec![Strategy::DirectLoader, Strategy::DirectNavigateRevisit]
        );
        assert_eq!(config.archive.landing_url, "https://archive.is/");
        assert_eq!(config.extraction.min_content_len, 60);
        assert!(config.extraction.denylist.contains(&"Subscribe".to_string()));
        assert_eq!(config.index.title_selector, "h3.hed a");
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let yaml = "archive:\n  strategies: [carrier-pigeon]\n";
        assert!(PipelineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = PipelineConfig::load(Some("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_attempt_budget_covers_every_configured_strategy() {
        let mut archive = ArchiveConfig::default();
        assert_eq!(archive.attempt_budget(), Duration::from_secs(240));

        archive.strategies = vec![Strategy::SearchForm, Strategy::DirectLoader];
        assert_eq!(archive.attempt_budget(), Duration::from_secs(240 + 120));

        archive.strategies = vec![Strategy::DirectNavigateRevisit];
        assert_eq!(archive.attempt_budget(), Duration::from_secs(180 + 5 + 15 + 30));
    }

    #[test]
    fn test_explicit_attempt_budget_wins() {
        let yaml = "archive:\n  attempt_budget_ms: 90000\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.archive.attempt_budget(), Duration::from_secs(90));
    }

    #[test]
    fn test_load_without_path_is_default() {
        let config = PipelineConfig::load(None).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.browser.headless);
        assert!(config.browser.stealth);
    }
}
