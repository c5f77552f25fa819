//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Catalog endpoints
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Artifact names and locations
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override settings from environment variables (Lambda deployments).
    pub fn apply_env(&mut self) {
        if let Some(ms) = env_parse("REQUEST_DELAY_MS") {
            self.crawler.request_delay_ms = ms;
        }
        if let Some(n) = env_parse("MAX_ATTEMPTS") {
            self.crawler.max_attempts = n;
        }
        if let Some(secs) = env_parse("CRAWL_TIMEOUT_SECS") {
            self.crawler.timeout_secs = secs;
        }
        if let Ok(base) = std::env::var("CATALOG_BASE_URL") {
            self.catalog = CatalogConfig::with_base(&base);
        }
        if let Ok(prefix) = std::env::var("S3_PREFIX") {
            self.storage.prefix = prefix;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_attempts == 0 {
            return Err(AppError::validation("crawler.max_attempts must be > 0"));
        }
        self.catalog.validate()?;
        self.storage.validate()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Minimum spacing between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Attempts per page before giving up on non-200 responses
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_attempts: defaults::max_attempts(),
        }
    }
}

/// Catalog endpoint templates.
///
/// Placeholders: `{dept_code}`, `{semester}`, `{course_code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Landing page with the department and semester selectors
    #[serde(default = "defaults::main_page_url")]
    pub main_page_url: String,

    /// Course listing of one department for one semester
    #[serde(default = "defaults::department_url")]
    pub department_url: String,

    /// Section listing of one course
    #[serde(default = "defaults::course_url")]
    pub course_url: String,

    /// Catalog page of one course, used to infer department prefixes
    #[serde(default = "defaults::prefix_probe_url")]
    pub prefix_probe_url: String,

    /// Curriculum page of one department, holding the semester tables
    #[serde(default = "defaults::program_url")]
    pub program_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            main_page_url: defaults::main_page_url(),
            department_url: defaults::department_url(),
            course_url: defaults::course_url(),
            prefix_probe_url: defaults::prefix_probe_url(),
            program_url: defaults::program_url(),
        }
    }
}

impl CatalogConfig {
    /// Build the default endpoint layout rooted at another host.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            main_page_url: format!("{base}/main.php"),
            department_url: format!(
                "{base}/main.php?select_dept={{dept_code}}&select_semester={{semester}}"
            ),
            course_url: format!("{base}/main.php?text_course_code={{course_code}}"),
            prefix_probe_url: format!("{base}/course.php?course_code={{course_code}}"),
            program_url: format!("{base}/program.php?fac_prog={{dept_code}}"),
        }
    }

    pub fn department(&self, dept_code: &str, semester: &str) -> String {
        self.department_url
            .replace("{dept_code}", dept_code)
            .replace("{semester}", semester)
    }

    pub fn course(&self, course_code: &str) -> String {
        self.course_url.replace("{course_code}", course_code)
    }

    pub fn prefix_probe(&self, course_code: &str) -> String {
        self.prefix_probe_url.replace("{course_code}", course_code)
    }

    pub fn program(&self, dept_code: &str) -> String {
        self.program_url.replace("{dept_code}", dept_code)
    }

    fn validate(&self) -> Result<()> {
        let templates = [
            ("catalog.main_page_url", &self.main_page_url, None),
            ("catalog.department_url", &self.department_url, Some("{dept_code}")),
            ("catalog.course_url", &self.course_url, Some("{course_code}")),
            ("catalog.prefix_probe_url", &self.prefix_probe_url, Some("{course_code}")),
            ("catalog.program_url", &self.program_url, Some("{dept_code}")),
        ];
        for (name, template, placeholder) in templates {
            url::Url::parse(&template.replace(['{', '}'], ""))
                .map_err(|e| AppError::validation(format!("{name} is not a URL: {e}")))?;
            if let Some(p) = placeholder {
                if !template.contains(p) {
                    return Err(AppError::validation(format!("{name} must contain {p}")));
                }
            }
        }
        Ok(())
    }
}

/// Artifact names and staging locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key prefix prepended to every artifact name (may be empty)
    #[serde(default)]
    pub prefix: String,

    #[serde(default = "defaults::status_key")]
    pub status: String,

    #[serde(default = "defaults::departments_key")]
    pub departments: String,

    #[serde(default = "defaults::departments_noprefix_key")]
    pub departments_noprefix: String,

    #[serde(default = "defaults::data_key")]
    pub data: String,

    #[serde(default = "defaults::musts_key")]
    pub musts: String,

    #[serde(default = "defaults::last_updated_key")]
    pub last_updated: String,

    #[serde(default = "defaults::manual_prefixes_key")]
    pub manual_prefixes: String,

    #[serde(default = "defaults::manifest_key")]
    pub manifest: String,

    /// Operator-maintained overrides; read from the store when unset
    #[serde(default)]
    pub manual_prefixes_file: Option<String>,

    /// Parent of the per-run staging directory; the system temp dir when unset
    #[serde(default)]
    pub staging_dir: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            status: defaults::status_key(),
            departments: defaults::departments_key(),
            departments_noprefix: defaults::departments_noprefix_key(),
            data: defaults::data_key(),
            musts: defaults::musts_key(),
            last_updated: defaults::last_updated_key(),
            manual_prefixes: defaults::manual_prefixes_key(),
            manifest: defaults::manifest_key(),
            manual_prefixes_file: None,
            staging_dir: None,
        }
    }
}

impl StorageConfig {
    /// Full store key for an artifact name.
    pub fn key(&self, name: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        }
    }

    fn validate(&self) -> Result<()> {
        let names = [
            &self.status,
            &self.departments,
            &self.departments_noprefix,
            &self.data,
            &self.musts,
            &self.last_updated,
            &self.manual_prefixes,
            &self.manifest,
        ];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(AppError::validation("storage artifact names must not be empty"));
        }
        let mut sorted: Vec<_> = names.iter().collect();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != names.len() {
            return Err(AppError::validation("storage artifact names must be distinct"));
        }
        Ok(())
    }
}

mod defaults {
    const BASE: &str = "https://oibs2.metu.edu.tr/View_Program_Course_Details_64";
    const CATALOG: &str = "https://catalog.metu.edu.tr";

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; catalog-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_attempts() -> u32 {
        10
    }

    // Catalog defaults
    pub fn main_page_url() -> String {
        format!("{BASE}/main.php")
    }
    pub fn department_url() -> String {
        format!("{BASE}/main.php?select_dept={{dept_code}}&select_semester={{semester}}")
    }
    pub fn course_url() -> String {
        format!("{BASE}/main.php?text_course_code={{course_code}}")
    }
    pub fn prefix_probe_url() -> String {
        format!("{CATALOG}/course.php?course_code={{course_code}}")
    }
    pub fn program_url() -> String {
        format!("{CATALOG}/program.php?fac_prog={{dept_code}}")
    }

    // Artifact defaults
    pub fn status_key() -> String {
        "status.json".into()
    }
    pub fn departments_key() -> String {
        "departments.json".into()
    }
    pub fn departments_noprefix_key() -> String {
        "departmentsNoPrefix.json".into()
    }
    pub fn data_key() -> String {
        "data.json".into()
    }
    pub fn musts_key() -> String {
        "musts.json".into()
    }
    pub fn last_updated_key() -> String {
        "lastUpdated.json".into()
    }
    pub fn manual_prefixes_key() -> String {
        "manualPrefixes.json".into()
    }
    pub fn manifest_key() -> String {
        "manifest.json".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.crawler.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_template_without_placeholder() {
        let mut config = Config::default();
        config.catalog.course_url = "https://example.com/course.php".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_reports_malformed_url_by_key() {
        let mut config = Config::default();
        config.catalog.program_url = "not a url {dept_code}".to_string();
        match config.validate() {
            Err(AppError::Validation(message)) => {
                assert!(message.starts_with("catalog.program_url is not a URL"))
            }
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_duplicate_artifact_names() {
        let mut config = Config::default();
        config.storage.musts = config.storage.data.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            max_attempts = 3

            [storage]
            prefix = "catalog/"
            "#,
        )
        .unwrap();

        assert_eq!(config.crawler.max_attempts, 3);
        assert_eq!(config.crawler.request_delay_ms, 100);
        assert_eq!(config.storage.key("data.json"), "catalog/data.json");
    }

    #[test]
    fn templates_substitute_placeholders() {
        let catalog = CatalogConfig::with_base("http://localhost:8080/");
        assert_eq!(
            catalog.department("571", "20241"),
            "http://localhost:8080/main.php?select_dept=571&select_semester=20241"
        );
        assert_eq!(
            catalog.prefix_probe("5710111"),
            "http://localhost:8080/course.php?course_code=5710111"
        );
    }
}
