use crate::error::{BillingError, Result};
use crate::mail::graph;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const REDACTED: &str = "********";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Epics API
    #[serde(default = "default_api_base")]
    pub epics_api_base: String,

    /// Mendix personal access token, sent as `MxToken <pat>`
    #[serde(default)]
    pub mendix_pat: String,

    /// Mendix app (project) id
    #[serde(default)]
    pub mendix_app_id: String,

    /// Price charged per story point
    #[serde(default = "default_price_per_point")]
    pub price_per_point: f64,

    /// Symbol prefixed to every formatted amount
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Status labels that count as completed (case-insensitive)
    #[serde(default = "default_completed_status_names")]
    pub completed_status_names: Vec<String>,

    /// Number of stories requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Upper bound on pages fetched in one run
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Mail settings
    #[serde(default)]
    pub email: EmailConfig,
}

/// Settings for the billing email and Microsoft Graph delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Recipient address
    pub to: Option<String>,

    /// Sender mailbox (also the Graph user the mail is sent as)
    pub from: Option<String>,

    /// Subject line
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Send the rendered email through Microsoft Graph
    #[serde(default)]
    pub send_via_graph: bool,

    /// Azure AD tenant id
    pub tenant_id: Option<String>,

    /// Azure AD application (client) id
    pub client_id: Option<String>,

    /// Azure AD client secret
    pub client_secret: Option<String>,

    /// Token authority host (differs for national clouds)
    #[serde(default = "default_authority_url")]
    pub authority_url: String,

    /// Graph API root
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
}

impl Config {
    /// Load configuration from an explicit file, the default file if present,
    /// or defaults, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::load_from(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BillingError::config(format!(
                "Config file not found at: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| BillingError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join("story-billing").join("config.toml"))
    }

    /// Write a default configuration file to `path`
    pub fn create_default_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(path, toml_string)?;

        Ok(config)
    }

    /// Override fields from environment-style variables.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("EPICS_API_BASE") {
            self.epics_api_base = v;
        }
        if let Some(v) = get("MENDIX_PAT") {
            self.mendix_pat = v;
        }
        if let Some(v) = get("MENDIX_APP_ID") {
            self.mendix_app_id = v;
        }
        if let Some(v) = get("PRICE_PER_POINT") {
            self.price_per_point = parse_number("PRICE_PER_POINT", &v)?;
        }
        // The symbol is not trimmed so "R$ " style prefixes survive
        if let Some(v) = lookup("CURRENCY_SYMBOL").filter(|v| !v.is_empty()) {
            self.currency_symbol = v;
        }
        if let Some(v) = get("COMPLETED_STATUS_NAMES") {
            self.completed_status_names = split_list(&v);
        }
        if let Some(v) = get("EPICS_PAGE_SIZE") {
            self.page_size = parse_number("EPICS_PAGE_SIZE", &v)?;
        }
        if let Some(v) = get("EPICS_MAX_PAGES") {
            self.max_pages = parse_number("EPICS_MAX_PAGES", &v)?;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", &v)?;
        }

        if let Some(v) = get("EMAIL_TO") {
            self.email.to = Some(v);
        }
        if let Some(v) = get("EMAIL_FROM") {
            self.email.from = Some(v);
        }
        if let Some(v) = get("EMAIL_SUBJECT") {
            self.email.subject = v;
        }
        if let Some(v) = get("SEND_VIA_GRAPH") {
            self.email.send_via_graph = v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = get("TENANT_ID") {
            self.email.tenant_id = Some(v);
        }
        if let Some(v) = get("CLIENT_ID") {
            self.email.client_id = Some(v);
        }
        if let Some(v) = get("CLIENT_SECRET") {
            self.email.client_secret = Some(v);
        }
        if let Some(v) = get("GRAPH_AUTHORITY_URL") {
            self.email.authority_url = v;
        }
        if let Some(v) = get("GRAPH_API_URL") {
            self.email.graph_url = v;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.mendix_pat.trim().is_empty() {
            return Err(BillingError::missing("MENDIX_PAT"));
        }

        if self.mendix_app_id.trim().is_empty() {
            return Err(BillingError::missing(
                "MENDIX_APP_ID (your Mendix app/project ID)",
            ));
        }

        if !self.epics_api_base.starts_with("http://") && !self.epics_api_base.starts_with("https://")
        {
            return Err(BillingError::config(
                "epics_api_base must be an http(s) URL",
            ));
        }

        if !self.price_per_point.is_finite() || self.price_per_point < 0.0 {
            return Err(BillingError::config(
                "price_per_point must be a non-negative number",
            ));
        }

        if self.completed_labels().is_empty() {
            return Err(BillingError::config(
                "completed_status_names must contain at least one label",
            ));
        }

        if self.page_size == 0 {
            return Err(BillingError::config("page_size must be > 0"));
        }

        if self.max_pages == 0 {
            return Err(BillingError::config("max_pages must be > 0"));
        }

        if self.request_timeout_secs == 0 {
            return Err(BillingError::config("request_timeout_secs must be > 0"));
        }

        if self.email.send_via_graph {
            self.email.graph_credentials()?;
        }

        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn api_base(&self) -> &str {
        self.epics_api_base.trim_end_matches('/')
    }

    /// Completed labels with blanks removed
    pub fn completed_labels(&self) -> Vec<String> {
        self.completed_status_names
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Copy of the configuration safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.mendix_pat.is_empty() {
            copy.mendix_pat = REDACTED.to_string();
        }
        if copy.email.client_secret.is_some() {
            copy.email.client_secret = Some(REDACTED.to_string());
        }
        copy
    }
}

/// Everything needed to send through Microsoft Graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub from: String,
    pub to: String,
}

impl EmailConfig {
    /// Collect Graph settings, failing if any is missing
    pub fn graph_credentials(&self) -> Result<GraphCredentials> {
        let required = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .ok_or_else(|| {
                    BillingError::missing(format!(
                        "{} (Graph send requires TENANT_ID, CLIENT_ID, CLIENT_SECRET, EMAIL_FROM, EMAIL_TO)",
                        name
                    ))
                })
        };

        Ok(GraphCredentials {
            tenant_id: required(&self.tenant_id, "TENANT_ID")?,
            client_id: required(&self.client_id, "CLIENT_ID")?,
            client_secret: required(&self.client_secret, "CLIENT_SECRET")?,
            from: required(&self.from, "EMAIL_FROM")?,
            to: required(&self.to, "EMAIL_TO")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            epics_api_base: default_api_base(),
            mendix_pat: String::new(),
            mendix_app_id: String::new(),
            price_per_point: default_price_per_point(),
            currency_symbol: default_currency_symbol(),
            completed_status_names: default_completed_status_names(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            request_timeout_secs: default_timeout(),
            email: EmailConfig::default(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            to: None,
            from: None,
            subject: default_subject(),
            send_via_graph: false,
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority_url: default_authority_url(),
            graph_url: default_graph_url(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| BillingError::config(format!("{} is not a valid number: {:?}", name, value)))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect()
}

// Serde default functions
fn default_api_base() -> String {
    "https://epics.api.mendix.com".to_string()
}

fn default_price_per_point() -> f64 {
    55.0
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_completed_status_names() -> Vec<String> {
    vec!["Done".to_string()]
}

fn default_page_size() -> u32 {
    200
}

fn default_max_pages() -> u32 {
    1000
}

fn default_timeout() -> u64 {
    60
}

fn default_authority_url() -> String {
    graph::AUTHORITY_URL.to_string()
}

fn default_graph_url() -> String {
    graph::GRAPH_API_URL.to_string()
}

fn default_subject() -> String {
    "Completed Stories - Billing Summary".to_string()
}
