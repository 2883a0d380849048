//! Service configuration.
//!
//! Every endpoint, credential, and knob the pipeline needs lives in one
//! immutable [`ServiceConfig`], built once at process entry (usually via
//! [`ServiceConfig::from_env`]) and passed by reference into each component.
//! Nothing in the pipeline reads the environment after startup, so two
//! invocations with the same config are guaranteed to hit the same
//! collaborators.

use crate::error::IngestError;
use std::fmt;

/// Default Vision annotate endpoint.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Default base URL for the generative-model API.
pub const DEFAULT_MODEL_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model identifier for structuring.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Configuration for the form2report service.
///
/// Built via [`ServiceConfig::builder()`] in code or
/// [`ServiceConfig::from_env()`] at process entry.
///
/// # Example
/// ```rust
/// use form2report::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .vision_api_key("vis-key")
///     .model_api_key("gen-key")
///     .store_url("https://example.supabase.co")
///     .store_service_role_key("service-role")
///     .build()
///     .unwrap();
/// assert_eq!(config.table, "hazard_reports");
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Vision `images:annotate` endpoint.
    pub vision_endpoint: String,

    /// API key for the Vision endpoint (passed as the `key` query parameter).
    pub vision_api_key: String,

    /// Base URL for the generative-model API (no trailing slash).
    pub model_base_url: String,

    /// Model identifier used for structuring, e.g. "gemini-1.5-flash-latest".
    pub model: String,

    /// API key for the model endpoint.
    pub model_api_key: String,

    /// Store base URL (the project URL, no trailing slash).
    pub store_url: String,

    /// Service-role key. The pipeline runs as a trusted backend principal;
    /// this key bypasses row-level security on insert.
    pub store_service_role_key: String,

    /// Target table for persisted reports. Default: "hazard_reports".
    pub table: String,

    /// OCR call timeout in seconds. Default: 30.
    ///
    /// The annotate call is a single unbounded network dependency on the
    /// critical path; an explicit cap keeps a stuck upstream from pinning
    /// the invocation forever.
    pub ocr_timeout_secs: u64,

    /// Model call timeout in seconds. Default: 60.
    pub model_timeout_secs: u64,

    /// Store insert timeout in seconds. Default: 10.
    pub insert_timeout_secs: u64,

    /// Sampling temperature for the structuring completion. Default: 0.1.
    ///
    /// Near-zero keeps the model faithful to what the form actually says;
    /// creativity only hurts field extraction.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 1024.
    ///
    /// A seven-field JSON object fits comfortably; the cap bounds cost when
    /// the model ignores the JSON-only instruction and rambles.
    pub max_output_tokens: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            vision_api_key: String::new(),
            model_base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            model_api_key: String::new(),
            store_url: String::new(),
            store_service_role_key: String::new(),
            table: "hazard_reports".to_string(),
            ocr_timeout_secs: 30,
            model_timeout_secs: 60,
            insert_timeout_secs: 10,
            temperature: 0.1,
            max_output_tokens: 1024,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    // Credentials never reach logs; only their presence is shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("vision_endpoint", &self.vision_endpoint)
            .field("vision_api_key", &redact(&self.vision_api_key))
            .field("model_base_url", &self.model_base_url)
            .field("model", &self.model)
            .field("model_api_key", &redact(&self.model_api_key))
            .field("store_url", &self.store_url)
            .field(
                "store_service_role_key",
                &redact(&self.store_service_role_key),
            )
            .field("table", &self.table)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("model_timeout_secs", &self.model_timeout_secs)
            .field("insert_timeout_secs", &self.insert_timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// Variables:
    /// - `GOOGLE_VISION_API_KEY` — Vision API key (required)
    /// - `GOOGLE_API_KEY` — model API key (required)
    /// - `SUPABASE_URL` — store project URL (required)
    /// - `SUPABASE_SERVICE_ROLE_KEY` — store service-role key (required)
    /// - `VISION_ENDPOINT`, `MODEL_BASE_URL`, `MODEL_ID`,
    ///   `HAZARD_REPORTS_TABLE` — optional overrides
    /// - `OCR_TIMEOUT_SECS`, `MODEL_TIMEOUT_SECS`, `INSERT_TIMEOUT_SECS` —
    ///   optional timeout overrides
    pub fn from_env() -> Result<Self, IngestError> {
        let mut builder = Self::builder()
            .vision_api_key(env_var("GOOGLE_VISION_API_KEY"))
            .model_api_key(env_var("GOOGLE_API_KEY"))
            .store_url(env_var("SUPABASE_URL"))
            .store_service_role_key(env_var("SUPABASE_SERVICE_ROLE_KEY"));

        if let Some(v) = opt_env_var("VISION_ENDPOINT") {
            builder = builder.vision_endpoint(v);
        }
        if let Some(v) = opt_env_var("MODEL_BASE_URL") {
            builder = builder.model_base_url(v);
        }
        if let Some(v) = opt_env_var("MODEL_ID") {
            builder = builder.model(v);
        }
        if let Some(v) = opt_env_var("HAZARD_REPORTS_TABLE") {
            builder = builder.table(v);
        }
        if let Some(secs) = parse_secs("OCR_TIMEOUT_SECS")? {
            builder = builder.ocr_timeout_secs(secs);
        }
        if let Some(secs) = parse_secs("MODEL_TIMEOUT_SECS")? {
            builder = builder.model_timeout_secs(secs);
        }
        if let Some(secs) = parse_secs("INSERT_TIMEOUT_SECS")? {
            builder = builder.insert_timeout_secs(secs);
        }

        builder.build()
    }
}

fn env_var(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

fn opt_env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_secs(name: &str) -> Result<Option<u64>, IngestError> {
    match opt_env_var(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<u64>().map(Some).map_err(|_| {
            IngestError::InvalidConfig(format!("{name} must be an integer, got '{raw}'"))
        }),
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn vision_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.vision_endpoint = url.into();
        self
    }

    pub fn vision_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.vision_api_key = key.into();
        self
    }

    pub fn model_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.model_base_url = trim_trailing_slash(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn model_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.model_api_key = key.into();
        self
    }

    pub fn store_url(mut self, url: impl Into<String>) -> Self {
        self.config.store_url = trim_trailing_slash(url.into());
        self
    }

    pub fn store_service_role_key(mut self, key: impl Into<String>) -> Self {
        self.config.store_service_role_key = key.into();
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.config.table = table.into();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs.max(1);
        self
    }

    pub fn model_timeout_secs(mut self, secs: u64) -> Self {
        self.config.model_timeout_secs = secs.max(1);
        self
    }

    pub fn insert_timeout_secs(mut self, secs: u64) -> Self {
        self.config.insert_timeout_secs = secs.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n.max(1);
        self
    }

    /// Build the configuration, validating that every credential the
    /// pipeline needs is present.
    pub fn build(self) -> Result<ServiceConfig, IngestError> {
        let c = &self.config;
        let mut missing: Vec<&str> = Vec::new();
        if c.vision_api_key.is_empty() {
            missing.push("vision_api_key (GOOGLE_VISION_API_KEY)");
        }
        if c.model_api_key.is_empty() {
            missing.push("model_api_key (GOOGLE_API_KEY)");
        }
        if c.store_url.is_empty() {
            missing.push("store_url (SUPABASE_URL)");
        }
        if c.store_service_role_key.is_empty() {
            missing.push("store_service_role_key (SUPABASE_SERVICE_ROLE_KEY)");
        }
        if !missing.is_empty() {
            return Err(IngestError::InvalidConfig(format!(
                "missing: {}",
                missing.join(", ")
            )));
        }
        if c.table.is_empty() {
            return Err(IngestError::InvalidConfig("table must not be empty".into()));
        }
        Ok(self.config)
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
