//! Configuration types for table extraction and summarisation.
//!
//! All pipeline behaviour is controlled through [`ExtractorConfig`], built
//! via its [`ExtractorConfigBuilder`] or loaded with
//! [`ExtractorConfig::from_env`]. External tool locations (tesseract, java,
//! the tabula jar, pdfium) are plain fields so every deployment can point at
//! its own installation instead of relying on a process-wide default.

use crate::error::PdfTablesError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default Gemini model used for table summaries.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default Gemini model used for table embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Upper bound for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Platform default for the tesseract binary.
#[cfg(windows)]
pub const DEFAULT_TESSERACT_CMD: &str = r"C:\Program Files\Tesseract-OCR\tesseract.exe";
#[cfg(not(windows))]
pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";

/// Configuration for the extraction pipeline.
///
/// # Example
/// ```rust
/// use edgequake_pdftables::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .concurrency(2)
///     .temperature(0.2)
///     .ocr_enabled(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// API key for the hosted generation/embedding model (`GOOGLE_API_KEY`).
    ///
    /// Not validated at startup; a missing key surfaces as a per-table
    /// summary failure on first use.
    pub api_key: Option<String>,

    /// Generation model identifier. Default: `gemini-1.5-flash`.
    pub model: String,

    /// Embedding model identifier. Default: `text-embedding-004`.
    pub embedding_model: String,

    /// Dimension of the zero vector substituted for a failed embedding. Default: 768.
    pub embedding_dimension: usize,

    /// edgequake-llm provider name (`openai`, `anthropic`, `ollama`, ...).
    /// When set, summaries go through that provider instead of Gemini.
    pub provider_name: Option<String>,

    /// Sampling temperature for summaries. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate per summary. Default: 1000.
    pub max_output_tokens: usize,

    /// Retries per table on a failed generation call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-attempt generation timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Number of tables summarised (and pages OCR'd) at once. Default: 4.
    pub concurrency: usize,

    /// Directory holding the pdfium shared library. `None` uses the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Longest rendered page edge in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Whether rendered pages are passed through OCR. Default: true.
    pub ocr_enabled: bool,

    /// Tesseract binary. Default: platform specific, see [`DEFAULT_TESSERACT_CMD`].
    pub tesseract_cmd: PathBuf,

    /// Tesseract language pack. Default: `eng`.
    pub tesseract_lang: String,

    /// Per-page OCR timeout in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// Java binary used to run tabula. Default: `java`.
    pub java_cmd: PathBuf,

    /// Path to the tabula-java jar (`TABULA_JAR`). Default: `tabula.jar`.
    pub tabula_jar: PathBuf,

    /// Timeout for one tabula run over the whole document, in seconds. Default: 300.
    pub tabula_timeout_secs: u64,

    /// Optional per-table progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: 768,
            provider_name: None,
            temperature: 0.2,
            max_output_tokens: 1000,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            concurrency: 4,
            pdfium_lib_path: None,
            max_rendered_pixels: 2000,
            ocr_enabled: true,
            tesseract_cmd: PathBuf::from(DEFAULT_TESSERACT_CMD),
            tesseract_lang: "eng".to_string(),
            ocr_timeout_secs: 120,
            java_cmd: PathBuf::from("java"),
            tabula_jar: PathBuf::from("tabula.jar"),
            tabula_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("provider_name", &self.provider_name)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("ocr_enabled", &self.ocr_enabled)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("java_cmd", &self.java_cmd)
            .field("tabula_jar", &self.tabula_jar)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load the configuration from process environment variables.
    ///
    /// Unset or unparsable variables keep their defaults. Only the presence
    /// of values is read here; nothing is validated against the outside
    /// world until the pipeline runs.
    pub fn from_env() -> Result<Self, PdfTablesError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PdfTablesError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(key) = get("GOOGLE_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(model) = get("PDFTABLES_MODEL") {
            builder = builder.model(model);
        }
        if let Some(provider) = get("PDFTABLES_PROVIDER") {
            builder = builder.provider_name(provider);
        }
        if let Some(cmd) = get("TESSERACT_CMD") {
            builder = builder.tesseract_cmd(cmd);
        }
        if let Some(lang) = get("TESSERACT_LANG") {
            builder = builder.tesseract_lang(lang);
        }
        if let Some(jar) = get("TABULA_JAR") {
            builder = builder.tabula_jar(jar);
        }
        if let Some(java) = get("JAVA_CMD") {
            builder = builder.java_cmd(java);
        }
        if let Some(dir) = get("PDFIUM_LIB_PATH") {
            builder = builder.pdfium_lib_path(dir);
        }
        if let Some(n) = get("PDFTABLES_CONCURRENCY").and_then(|v| v.parse().ok()) {
            builder = builder.concurrency(n);
        }
        if let Some(n) = get("PDFTABLES_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            builder = builder.max_retries(n);
        }
        if let Some(secs) = get("PDFTABLES_API_TIMEOUT").and_then(|v| v.parse().ok()) {
            builder = builder.api_timeout_secs(secs);
        }
        if let Some(flag) = get("PDFTABLES_OCR") {
            builder = builder.ocr_enabled(parse_flag(&flag));
        }

        builder.build()
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    pub fn embedding_dimension(mut self, dim: usize) -> Self {
        self.config.embedding_dimension = dim.max(1);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    /// Retries after the first attempt, clamped to [`MAX_RETRIES_LIMIT`].
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES_LIMIT);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn pdfium_lib_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(dir.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr_enabled = v;
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn tesseract_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.tesseract_lang = lang.into();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn java_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.java_cmd = cmd.into();
        self
    }

    pub fn tabula_jar(mut self, jar: impl Into<PathBuf>) -> Self {
        self.config.tabula_jar = jar.into();
        self
    }

    pub fn tabula_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tabula_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, PdfTablesError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(PdfTablesError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_timeout_secs == 0 || c.ocr_timeout_secs == 0 || c.tabula_timeout_secs == 0 {
            return Err(PdfTablesError::InvalidConfig(
                "timeouts must be at least 1 second".into(),
            ));
        }
        if c.tesseract_cmd.as_os_str().is_empty() || c.java_cmd.as_os_str().is_empty() {
            return Err(PdfTablesError::InvalidConfig(
                "tool paths must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_summary_settings() {
        let c = ExtractorConfig::default();
        assert_eq!(c.model, "gemini-1.5-flash");
        assert_eq!(c.temperature, 0.2);
        assert_eq!(c.max_output_tokens, 1000);
        assert!(c.api_key.is_none());
        assert!(c.ocr_enabled);
    }

    #[test]
    fn builder_clamps_values() {
        let c = ExtractorConfig::builder()
            .concurrency(0)
            .temperature(5.0)
            .max_retries(70)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_retries, MAX_RETRIES_LIMIT);
    }

    #[test]
    fn lookup_clamps_retry_budget() {
        let lookup = |k: &str| (k == "PDFTABLES_MAX_RETRIES").then(|| "500".to_string());
        let c = ExtractorConfig::from_lookup(lookup).unwrap();
        assert_eq!(c.max_retries, MAX_RETRIES_LIMIT);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ExtractorConfig::builder()
            .api_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, PdfTablesError::InvalidConfig(_)));
    }

    #[test]
    fn lookup_reads_tool_locations() {
        let env: HashMap<&str, &str> = [
            ("GOOGLE_API_KEY", "secret"),
            ("TESSERACT_CMD", "/opt/tesseract/bin/tesseract"),
            ("TABULA_JAR", "/opt/tabula/tabula.jar"),
            ("PDFTABLES_CONCURRENCY", "8"),
            ("PDFTABLES_OCR", "off"),
        ]
        .into_iter()
        .collect();

        let c = ExtractorConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(c.api_key.as_deref(), Some("secret"));
        assert_eq!(c.tesseract_cmd, PathBuf::from("/opt/tesseract/bin/tesseract"));
        assert_eq!(c.tabula_jar, PathBuf::from("/opt/tabula/tabula.jar"));
        assert_eq!(c.concurrency, 8);
        assert!(!c.ocr_enabled);
    }

    #[test]
    fn blank_key_is_treated_as_missing() {
        let c = ExtractorConfig::from_lookup(|k| (k == "GOOGLE_API_KEY").then(|| "  ".into()))
            .unwrap();
        assert!(c.api_key.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ExtractorConfig::builder().api_key("sk-123").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-123"));
        assert!(dbg.contains("<redacted>"));
    }
}
