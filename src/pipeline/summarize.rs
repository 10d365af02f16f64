//! Per-table summarisation through a hosted generative model.
//!
//! ## Retry Strategy
//!
//! Rate limits (HTTP 429) and transient 5xx answers are common when several
//! tables are summarised at once. Each attempt is bounded by
//! `api_timeout_secs`; failed attempts are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`, capped at [`MAX_RETRY_BACKOFF_MS`]).
//! Once retries run out the table gets
//! a [`TableError`] and the request carries on with the other tables.

use crate::config::ExtractorConfig;
use crate::error::{GenerationError, PdfTablesError, TableError};
use crate::output::{CleanedTable, TableOutcome};
use crate::progress::ProgressCallback;
use crate::prompts::{summary_prompt, EMPTY_TABLE_SUMMARY};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Upper bound on a single retry delay.
pub const MAX_RETRY_BACKOFF_MS: u64 = 30_000;

/// Sampling parameters passed to every generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: usize,
}

/// Text generation collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;
}

/// Everything [`summarize_content`] needs from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct SummarySettings {
    pub options: GenerationOptions,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl SummarySettings {
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            options: GenerationOptions {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            timeout_secs: config.api_timeout_secs,
        }
    }
}

/// Summarise the cleaned text of table `table_index`.
///
/// Blank content short-circuits to [`EMPTY_TABLE_SUMMARY`] and the generator
/// is never called.
pub async fn summarize_content(
    generator: &Arc<dyn TextGenerator>,
    content: &str,
    table_index: usize,
    settings: &SummarySettings,
) -> Result<String, TableError> {
    if content.trim().is_empty() {
        debug!("Table {}: empty, skipping model call", table_index);
        return Ok(EMPTY_TABLE_SUMMARY.to_string());
    }

    let prompt = summary_prompt(content);
    let start = Instant::now();
    let mut last_err: Option<TableError> = None;

    for attempt in 0..=settings.max_retries {
        if attempt > 0 {
            let backoff = retry_delay(settings.retry_backoff_ms, attempt);
            warn!(
                "Table {}: retry {}/{} after {:?}",
                table_index, attempt, settings.max_retries, backoff
            );
            sleep(backoff).await;
        }

        let call = generator.generate(&prompt, &settings.options);
        match timeout(Duration::from_secs(settings.timeout_secs), call).await {
            Ok(Ok(summary)) => {
                debug!(
                    "Table {}: {} chars summary in {:?}",
                    table_index,
                    summary.len(),
                    start.elapsed()
                );
                return Ok(summary);
            }
            Ok(Err(e)) => {
                warn!("Table {}: attempt {} failed: {}", table_index, attempt + 1, e);
                let permanent = matches!(e, GenerationError::MissingApiKey);
                last_err = Some(TableError::Summary {
                    table: table_index,
                    reason: e.to_string(),
                });
                if permanent {
                    break;
                }
            }
            Err(_) => {
                warn!(
                    "Table {}: attempt {} timed out after {}s",
                    table_index,
                    attempt + 1,
                    settings.timeout_secs
                );
                last_err = Some(TableError::Timeout {
                    table: table_index,
                    secs: settings.timeout_secs,
                });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| TableError::Summary {
        table: table_index,
        reason: "Unknown error".to_string(),
    }))
}

/// Delay before retry number `attempt` (1-based).
fn retry_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_RETRY_BACKOFF_MS))
}

/// Summarise every cleaned table with at most `concurrency` calls in flight.
///
/// `cleaned` holds one entry per detected table in detection order; outcomes
/// come back in the same order whatever order the calls finish in.
pub async fn summarize_tables(
    generator: &Arc<dyn TextGenerator>,
    cleaned: Vec<Result<CleanedTable, TableError>>,
    settings: &SummarySettings,
    concurrency: usize,
    progress: Option<&ProgressCallback>,
) -> Vec<TableOutcome> {
    let total = cleaned.len();
    let generator = Arc::clone(generator);
    let settings = *settings;
    let progress = progress.cloned();

    let outcomes: Vec<TableOutcome> = stream::iter(cleaned.into_iter().enumerate().map(
        move |(pos, cleaned)| {
            let generator = Arc::clone(&generator);
            let progress = progress.clone();
            async move {
                let table_index = pos + 1;
                if let Some(ref cb) = progress {
                    cb.on_table_start(table_index, total);
                }

                let outcome = match cleaned {
                    Err(error) => TableOutcome::CleaningFailed { table_index, error },
                    Ok(table) => {
                        match summarize_content(&generator, &table.content, table_index, &settings)
                            .await
                        {
                            Ok(summary) => TableOutcome::Summarized { table, summary },
                            Err(error) => TableOutcome::SummaryFailed { table, error },
                        }
                    }
                };

                if let Some(ref cb) = progress {
                    match outcome.error() {
                        None => cb.on_table_complete(
                            table_index,
                            total,
                            outcome.summary_text().len(),
                        ),
                        Some(e) => cb.on_table_error(table_index, total, &e.to_string()),
                    }
                }
                outcome
            }
            .boxed()
        },
    ))
    .buffered(concurrency.max(1))
    .collect()
    .await;

    info!(
        "Summarised {}/{} tables",
        outcomes.iter().filter(|o| o.is_success()).count(),
        total
    );
    outcomes
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// [`TextGenerator`] backed by any edgequake-llm provider.
pub struct ProviderGenerator {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Build a provider by name (`openai`, `anthropic`, `ollama`, ...).
    ///
    /// The provider reads its own credentials from the environment.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, PdfTablesError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            PdfTablesError::Configuration {
                tool: format!("LLM provider '{provider_name}'"),
                detail: e.to_string(),
                hint: "Set the provider's API key variable or unset PDFTABLES_PROVIDER to use Gemini."
                    .to_string(),
            }
        })?;
        Ok(Self::new(provider))
    }
}

#[async_trait]
impl TextGenerator for ProviderGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        chat_completion(self.provider.as_ref(), prompt, options).await
    }
}

/// One single-turn chat call against `provider`.
pub(crate) async fn chat_completion(
    provider: &dyn LLMProvider,
    prompt: &str,
    options: &GenerationOptions,
) -> Result<String, GenerationError> {
    let messages = vec![ChatMessage::user(prompt)];
    let options = CompletionOptions {
        temperature: Some(options.temperature),
        max_tokens: Some(options.max_output_tokens),
        ..Default::default()
    };
    let response = provider.chat(&messages, Some(&options)).await?;
    Ok(response.content)
}
