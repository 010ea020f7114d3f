//! AI-assisted upgrade suggestions.
//!
//! A [`TextGenerator`] turns a prompt into free text. [`Suggester`] builds the
//! prompts from the current board, treats every reply as untrusted input and
//! commits the result through the upgrade store. The network call is awaited
//! outside any store lock.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::models::{NewUpgrade, Task, Upgrade};
use super::store::StoreHandle;
use super::upgrades::MAX_ACTIVE_UPGRADES;
use crate::config::{API_KEY_ENV, SuggestionSettings};
use crate::errors::{BoardError, BoardResult};

/// Most suggestions requested in one generation round.
pub const MAX_SUGGESTIONS_PER_ROUND: usize = 5;

/// Tasks included in the generation prompt as context.
pub const TASK_CONTEXT_LIMIT: usize = 30;

const TITLE_MAX_CHARS: usize = 60;
const GENERATE_MAX_TOKENS: u32 = 2000;
const RERANK_MAX_TOKENS: u32 = 500;
const ANTHROPIC_VERSION: &str = "2023-06-01";

const GENERATE_SYSTEM_PROMPT: &str = "You are the assistant built into a personal task board. \
You look at the user's current work and at your own capabilities and propose upgrades \
that would make you more useful: new tools or integrations, workflow features, \
automations that save time, and optimizations of what already exists. \
Every upgrade must be specific, actionable and clearly valuable.";

/// One prompt for the text-generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
}

/// Produces free text for a prompt.
/// Real implementation: `AnthropicClient`. Test double: `testing::FakeGenerator`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

// ── Anthropic Messages API ───────────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(settings: &SuggestionSettings, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build HTTP client for text generation")?;
        Ok(Self {
            http,
            api_url: settings.api_url.clone(),
            api_key,
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: request.system.as_deref(),
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };
        let resp = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .context("Failed to reach the text-generation service")?
            .error_for_status()
            .context("Text-generation service returned error status")?;
        let parsed = resp
            .json::<MessagesResponse>()
            .await
            .context("Failed to parse text-generation response")?;
        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .context("No text response from AI")
    }
}

// ── Reply parsing ────────────────────────────────────────────────────

/// Strip an optional Markdown code fence from a model reply. If prose
/// surrounds the JSON, fall back to the outermost `[`..`]` slice.
pub fn strip_code_fences(reply: &str) -> &str {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("json") along with the opening fence line.
        text = rest.split_once('\n').map_or("", |(_, body)| body);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();
    if text.starts_with('[') {
        return text;
    }
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn parse_array(reply: &str) -> BoardResult<Vec<Value>> {
    let value: Value = serde_json::from_str(strip_code_fences(reply)).map_err(|_| {
        BoardError::ExternalService("Failed to parse AI response as JSON".to_string())
    })?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(BoardError::ExternalService(
            "AI response is not an array".to_string(),
        )),
    }
}

fn string_field(item: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Validate a generation reply into upgrade drafts. Elements that are not
/// objects are dropped; missing or malformed fields take fallbacks.
pub fn parse_suggestions(reply: &str) -> BoardResult<Vec<NewUpgrade>> {
    let drafts = parse_array(reply)?
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .map(|item| NewUpgrade {
            title: Some(
                string_field(&item, "title")
                    .map(|t| t.chars().take(TITLE_MAX_CHARS).collect())
                    .unwrap_or_else(|| "Untitled".to_string()),
            ),
            description: Some(string_field(&item, "description").unwrap_or_default()),
            category: Some(
                string_field(&item, "category")
                    .map(|c| c.to_lowercase())
                    .unwrap_or_else(|| "feature".to_string()),
            ),
            status: None,
            rank: None,
            estimated_impact: Some(string_field(&item, "estimatedImpact").unwrap_or_default()),
        })
        .collect();
    Ok(drafts)
}

/// Parse a ranking reply: a JSON array of 1-based indices. Entries that are
/// not integers are ignored.
pub fn parse_ranking(reply: &str) -> BoardResult<Vec<i64>> {
    Ok(parse_array(reply)?
        .iter()
        .filter_map(Value::as_i64)
        .collect())
}

// ── Prompts ──────────────────────────────────────────────────────────

/// How many suggestions to request with `active` upgrades already open.
pub fn suggestion_count(active: usize) -> usize {
    MAX_SUGGESTIONS_PER_ROUND.min(MAX_ACTIVE_UPGRADES.saturating_sub(active))
}

pub fn generation_request(count: usize, upgrades: &[Upgrade], tasks: &[Task]) -> CompletionRequest {
    let existing = if upgrades.is_empty() {
        "No existing upgrades.".to_string()
    } else {
        upgrades
            .iter()
            .map(|u| {
                format!(
                    "- [{}] {}: {} (Category: {}, Impact: {})",
                    u.status.as_str(),
                    u.title,
                    u.description,
                    u.category,
                    u.estimated_impact
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let context = if tasks.is_empty() {
        "No tasks.".to_string()
    } else {
        tasks
            .iter()
            .map(|t| {
                let labels = if t.labels.is_empty() {
                    "none".to_string()
                } else {
                    t.labels.join(", ")
                };
                format!(
                    "- [{}] {} (Priority: {}, Labels: {})",
                    t.status,
                    t.title,
                    t.priority.as_str(),
                    labels
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let prompt = format!(
        "Analyze the current system state and suggest {count} high-value upgrades.

EXISTING UPGRADES (avoid duplicates):
{existing}

CURRENT TASKS (context on what the user is working on):
{context}

Respond with a JSON array of exactly {count} upgrades. Each upgrade has:
- \"title\": short, clear name (max 60 chars)
- \"description\": what it does and why it matters (2-3 sentences)
- \"category\": one of \"tool\", \"feature\", \"integration\", \"optimization\", \"automation\"
- \"estimatedImpact\": brief impact statement starting with \"High\", \"Medium\", or \"Low\"

Respond ONLY with the JSON array, no other text."
    );

    CompletionRequest {
        system: Some(GENERATE_SYSTEM_PROMPT.to_string()),
        prompt,
        max_tokens: GENERATE_MAX_TOKENS,
    }
}

pub fn rerank_request(active: &[Upgrade]) -> CompletionRequest {
    let list = active
        .iter()
        .enumerate()
        .map(|(i, u)| {
            format!(
                "{}. \"{}\" - {} (Impact: {})",
                i + 1,
                u.title,
                u.description,
                u.estimated_impact
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    CompletionRequest {
        system: None,
        prompt: format!(
            "Rank these upgrades from highest to lowest value. Consider impact, feasibility, and strategic importance.

{list}

Respond ONLY with a JSON array of the original numbers in ranked order (highest value first). Example: [3, 1, 2]"
        ),
        max_tokens: RERANK_MAX_TOKENS,
    }
}

// ── Flows ────────────────────────────────────────────────────────────

/// Runs the generate and rerank flows against a board store.
#[derive(Clone)]
pub struct Suggester {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Suggester {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    /// A suggester backed by the Anthropic API, or a disabled one when no
    /// usable key is configured.
    pub fn from_settings(settings: &SuggestionSettings) -> Result<Self> {
        let generator = match settings.api_key() {
            Some(key) => {
                let client: Arc<dyn TextGenerator> = Arc::new(AnthropicClient::new(settings, key)?);
                Some(client)
            }
            None => None,
        };
        Ok(Self { generator })
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Ask for new proposed upgrades, store them, then rerank best-effort.
    pub async fn generate(&self, store: &StoreHandle) -> BoardResult<Vec<Upgrade>> {
        let Some(generator) = &self.generator else {
            return Err(BoardError::Configuration(format!(
                "{} not configured. Please set it in your .env file.",
                API_KEY_ENV
            )));
        };

        let (upgrades, tasks) = store
            .call(|s| Ok((s.upgrades.list(None)?, s.tasks.peek(TASK_CONTEXT_LIMIT)?)))
            .await?;
        let active = upgrades.iter().filter(|u| u.status.is_active()).count();
        if active >= MAX_ACTIVE_UPGRADES {
            return Err(BoardError::Capacity {
                max: MAX_ACTIVE_UPGRADES,
            });
        }
        let count = suggestion_count(active);

        tracing::info!(count, active, "requesting upgrade suggestions");
        let reply = generator
            .complete(generation_request(count, &upgrades, &tasks))
            .await
            .map_err(|e| BoardError::ExternalService(format!("Failed to generate upgrades: {:#}", e)))?;
        let drafts = parse_suggestions(&reply)?;
        if drafts.len() != count {
            tracing::debug!(requested = count, received = drafts.len(), "suggestion count mismatch");
        }

        let created = store.call(move |s| s.upgrades.create_proposed(drafts)).await?;
        tracing::info!(created = created.len(), "stored generated upgrades");

        self.rerank(store).await;
        Ok(created)
    }

    /// Rerank active upgrades, logging and swallowing any failure.
    pub async fn rerank(&self, store: &StoreHandle) {
        if let Err(e) = self.try_rerank(store).await {
            tracing::warn!(error = %e, "upgrade rerank failed");
        }
    }

    /// Rerank active upgrades. Returns how many ranks were assigned; a
    /// disabled suggester or fewer than two active upgrades is a no-op.
    pub async fn try_rerank(&self, store: &StoreHandle) -> BoardResult<usize> {
        let Some(generator) = &self.generator else {
            return Ok(0);
        };
        let active = store.call(|s| s.upgrades.active()).await?;
        if active.len() < 2 {
            return Ok(0);
        }

        let reply = generator
            .complete(rerank_request(&active))
            .await
            .map_err(|e| BoardError::ExternalService(format!("Failed to rerank upgrades: {:#}", e)))?;
        let ranking = parse_ranking(&reply)?;
        store
            .call(move |s| s.upgrades.apply_ranking(&active, &ranking))
            .await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays scripted replies in order and records every request.
    #[derive(Default)]
    pub struct FakeGenerator {
        replies: Mutex<VecDeque<Result<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeGenerator {
        pub fn with_replies(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            }
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted reply left")))
        }
    }
}
