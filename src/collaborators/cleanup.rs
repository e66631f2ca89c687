//! Article body cleanup through an OpenAI-compatible chat completions API.
//!
//! The default backend is Groq. Cleanup is best-effort: [`clean_or_raw`]
//! returns the unmodified body whenever the call fails or yields nothing.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

pub const DEFAULT_GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_GROQ_MODEL: &str = "llama3-70b-8192";

/// Turns a raw extracted body into a cleaned one.
pub trait TextCleaner {
    /// Return a cleaned version of `body`.
    ///
    /// # Arguments
    ///
    /// * `title` - Article title, given to the model as context
    /// * `body` - Raw extracted body
    ///
    /// # Errors
    ///
    /// Any transport or API failure; callers fall back to the raw body.
    async fn clean(&self, title: &str, body: &str) -> Result<String, Box<dyn Error>>;
}

/// `None` passes the body through untouched.
impl<T: TextCleaner> TextCleaner for Option<T> {
    async fn clean(&self, title: &str, body: &str) -> Result<String, Box<dyn Error>> {
        match self {
            Some(cleaner) => cleaner.clean(title, body).await,
            None => Ok(body.to_string()),
        }
    }
}

/// Clean `body`, falling back to it unchanged on any failure.
#[instrument(level = "info", skip_all, fields(%title))]
pub async fn clean_or_raw<C: TextCleaner>(cleaner: &C, title: &str, body: &str) -> String {
    match cleaner.clean(title, body).await {
        Ok(cleaned) if !cleaned.trim().is_empty() => cleaned,
        Ok(_) => {
            warn!("Cleanup returned an empty body; keeping extracted text");
            body.to_string()
        }
        Err(e) => {
            warn!(error = %e, "Cleanup failed; keeping extracted text");
            body.to_string()
        }
    }
}

fn cleanup_prompt(title: &str, body: &str) -> String {
    format!(
        "Clean the following article content:\n\
         - Remove ads, social media mentions, \"share\", \"subscribe\", \"sign in\", \"sign up\", or any unrelated text.\n\
         - Preserve the article's main content only.\n\
         - Do not preface the answer with a sentence like \"Here is the cleaned-up article content\".\n\
         - Return the full article without cutting it short.\n\
         \n\
         Title: {title}\n\
         Body:\n\
         {body}\n"
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatResponse {
    fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
    }
}

/// Groq chat-completions client.
#[derive(Debug, Clone)]
pub struct GroqCleaner {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl GroqCleaner {
    /// Create a client with a 120 second request timeout.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token for the endpoint
    /// * `endpoint` - Chat-completions URL, usually [`DEFAULT_GROQ_ENDPOINT`]
    /// * `model` - Model name, usually [`DEFAULT_GROQ_MODEL`]
    ///
    /// # Errors
    ///
    /// Returns a `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(api_key: &str, endpoint: &str, model: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: 2000,
        })
    }
}

impl TextCleaner for GroqCleaner {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn clean(&self, title: &str, body: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: cleanup_prompt(title, body),
            }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(format!("cleanup API returned {status}: {message}").into());
        }

        let content = response
            .json::<ChatResponse>()
            .await?
            .first_content()
            .ok_or("cleanup API returned no choices")?;

        info!(
            elapsed_ms = t0.elapsed().as_millis(),
            bytes_in = body.len(),
            bytes_out = content.len(),
            "Cleaned article body"
        );
        Ok(content)
    }
}
