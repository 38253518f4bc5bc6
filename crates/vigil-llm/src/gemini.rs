//! [`GeminiClient`] — `generateContent` over HTTPS.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_core::{
  collab::{ChatMessage, Extractor, Responder, Role},
  extraction::{RawExtraction, parse_extraction},
};

use crate::{
  Error, Result,
  prompt::{extraction_prompt, system_prompt},
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content>,
  contents:           Vec<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  generation_config:  Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
  #[serde(skip_serializing_if = "Option::is_none")]
  role:  Option<&'static str>,
  parts: Vec<Part>,
}

impl Content {
  fn text(role: Option<&'static str>, text: impl Into<String>) -> Self {
    Self { role, parts: vec![Part { text: text.into() }] }
  }
}

#[derive(Debug, Serialize)]
struct Part {
  text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
  text: Option<String>,
}

impl GenerateResponse {
  /// The concatenated text parts of the first candidate.
  fn into_text(self) -> Result<String> {
    let text: String = self
      .candidates
      .into_iter()
      .next()
      .and_then(|c| c.content)
      .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
      .unwrap_or_default();
    if text.trim().is_empty() {
      return Err(Error::EmptyResponse);
    }
    Ok(text)
  }
}

fn role_name(role: Role) -> &'static str {
  match role {
    Role::User => "user",
    Role::Assistant => "model",
  }
}

fn extraction_request(message: &str) -> GenerateRequest {
  GenerateRequest {
    system_instruction: None,
    contents:           vec![Content::text(Some("user"), extraction_prompt(message))],
    generation_config:  Some(GenerationConfig {
      response_mime_type: "application/json",
    }),
  }
}

fn conversation_request(
  context: &str,
  history: &[ChatMessage],
  input: &str,
) -> GenerateRequest {
  let mut contents: Vec<Content> = history
    .iter()
    .map(|m| Content::text(Some(role_name(m.role)), m.content.clone()))
    .collect();
  contents.push(Content::text(Some("user"), input));

  GenerateRequest {
    system_instruction: Some(Content::text(None, system_prompt(context))),
    contents,
    generation_config: None,
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Gemini API client.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GeminiClient {
  client:   reqwest::Client,
  api_key:  String,
  model:    String,
  base_url: String,
}

impl GeminiClient {
  pub fn new(api_key: impl Into<String>) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(120))
      .connect_timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self {
      client,
      api_key: api_key.into(),
      model: DEFAULT_MODEL.to_owned(),
      base_url: API_BASE.to_owned(),
    })
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  /// Point the client at another endpoint (a proxy or a test server).
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  fn url(&self) -> String {
    format!(
      "{}/models/{}:generateContent",
      self.base_url.trim_end_matches('/'),
      self.model
    )
  }

  fn headers(&self) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
      "x-goog-api-key",
      HeaderValue::from_str(&self.api_key)
        .map_err(|e| Error::Config(format!("invalid API key: {e}")))?,
    );
    Ok(headers)
  }

  async fn generate(&self, request: &GenerateRequest) -> Result<String> {
    let response = self
      .client
      .post(self.url())
      .headers(self.headers()?)
      .json(request)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status().as_u16();
      let message = response.text().await.unwrap_or_default();
      return Err(Error::Api { status, message });
    }

    let body: GenerateResponse = response.json().await?;
    body.into_text()
  }
}

impl Extractor for GeminiClient {
  type Error = Error;

  async fn extract(&self, text: &str) -> Result<RawExtraction> {
    let output = self.generate(&extraction_request(text)).await?;
    debug!(model = %self.model, bytes = output.len(), "extraction response");
    Ok(parse_extraction(&output)?)
  }
}

impl Responder for GeminiClient {
  type Error = Error;

  async fn respond(
    &self,
    system_context: &str,
    history: &[ChatMessage],
    input: &str,
  ) -> Result<String> {
    let request = conversation_request(system_context, history, input);
    self.generate(&request).await
  }
}
