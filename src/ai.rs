//! External classifier boundary: a pluggable category assigner for tabs no
//! rule matched, backed by a chat-completion endpoint.
//!
//! The wire contract is index-addressed: the request carries an ordered list
//! of `{title, url}` descriptors and the reply is a JSON array of
//! `{category, indices}` objects addressing that order. Models routinely wrap
//! the JSON in a markdown code fence, which is stripped before parsing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::error::Error;
use crate::tab_data::Tab;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that categorizes browser tabs into \
    groups. Respond only with a JSON array where each element has a \"category\" and \"indices\" \
    field. The category should be a short, descriptive name, and indices should be an array of \
    tab indices that belong to that category.";

/// What the classifier sees of a tab.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TabDescriptor {
    pub title: String,
    pub url: String,
}

impl TabDescriptor {
    pub fn from_tab(tab: &Tab) -> TabDescriptor {
        TabDescriptor {
            title: tab.title.clone(),
            url: tab.url.clone(),
        }
    }
}

/// One category in a classifier reply, addressing tabs by request index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryAssignment {
    pub category: String,
    pub indices: Vec<usize>,
}

/// A strategy that assigns categories to tabs the rule pass left unmatched.
#[async_trait(?Send)]
pub trait TabClassifier {
    async fn classify(&self, tabs: &[TabDescriptor]) -> Result<Vec<CategoryAssignment>, Error>;
}

/// Classifier backed by an OpenAI-style chat-completion endpoint.
pub struct ChatCompletionClassifier {
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionClassifier {
    pub fn new(api_url: String, api_key: String) -> ChatCompletionClassifier {
        ChatCompletionClassifier {
            api_url,
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    fn request_body(&self, tabs: &[TabDescriptor]) -> Result<String, Error> {
        let listing = serde_json::to_string_pretty(tabs)
            .map_err(|err| Error::ClassifierRequest(err.to_string()))?;
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": format!("Please categorize these tabs:\n{listing}") },
            ],
        });
        Ok(payload.to_string())
    }

    async fn post(&self, body: String) -> Result<String, Error> {
        let request_failed = |err: JsValue| Error::ClassifierRequest(format!("{err:?}"));

        let opts = web_sys::RequestInit::new();
        opts.set_method("POST");
        opts.set_body(&JsValue::from_str(&body));

        let request = web_sys::Request::new_with_str_and_init(&self.api_url, &opts)
            .map_err(request_failed)?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(request_failed)?;
        request
            .headers()
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .map_err(request_failed)?;

        let window = web_sys::window()
            .ok_or_else(|| Error::ClassifierRequest("no window for fetch".to_string()))?;
        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(request_failed)?;
        let response: web_sys::Response = response
            .dyn_into()
            .map_err(|_| Error::ClassifierRequest("fetch returned a non-response".to_string()))?;

        if !response.ok() {
            return Err(Error::ClassifierRequest(format!(
                "http status {}",
                response.status()
            )));
        }

        let text = JsFuture::from(response.text().map_err(request_failed)?)
            .await
            .map_err(request_failed)?;
        text.as_string()
            .ok_or_else(|| Error::ClassifierResponse("response body was not text".to_string()))
    }
}

#[async_trait(?Send)]
impl TabClassifier for ChatCompletionClassifier {
    async fn classify(&self, tabs: &[TabDescriptor]) -> Result<Vec<CategoryAssignment>, Error> {
        let body = self.request_body(tabs)?;
        let reply = self.post(body).await?;
        let content = completion_content(&reply)?;
        parse_assignments(&content)
    }
}

/// Pull the completion text out of a chat-completion response body.
fn completion_content(body: &str) -> Result<String, Error> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|err| Error::ClassifierResponse(err.to_string()))?;
    value
        .pointer("/choices/0/message/content")
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::ClassifierResponse("completion has no message content".to_string()))
}

/// Strip one surrounding ``` or ```json fence, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse classifier content into category assignments.
pub fn parse_assignments(content: &str) -> Result<Vec<CategoryAssignment>, Error> {
    serde_json::from_str(strip_code_fence(content))
        .map_err(|err| Error::ClassifierResponse(err.to_string()))
}
