//! HttpSource - a collection served by the library REST API.

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde_json::Value;

use super::envelope::{decode_item, decode_list, error_message};
use super::{CollectionSource, Endpoint, Method, Route, SourceError};
use crate::config::SyncConfig;
use crate::record::Record;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking REST client for one collection.
pub struct HttpSource<R> {
    client: Client,
    base_url: String,
    token: Option<String>,
    endpoint: Endpoint,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> HttpSource<R> {
    pub fn new(base_url: impl Into<String>, endpoint: Endpoint) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(HttpSource {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            endpoint,
            _record: PhantomData,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn from_config(config: &SyncConfig, endpoint: Endpoint) -> Result<Self, SourceError> {
        let source = Self::new(config.api_url.clone(), endpoint)?;
        Ok(match &config.token {
            Some(token) => source.with_token(token.clone()),
            None => source,
        })
    }

    fn request(&self, route: &Route, id: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, route.path_for(id));
        let req = match route.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn send(&self, route: &Route, id: Option<&str>, body: Option<&Value>) -> Result<Value, SourceError> {
        let mut req = self.request(route, id);
        if let Some(body) = route.body_for(id, body) {
            req = req.json(&body);
        }

        let response = req
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body).unwrap_or_else(|| status.to_string());
        tracing::debug!(
            collection = R::COLLECTION,
            status = status.as_u16(),
            %message,
            "request failed"
        );
        Err(match status {
            StatusCode::UNAUTHORIZED => SourceError::Unauthorized(message),
            StatusCode::NOT_FOUND => SourceError::NotFound(id.unwrap_or(&message).to_string()),
            _ => SourceError::Server {
                status: status.as_u16(),
                message,
            },
        })
    }
}

impl<R: Record> CollectionSource<R> for HttpSource<R> {
    fn fetch_all(&self) -> Result<Vec<R>, SourceError> {
        let body = self.send(&self.endpoint.list, None, None)?;
        decode_list(body, self.endpoint.list_key)
    }

    fn create(&self, body: &Value) -> Result<Option<R>, SourceError> {
        let route = self
            .endpoint
            .create
            .as_ref()
            .ok_or(SourceError::Unsupported("create"))?;
        let response = self.send(route, None, Some(body))?;
        decode_item(response, self.endpoint.item_key)
    }

    fn update(&self, id: &str, patch: &Value) -> Result<Option<R>, SourceError> {
        let route = self
            .endpoint
            .update
            .as_ref()
            .ok_or(SourceError::Unsupported("update"))?;
        let response = self.send(route, Some(id), Some(patch))?;
        decode_item(response, self.endpoint.item_key)
    }

    fn delete(&self, id: &str) -> Result<(), SourceError> {
        let route = self
            .endpoint
            .delete
            .as_ref()
            .ok_or(SourceError::Unsupported("delete"))?;
        let response = self.send(route, Some(id), None)?;
        // Deletes answer `{ success, message }`; only the flag matters.
        if response.get("success") == Some(&Value::Bool(false)) {
            let message = error_message(&response).unwrap_or_else(|| "delete rejected".into());
            return Err(SourceError::Rejected(message));
        }
        Ok(())
    }
}
