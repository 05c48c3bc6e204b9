// HTTP client for the adflow API

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocking client that acts as one user via the `X-User-ID` header.
pub struct ApiClient {
    base: String,
    user_id: Option<Uuid>,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(base: impl Into<String>, user_id: Option<Uuid>) -> Self {
        Self {
            base: base.into(),
            user_id,
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Fails early for commands that need an acting user.
    pub fn require_user(&self) -> Result<Uuid> {
        self.user_id.ok_or_else(|| {
            anyhow!("No user selected. Run `adflow login <USER_ID>` or pass --user / ADFLOW_USER")
        })
    }

    pub fn health(&self) -> Result<Value> {
        let url = format!("{}/health", self.base);
        finish(self.agent.get(&url).call())
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        finish(self.request("GET", path).call())
    }

    pub fn post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        let request = self.request("POST", path);
        finish(match body {
            Some(json) => request.send_json(json),
            None => request.call(),
        })
    }

    pub fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        finish(self.request("PATCH", path).send_json(body))
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        finish(self.request("DELETE", path).call()).map(|_| ())
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}/api/v1{}", self.base, path);
        let request = self.agent.request(method, &url);
        match self.user_id {
            Some(id) => request.set("X-User-ID", &id.to_string()),
            None => request,
        }
    }
}

fn finish(result: std::result::Result<ureq::Response, ureq::Error>) -> Result<Value> {
    match result {
        Ok(response) => {
            let text = response.into_string()?;
            if text.trim().is_empty() {
                Ok(Value::Null)
            } else {
                serde_json::from_str(&text).map_err(|e| anyhow!("Invalid JSON from server: {}", e))
            }
        }
        Err(ureq::Error::Status(status, response)) => {
            let retry_after = response.header("Retry-After").map(str::to_string);
            let body = response.into_json::<Value>().unwrap_or(Value::Null);
            Err(anyhow!(describe_error(status, &body, retry_after.as_deref())))
        }
        Err(e) => Err(anyhow!("Failed to reach server: {}", e)),
    }
}

/// Formats an API error body (`{error, message}`) for the terminal.
pub fn describe_error(status: u16, body: &Value, retry_after: Option<&str>) -> String {
    let code = body["error"].as_str().unwrap_or("error");
    let message = body["message"].as_str().unwrap_or("no details");
    let mut text = format!("{} ({}): {}", code, status, message);

    if let Some(ids) = body["assetIds"].as_array() {
        let ids: Vec<&str> = ids.iter().filter_map(Value::as_str).collect();
        text.push_str(&format!("\n  Assets: {}", ids.join(", ")));
    }
    if let Some(seconds) = retry_after {
        text.push_str(&format!("\n  Retry in {}s", seconds));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_error() {
        let body = json!({"error": "invalid_state", "message": "Campaign has no proof"});
        assert_eq!(
            describe_error(409, &body, None),
            "invalid_state (409): Campaign has no proof"
        );
    }

    #[test]
    fn test_describe_error_lists_assets_and_retry() {
        let body = json!({
            "error": "invalid_asset_reference",
            "message": "Invalid asset reference",
            "assetIds": ["a1", "b2"]
        });
        let text = describe_error(422, &body, None);
        assert!(text.contains("Assets: a1, b2"));

        let busy = json!({"error": "generation_in_progress", "message": "busy"});
        assert!(describe_error(429, &busy, Some("5")).ends_with("Retry in 5s"));
    }

    #[test]
    fn test_describe_error_without_body() {
        assert_eq!(
            describe_error(502, &Value::Null, None),
            "error (502): no details"
        );
    }

    #[test]
    fn test_require_user() {
        let anonymous = ApiClient::new("http://localhost:8000", None);
        assert!(anonymous.require_user().is_err());

        let id = Uuid::new_v4();
        let client = ApiClient::new("http://localhost:8000", Some(id));
        assert_eq!(client.require_user().unwrap(), id);
    }
}
