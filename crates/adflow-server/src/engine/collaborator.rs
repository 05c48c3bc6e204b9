//! Shared plumbing for the external proof and classifier services.

use std::time::Duration;

/// Failure reported by an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error("timeout")]
    Timeout,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The collaborator answered but the answer is unusable.
    #[error("{0}")]
    Rejected(String),
}

/// Builds the HTTP client used for collaborator calls.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, CollaboratorError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Joins a base URL and a path without doubling the slash.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Runs `call` under `limit`, mapping an elapsed deadline to `Timeout`.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: std::future::Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        assert_eq!(
            endpoint("http://proofs.local/", "/generate"),
            "http://proofs.local/generate"
        );
        assert_eq!(endpoint("http://proofs.local", "generate"), "http://proofs.local/generate");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CollaboratorError::NotConfigured("proof service").to_string(),
            "proof service not configured"
        );
        assert_eq!(CollaboratorError::Timeout.to_string(), "timeout");
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let result: Result<(), _> = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(CollaboratorError::Timeout)));
    }
}
