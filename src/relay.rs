//! Fee-sponsoring relay (Launchtube-style) submission
//!
//! The relay takes a signed envelope plus a fee bid and pays network fees
//! itself. Error bodies are handed back exactly as the relay sent them.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;

use crate::config::RelayConfig;

/// Default fee bid, in stroops
pub const DEFAULT_RELAY_FEE: u64 = 10_000;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Relay rejected the transaction ({status}): {body}")]
    Rejected { status: u16, body: Value },

    #[error("Invalid relay response: {0}")]
    InvalidResponse(String),
}

impl RelayError {
    /// The relay's own error payload, when it returned one
    pub fn body(&self) -> Option<&Value> {
        match self {
            RelayError::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct RelayClient {
    client: Client,
    url: String,
    token: SecretString,
}

impl RelayClient {
    pub fn new(url: impl Into<String>, token: SecretString) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            token,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.url.clone(), config.token.clone())
    }

    /// POST `xdr` and `fee` as form fields with bearer auth
    pub async fn submit(&self, xdr: &str, fee: u64) -> Result<Value, RelayError> {
        let fee = fee.to_string();
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.token.expose_secret())
            .form(&[("xdr", xdr), ("fee", fee.as_str())])
            .send()
            .await
            .map_err(|e| RelayError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
        // Non-JSON bodies are kept as a string so nothing is lost
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if status.is_success() {
            tracing::info!(status = status.as_u16(), "Relay accepted transaction");
            Ok(body)
        } else {
            tracing::warn!(status = status.as_u16(), body = %body, "Relay rejected transaction");
            Err(RelayError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Scripted HTTP responders for tests
#[cfg(test)]
pub(crate) mod testing {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Serve a single request with the given status and body; the handle
    /// resolves to the raw request text.
    pub async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            respond(&mut socket, status, &body).await;
            request
        });
        (url, handle)
    }

    /// Serve one connection per response, in order
    ///
    /// Every response closes its connection, so each client request lands on
    /// the next entry. The handle resolves to the raw requests.
    pub async fn serve_sequence(
        responses: Vec<(&'static str, String)>,
    ) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let mut requests = Vec::with_capacity(responses.len());
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                requests.push(read_request(&mut socket).await);
                respond(&mut socket, status, &body).await;
            }
            requests
        });
        (url, handle)
    }

    async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::serve_once;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn expired_token_error_is_returned_verbatim() {
        let error_body = json!({
            "error": "jwt expired",
            "expiredAt": "2024-11-01T00:00:00.000Z"
        });
        let (url, server) = serve_once("401 Unauthorized", error_body.to_string()).await;

        let relay = RelayClient::new(url, SecretString::from("expired-jwt".to_string()));
        let err = relay.submit("AAAAAgAAAAA=", 10_000).await.unwrap_err();

        match &err {
            RelayError::Rejected { status, body } => {
                assert_eq!(*status, 401);
                assert_eq!(body, &error_body);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.body(), Some(&error_body));

        let request = server.await.unwrap();
        assert!(request.contains("authorization: Bearer expired-jwt")
            || request.contains("Authorization: Bearer expired-jwt"));
        assert!(request.contains("fee=10000"));
        assert!(request.contains("xdr=AAAAAgAAAAA%3D"));
    }

    #[tokio::test]
    async fn accepted_submission_returns_receipt() {
        let receipt = json!({ "hash": "abc123", "status": "SUCCESS" });
        let (url, server) = serve_once("200 OK", receipt.to_string()).await;

        let relay = RelayClient::new(url, SecretString::from("jwt".to_string()));
        let body = relay.submit("AAAA", 500).await.unwrap();
        assert_eq!(body, receipt);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn plain_text_errors_are_kept() {
        let (url, server) = serve_once("502 Bad Gateway", "upstream timeout".to_string()).await;
        let relay = RelayClient::new(url, SecretString::from("jwt".to_string()));
        let err = relay.submit("AAAA", 500).await.unwrap_err();
        assert_eq!(err.body(), Some(&Value::String("upstream timeout".to_string())));
        server.await.unwrap();
    }

    #[test]
    fn debug_redacts_token() {
        let relay = RelayClient::new("https://relay.example.org", SecretString::from("jwt-secret".to_string()));
        assert!(!format!("{:?}", relay).contains("jwt-secret"));
    }
}
