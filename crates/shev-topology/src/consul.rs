//! Consul KV directory over HTTP.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::directory::Directory;
use crate::error::DirectoryError;

/// Address of the local Consul agent.
pub const DEFAULT_CONSUL_ADDRESS: &str = "http://127.0.0.1:8500";

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Lists keys through the Consul `/v1/kv` endpoint.
#[derive(Debug, Clone)]
pub struct ConsulDirectory {
    client: Client,
    address: String,
    token: Option<String>,
}

impl ConsulDirectory {
    /// Builds a directory client for the agent at `address`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Http` if the HTTP client cannot be built.
    pub fn new(address: impl Into<String>, timeout: Option<Duration>) -> Result<Self, DirectoryError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            address: address.into(),
            token: None,
        })
    }

    /// Sends an ACL token with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn keys_url(&self, prefix: &str) -> String {
        format!("{}/v1/kv/{}", self.address.trim_end_matches('/'), prefix)
    }
}

impl Directory for ConsulDirectory {
    fn list_keys(&self, prefix: &str, delimiter: &str) -> Result<Vec<String>, DirectoryError> {
        let mut request = self
            .client
            .get(self.keys_url(prefix))
            .query(&[("keys", ""), ("separator", delimiter)]);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send()?;
        let status = response.status();

        // Consul answers 404 for a prefix with no keys below it.
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(DirectoryError::Status {
                status: status.as_u16(),
                prefix: prefix.to_string(),
            });
        }

        let body = response.bytes()?;
        serde_json::from_slice(&body).map_err(|source| DirectoryError::Decode {
            prefix: prefix.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_url_joins_address_and_prefix() {
        let dir = ConsulDirectory::new("http://127.0.0.1:8500/", None).expect("client");
        assert_eq!(
            dir.keys_url("shipdock/clusters/"),
            "http://127.0.0.1:8500/v1/kv/shipdock/clusters/"
        );
    }

    #[test]
    fn token_is_optional() {
        let dir = ConsulDirectory::new(DEFAULT_CONSUL_ADDRESS, Some(Duration::from_secs(2)))
            .expect("client")
            .with_token("secret");
        assert_eq!(dir.token.as_deref(), Some("secret"));
        assert_eq!(dir.address(), DEFAULT_CONSUL_ADDRESS);
    }
}
