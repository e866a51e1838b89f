//! Elasticsearch REST client for the event index.
//!
//! Speaks the typeless (7.x and later) API. Credentials embedded in the
//! endpoint URL are stripped from it and sent as basic auth.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use serde_json::{json, Map, Value};
use shev_types::INDEX;

use crate::backend::{IndexClient, SearchRequest, SearchResponse};
use crate::error::BackendError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: Option<String>,
}

/// Blocking HTTP client for one index on one Elasticsearch endpoint.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ElasticClient {
    client: Client,
    base: String,
    index: String,
    credentials: Option<Credentials>,
}

impl ElasticClient {
    /// Builds a client for `endpoint`, bound to the [`INDEX`] index.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidEndpoint` for an unparsable URL and
    /// `BackendError::Http` if the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut url =
            Url::parse(endpoint).map_err(|_| BackendError::InvalidEndpoint(endpoint.to_string()))?;

        let credentials = if url.username().is_empty() {
            None
        } else {
            let credentials = Credentials {
                username: url.username().to_string(),
                password: url.password().map(str::to_string),
            };
            url.set_username("")
                .and_then(|()| url.set_password(None))
                .map_err(|()| BackendError::InvalidEndpoint(endpoint.to_string()))?;
            Some(credentials)
        };

        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        Ok(Self {
            client,
            base: url.as_str().trim_end_matches('/').to_string(),
            index: INDEX.to_string(),
            credentials,
        })
    }

    /// Binds the client to a different index name.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Endpoint without credentials.
    pub fn endpoint(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}{}", self.base, self.index, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.credentials {
            Some(c) => builder.basic_auth(&c.username, c.password.as_ref()),
            None => builder,
        }
    }
}

/// Turns a non-success response into `BackendError::Status`.
fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Builds the `_search` request body.
pub(crate) fn search_body(request: &SearchRequest) -> Value {
    let order = if request.ascending { "asc" } else { "desc" };
    let mut sort = Map::new();
    sort.insert(
        request.sort_field.as_str().to_string(),
        json!({ "order": order }),
    );

    json!({
        "query": request.query,
        "from": request.from,
        "size": request.size,
        "sort": [ Value::Object(sort) ],
    })
}

/// Extracts sources and counters from a `_search` response body.
///
/// `hits.total` is a number before 7.0 and `{ "value": n }` after.
pub(crate) fn parse_search_response(body: &Value) -> Result<SearchResponse, BackendError> {
    let took_ms = body.get("took").and_then(Value::as_u64).unwrap_or(0);
    let hits = body.get("hits").ok_or_else(|| BackendError::Status {
        status: StatusCode::OK.as_u16(),
        body: "search response has no hits".to_string(),
    })?;

    let total_hits = match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(total) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
        None => 0,
    };

    let sources = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("_source").cloned())
                .collect()
        })
        .unwrap_or_default();

    Ok(SearchResponse {
        hits: sources,
        took_ms,
        total_hits,
    })
}

impl IndexClient for ElasticClient {
    fn index_exists(&self) -> Result<bool, BackendError> {
        let response = self.request(Method::HEAD, "").send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => check(response).map(|_| true),
        }
    }

    fn create_index(&self, mapping: &Value) -> Result<bool, BackendError> {
        let response = check(self.request(Method::PUT, "").json(mapping).send()?)?;
        let body: Value = response.json()?;
        Ok(body
            .get("acknowledged")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    fn delete_index(&self) -> Result<(), BackendError> {
        let response = check(self.request(Method::DELETE, "").send()?)?;
        tracing::debug!(status = %response.status(), index = %self.index, "deleted index");
        Ok(())
    }

    fn write(&self, document: &Value) -> Result<(), BackendError> {
        check(self.request(Method::POST, "/_doc").json(document).send()?)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), BackendError> {
        // A refresh, not a Lucene flush, is what publishes writes to search.
        check(self.request(Method::POST, "/_refresh").send()?)?;
        Ok(())
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        let response = check(
            self.request(Method::POST, "/_search")
                .json(&search_body(request))
                .send()?,
        )?;
        let body: Value = response.json()?;
        parse_search_response(&body)
    }
}
