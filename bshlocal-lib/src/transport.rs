use std::path::Path;
use std::time::Duration;

use log::{debug, error};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Identity, Method};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// What a GET response is expected to look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect<'a> {
    /// No check.
    Any,
    /// The payload is an object whose `@type` equals the given tag.
    Type(&'a str),
    /// The payload is an array and every element's `@type` equals the given tag.
    ElementType(&'a str),
}

/// HTTPS session with the controller.
///
/// Every request carries the client certificate (when built from a [`ClientConfig`]) and the
/// fixed `api-version` and `Content-Type` headers. Any non-success status becomes
/// [`Error::Transport`].
#[derive(Debug, Clone)]
pub struct Transport {
    base_url: String,
    client: Client,
}

impl Transport {
    pub async fn new(config: &ClientConfig) -> Result<Self> {
        let identity = load_identity(&config.client_cert, &config.client_key).await?;

        let mut builder = Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        Ok(Self::from_client(config.base_url(), builder.build()?))
    }

    /**
    Wraps an already configured [`Client`].

    Nothing is added to the client; useful for talking to something other than the
    controller itself, such as a local mock.
     */
    pub fn from_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url: String = base_url.into();
        Transport {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GETs `url` and checks the payload against `expect`.
    ///
    /// An empty body yields an empty JSON object and is not checked.
    pub async fn get(&self, url: &str, expect: Expect<'_>) -> Result<Value> {
        match self.send(Method::GET, url, None).await? {
            Some(value) => {
                check_expectation(&value, expect)?;
                Ok(value)
            }
            None => Ok(empty_object()),
        }
    }

    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        let value = self.send(Method::PUT, url, Some(body)).await?;
        Ok(value.unwrap_or_else(empty_object))
    }

    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let value = self.send(Method::POST, url, Some(body)).await?;
        Ok(value.unwrap_or_else(empty_object))
    }

    // `None` when the response body is empty.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let payload = body.map(serde_json::to_string).transpose()?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .header("api-version", "1.0")
            .header(CONTENT_TYPE, "application/json");
        if let Some(payload) = &payload {
            request = request.body(payload.clone());
        }

        debug!("{} {}", method, url);
        let response = request.send().await?;
        let status = response.status();
        let content = response.bytes().await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&content).into_owned();
            error!(
                "{} {} failed with status {} (request body: {}, headers: api-version=1.0, content-type=application/json): {}",
                method,
                url,
                status.as_u16(),
                payload.as_deref().unwrap_or(""),
                body
            );
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
                method: method.to_string(),
                url: url.to_string(),
            });
        }

        parse_body(&content)
    }
}

async fn load_identity(cert: &Path, key: &Path) -> Result<Identity> {
    let mut pem = read_file(cert).await?;
    pem.push(b'\n');
    pem.extend(read_file(key).await?);
    Ok(Identity::from_pem(&pem)?)
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_body(content: &[u8]) -> Result<Option<Value>> {
    if content.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_slice(content)?))
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Returns the `@type` tag of a record, if it has one.
pub(crate) fn type_tag(value: &Value) -> Option<&str> {
    value.get("@type").and_then(Value::as_str)
}

/// Fails with [`Error::Schema`] unless `value`'s `@type` is `expected`.
pub(crate) fn require_type(value: &Value, expected: &str) -> Result<()> {
    match type_tag(value) {
        Some(found) if found == expected => Ok(()),
        found => Err(Error::schema(expected, found)),
    }
}

fn check_expectation(value: &Value, expect: Expect<'_>) -> Result<()> {
    match expect {
        Expect::Any => Ok(()),
        Expect::Type(expected) => require_type(value, expected),
        Expect::ElementType(expected) => match value {
            Value::Array(elements) => elements
                .iter()
                .try_for_each(|element| require_type(element, expected)),
            _ => Err(Error::Schema {
                expected: format!("array of \"{}\"", expected),
                found: "a non-array payload".to_string(),
            }),
        },
    }
}
