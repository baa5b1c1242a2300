//! HttpClient shared by the chat and public snapshot clients
//!
//! Responsible for
//!  - sending requests and mapping failures into `WinelogError`s
//!  - logging/tracing
//!
//! There are no retries and no timeouts: a failed request is reported once
//! and the caller decides how to degrade.

use std::fmt;

use bytes::Bytes;
use reqwest::{Method, header::CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};
use snafu::prelude::*;
use tracing::{debug, error, trace};

use crate::{
    Result,
    error::{HttpSnafu, SerializationSnafu, WinelogError},
};

/// Target for request/response body dumps.
/// Enable with `RUST_LOG=winelog::http_json=trace`
const HTTP_JSON_TARGET: &str = "winelog::http_json";

#[derive(Clone, Default)]
pub(crate) struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // query may hold an api key
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query_params", &self.query.len())
            .field("body", &self.body.as_ref().map_or(0, Bytes::len))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build().context(HttpSnafu {
            method: "client-init",
            url: "",
        })?;
        Ok(Self { client })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let req = HttpRequest {
            method: Method::GET,
            url: url.into(),
            ..Default::default()
        };
        self.send(req).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let req = HttpRequest {
            method: Method::POST,
            url: url.into(),
            query,
            body: Some(Bytes::from(
                serde_json::to_vec(body).context(SerializationSnafu)?,
            )),
        };
        self.send(req).await
    }

    /// Sends one request
    /// - maps transport errors to `Http` and non-2xx status to `ApiError`
    /// - deserializes the json response body into T
    pub(crate) async fn send<T: DeserializeOwned>(&self, req: HttpRequest) -> Result<T> {
        let mut builder = self
            .client
            .request(req.method.clone(), &req.url)
            .query(&req.query);
        if let Some(body) = &req.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }
        debug!(?req, "http send");
        log_request(&req);

        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => {
                error!(?source, ?req, "http");
                return Err(WinelogError::Http {
                    method: req.method.to_string(),
                    url: req.url,
                    source,
                });
            }
        };

        let code = response.status();
        if !code.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(?code, ?req, message, "http");
            return Err(WinelogError::ApiError {
                code: code.as_u16(),
                method: req.method.to_string(),
                url: req.url,
                message,
            });
        }

        let body = response.bytes().await.context(HttpSnafu {
            method: req.method.to_string(),
            url: req.url.clone(),
        })?;
        log_response(&req.url, &body);
        deserialize_json(&body)
    }
}

// dump request, without headers
fn log_request(req: &HttpRequest) {
    if tracing::enabled!(target: HTTP_JSON_TARGET, tracing::Level::TRACE) {
        let body = req
            .body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
            .unwrap_or_default();
        trace!(target: HTTP_JSON_TARGET, "{} url={} body={body}", req.method, req.url);
    }
}

// dump json response, for debugging
fn log_response(url: &str, body: &Bytes) {
    if tracing::enabled!(target: HTTP_JSON_TARGET, tracing::Level::TRACE) {
        trace!(target: HTTP_JSON_TARGET, "Response url={url} body={}",
            String::from_utf8_lossy(body)
        );
    }
}

// deserialize, reporting errors with 'serde_path_to_error', which provides
// detailed json path to the error
pub(crate) fn deserialize_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(value) => Ok(value),
        Err(err) => {
            error!("Deserialization failed at {}: {}", err.path(), err);
            Err(WinelogError::Deserialization {
                path: err.path().to_string(),
                source: err.into_inner(),
            })
        }
    }
}
