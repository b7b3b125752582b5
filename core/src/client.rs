//! Authenticated request/response cycle for the shortdiary API.
//!
//! # Design
//! `Client` holds the credentials, the API root and a `Transport`. Every call
//! is independent: build an `HttpRequest`, execute it, then either decode the
//! JSON body or map the failure to an `ApiError`. Building and mapping are
//! pure functions so they can be tested without a transport.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::config::Config;
use crate::entry::Entry;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};

/// Endpoint fetched on construction to check the credentials.
const PROBE_ENDPOINT: &str = "posts/1/";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Blocking client for the shortdiary API.
pub struct Client {
    config: Config,
    username: String,
    password: String,
    transport: Box<dyn Transport>,
}

impl Client {
    /// Connect to the public service over the default transport.
    ///
    /// Fails with `Authentication` if the credentials are rejected.
    pub fn new(username: &str, password: &str) -> Result<Self, ApiError> {
        Self::with_transport(Config::default(), username, password, UreqTransport::new())
    }

    /// Connect with an explicit config and transport. Issues one probe
    /// request and discards its body.
    pub fn with_transport(
        config: Config,
        username: &str,
        password: &str,
        transport: impl Transport + 'static,
    ) -> Result<Self, ApiError> {
        let client = Self {
            config,
            username: username.to_string(),
            password: password.to_string(),
            transport: Box::new(transport),
        };
        client.get_request(PROBE_ENDPOINT)?;
        debug!(username = %client.username, "credentials accepted");
        Ok(client)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Build the request for `endpoint` without sending it. POST and PUT
    /// carry `data` as a form body; GET ignores it.
    pub fn build_request(
        &self,
        endpoint: &str,
        method: HttpMethod,
        data: &[(&str, &str)],
    ) -> Result<HttpRequest, ApiError> {
        let url = self.config.endpoint_url(endpoint)?;
        let mut headers = vec![("authorization".to_string(), self.basic_auth())];
        let body = match method {
            HttpMethod::Get => None,
            HttpMethod::Post | HttpMethod::Put => {
                headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
                let mut form = form_urlencoded::Serializer::new(String::new());
                for (key, value) in data {
                    form.append_pair(key, value);
                }
                Some(form.finish())
            }
        };
        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Send one request and return the decoded JSON body.
    pub fn send_request(
        &self,
        endpoint: &str,
        method: HttpMethod,
        data: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let request = self.build_request(endpoint, method, data)?;
        let response = self.transport.execute(&request)?;
        parse_response(response)
    }

    pub fn get_request(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.send_request(endpoint, HttpMethod::Get, &[])
    }

    pub fn post_request(&self, endpoint: &str, data: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.send_request(endpoint, HttpMethod::Post, data)
    }

    pub fn put_request(&self, endpoint: &str, data: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.send_request(endpoint, HttpMethod::Put, data)
    }

    /// Turn a post record into an `Entry`. Known fields are copied, unknown
    /// ones ignored; `date` must be a `YYYY-MM-DD` string.
    pub fn format_post(&self, raw: &Value) -> Result<Entry<'_>, ApiError> {
        let record = raw
            .as_object()
            .ok_or_else(|| ApiError::Deserialization(format!("expected a post object, got {raw}")))?;

        let mut entry = Entry::new(self);
        for (key, value) in record {
            entry.assign(key, value);
        }

        let date = record
            .get("date")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Deserialization("post record has no date string".to_string()))?;
        entry.date = Some(parse_date(date)?);
        Ok(entry)
    }

    /// An empty entry bound to this client, to be filled in and saved.
    pub fn new_post(&self) -> Entry<'_> {
        Entry::new(self)
    }

    /// All of the user's posts, in the order the server returns them.
    pub fn posts(&self) -> Result<Vec<Entry<'_>>, ApiError> {
        let raw = self.get_request("posts/")?;
        let records = raw
            .as_array()
            .ok_or_else(|| ApiError::Deserialization(format!("expected a list of posts, got {raw}")))?;
        records.iter().map(|record| self.format_post(record)).collect()
    }

    /// The first post dated `date`, if any.
    ///
    /// The API has no date filter, so this downloads the full list on every
    /// call and scans it. Results are never cached.
    pub fn get_post_for(&self, date: NaiveDate) -> Result<Option<Entry<'_>>, ApiError> {
        Ok(self.posts()?.into_iter().find(|entry| entry.is_for(date)))
    }

    /// A random post some user made public.
    pub fn random_public(&self) -> Result<Entry<'_>, ApiError> {
        let raw = self.get_request("public/")?;
        self.format_post(&raw)
    }

    fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| ApiError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

/// Decode a 2xx body, or map any other status to an error.
fn parse_response(response: HttpResponse) -> Result<Value, ApiError> {
    if !response.is_success() {
        return Err(server_error(response));
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map a non-2xx response to `Authentication` or `Server`.
///
/// 401 wins over everything in the body. Otherwise a JSON body with a truthy
/// `Error` field supplies the message, and anything else falls back to the
/// raw body.
fn server_error(response: HttpResponse) -> ApiError {
    if response.status == 401 {
        warn!(status = response.status, "credentials rejected");
        return ApiError::Authentication;
    }

    let error_field = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| body.get("Error").cloned());
    let message = match error_field {
        Some(Value::String(message)) => message,
        Some(value) if !matches!(value, Value::Null | Value::Bool(false)) => value.to_string(),
        _ => response.body,
    };
    warn!(status = response.status, %message, "server returned an error");
    ApiError::Server(message)
}
