//! A single diary post.

use std::fmt;

use chrono::{Local, NaiveDate};
use serde_json::Value;
use tracing::debug;

use crate::client::Client;
use crate::error::ApiError;

/// One diary post, bound to the `Client` it came from.
///
/// Fields are public and may be changed freely; `save` sends them back.
/// Only `date`, `text` and `mood` are ever written to the server.
#[derive(Clone)]
pub struct Entry<'a> {
    client: &'a Client,
    pub id: Option<u64>,
    pub text: Option<String>,
    pub public_text: Option<String>,
    pub mood: Option<String>,
    pub date: Option<NaiveDate>,
    pub location_verbose: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub public: Option<bool>,
}

impl<'a> Entry<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self {
            client,
            id: None,
            text: None,
            public_text: None,
            mood: None,
            date: None,
            location_verbose: None,
            location_lat: None,
            location_lon: None,
            public: None,
        }
    }

    /// Create the post on the server, or update it if it already has an id.
    ///
    /// Fails with `MissingData`, without sending anything, unless text, date
    /// and mood are all set. A create stores the id the server assigns; an
    /// update leaves every local field as it was.
    pub fn save(&mut self) -> Result<(), ApiError> {
        let (Some(text), Some(date), Some(mood)) = (&self.text, self.date, &self.mood) else {
            return Err(ApiError::MissingData);
        };
        let date = date.format("%Y-%m-%d").to_string();
        let payload = [("date", date.as_str()), ("text", text.as_str()), ("mood", mood.as_str())];

        match self.id {
            Some(id) => {
                self.client.put_request(&format!("posts/{id}/"), &payload)?;
            }
            None => {
                let created = self.client.post_request("posts/", &payload)?;
                let id = created.get("id").and_then(as_id).ok_or_else(|| {
                    ApiError::Deserialization(format!("create response has no id: {created}"))
                })?;
                debug!(id, "created post");
                self.id = Some(id);
            }
        }
        Ok(())
    }

    pub fn is_for(&self, date: NaiveDate) -> bool {
        self.date == Some(date)
    }

    /// True if the post is dated today, in local time.
    pub fn for_today(&self) -> bool {
        self.is_for(Local::now().date_naive())
    }

    /// Copy one wire field into the entry. Unknown keys are ignored, and so
    /// are values of a type the field cannot hold. `date` is parsed by the
    /// caller.
    pub(crate) fn assign(&mut self, key: &str, value: &Value) {
        match key {
            "id" => self.id = convert(key, value, as_id),
            "text" => self.text = convert(key, value, as_string),
            "public_text" => self.public_text = convert(key, value, as_string),
            "mood" => self.mood = convert(key, value, as_mood),
            "location_verbose" => self.location_verbose = convert(key, value, as_string),
            "location_lat" => self.location_lat = convert(key, value, as_float),
            "location_lon" => self.location_lon = convert(key, value, as_float),
            "public" => self.public = convert(key, value, as_bool),
            _ => {}
        }
    }
}

impl fmt::Display for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.as_deref().unwrap_or_default())
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("text", &self.text)
            .field("public_text", &self.public_text)
            .field("mood", &self.mood)
            .field("date", &self.date)
            .field("location_verbose", &self.location_verbose)
            .field("location_lat", &self.location_lat)
            .field("location_lon", &self.location_lon)
            .field("public", &self.public)
            .finish()
    }
}

fn convert<T>(key: &str, value: &Value, f: fn(&Value) -> Option<T>) -> Option<T> {
    if value.is_null() {
        return None;
    }
    let converted = f(value);
    if converted.is_none() {
        debug!(field = key, %value, "ignoring post field with unexpected type");
    }
    converted
}

fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Moods are opaque; numeric and boolean moods keep their JSON text.
fn as_mood(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
