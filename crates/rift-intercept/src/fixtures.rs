//! Declarative registration from YAML or JSON fixture files.
//!
//! ```yaml
//! entries:
//!   - method: GET
//!     url: http://testme.org/users?page=1
//!     responses:
//!       - statusCode: 404
//!       - statusCode: "200"
//!         headers:
//!           Content-Type: application/json
//!         body: {"users": []}
//!   - method: RAW
//!     url: tcp://redis.local:6379
//!     responses:
//!       - body: "+PONG\r\n"
//! ```

use anyhow::Context;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{InterceptError, Result};
use crate::registry::{Method, Session};
use crate::response::{Body, Response};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub entries: Vec<FixtureEntry>,
    /// Directory `bodyFile` paths are resolved against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureEntry {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub responses: Vec<FixtureResponse>,
}

/// How `body` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyMode {
    /// UTF-8 text; non-string JSON values are serialized
    #[default]
    Text,
    /// Base64-encoded bytes
    Binary,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureResponse {
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// File whose contents are served lazily as the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_file: Option<PathBuf>,
    #[serde(default)]
    pub mode: BodyMode,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status_code() -> u16 {
    200
}

/// `statusCode` may be written as a number or a string.
fn deserialize_status_code<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("invalid status code number")),
        serde_json::Value::String(s) => s
            .parse::<u16>()
            .map_err(|_| D::Error::custom(format!("invalid status code string: {s}"))),
        _ => Err(D::Error::custom("statusCode must be a number or string")),
    }
}

impl Fixture {
    /// Load a fixture file. YAML is a superset of JSON, so both formats work.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file {}", path.display()))?;
        let mut fixture = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse fixture file {}", path.display()))?;
        fixture.base_dir = path.parent().map(Path::to_path_buf);
        Ok(fixture)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| InterceptError::Config(e.to_string()))
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Register every entry with `session`, in file order. Stops at the first
    /// entry that fails; entries before it stay registered.
    pub fn apply(&self, session: &Session) -> Result<()> {
        for entry in &self.entries {
            let responses = entry
                .responses
                .iter()
                .map(|r| self.build_response(session, r))
                .collect::<Result<Vec<_>>>()?;
            let method: Method = entry.method.parse()?;
            if method == Method::RAW {
                session.register_raw(&entry.url, responses)?;
            } else {
                session.register(method, &entry.url, responses)?;
            }
        }
        info!("Loaded {} fixture entries", self.entries.len());
        Ok(())
    }

    fn build_response(&self, session: &Session, fixture: &FixtureResponse) -> Result<Response> {
        let mut headers: Vec<(&String, &String)> = fixture.headers.iter().collect();
        headers.sort();
        let builder = session
            .response()
            .status(fixture.status_code)
            .merge_headers(headers);

        let builder = match (&fixture.body_file, &fixture.body) {
            (Some(file), _) => {
                let path = match &self.base_dir {
                    Some(dir) if file.is_relative() => dir.join(file),
                    _ => file.clone(),
                };
                builder.file(path)?
            }
            (None, Some(body)) => builder.body(decode_body(body, fixture.mode)?),
            (None, None) => builder,
        };
        Ok(builder.build())
    }
}

fn decode_body(value: &serde_json::Value, mode: BodyMode) -> Result<Body> {
    match (mode, value) {
        (BodyMode::Binary, serde_json::Value::String(encoded)) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| InterceptError::Config(format!("invalid base64 body: {e}")))?;
            Ok(Body::from(bytes))
        }
        (BodyMode::Binary, _) => Err(InterceptError::Config(
            "binary bodies must be base64 strings".to_string(),
        )),
        (BodyMode::Text, serde_json::Value::String(text)) => Ok(Body::from(text.as_str())),
        (BodyMode::Text, other) => Ok(Body::from(other)),
    }
}
