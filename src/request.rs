//! Canonical request decoding.
//!
//! The JSON body is bound into a [`DataRequest`], the schema is defaulted and
//! the caller's identity is stamped onto it. Nothing here validates the
//! target object beyond it being present; whether it is reachable is decided
//! by the metadata probe.

use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::Principal;
use crate::error::{Error, Result};

/// Schema used when the request names none.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Command timeout, in seconds, used when the request names none.
pub const DEFAULT_COMMAND_TIMEOUT: u64 = 30;

/// One claim of the calling principal, as passed to procedures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Claim {
    pub key: String,
    pub value: String,
}

/// A decoded unit of work.
#[derive(Debug, Clone, Deserialize)]
pub struct DataRequest {
    #[serde(default, alias = "Schema", deserialize_with = "null_as_empty")]
    pub schema: String,
    #[serde(default, alias = "Object", deserialize_with = "null_as_empty")]
    pub object: String,
    /// Raw parameter values, in the order the caller sent them.
    #[serde(default, alias = "Parameters")]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Discriminator selecting the response shape or the help handler.
    #[serde(default, alias = "Context")]
    pub context: Option<String>,
    #[serde(
        default = "default_command_timeout",
        rename = "commandTimeout",
        alias = "CommandTimeout"
    )]
    pub command_timeout: u64,
    #[serde(skip)]
    pub user: Option<String>,
    #[serde(skip)]
    pub claims: Vec<Claim>,
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl DataRequest {
    /// Build a request for `schema.object` with no parameters.
    pub fn new(schema: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            object: object.into(),
            parameters: serde_json::Map::new(),
            context: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            user: None,
            claims: Vec::new(),
        }
    }

    /// The discriminator, with an absent one read as empty.
    pub fn context(&self) -> &str {
        self.context.as_deref().unwrap_or_default()
    }

    /// Replace identity fields from `principal`.
    pub fn apply_principal(&mut self, principal: &Principal) {
        match principal {
            Principal::Authenticated { name, claims } => {
                self.user = name.clone();
                self.claims = claims
                    .iter()
                    .map(|(key, value)| Claim {
                        key: key.clone(),
                        value: value.clone().unwrap_or_default(),
                    })
                    .collect();
            }
            Principal::Anonymous => {
                self.user = None;
                self.claims = Vec::new();
            }
        }
    }
}

/// Decode a request body and enrich it with the caller's identity.
pub fn decode(body: &[u8], principal: &Principal) -> Result<DataRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::Decode("empty body".to_string()));
    }
    let mut request: DataRequest =
        serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))?;

    if request.object.is_empty() {
        return Err(Error::Decode("missing object".to_string()));
    }
    if request.schema.is_empty() {
        request.schema = DEFAULT_SCHEMA.to_string();
    }
    request.apply_principal(principal);
    Ok(request)
}
