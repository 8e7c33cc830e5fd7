//! Cluster info lookup over a pluggable HTTP-like transport.
//!
//! Only the request shaping and JSON decoding live here; the transport
//! (connection, auth, retries) is supplied by the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Path of the info endpoint.
pub const INFO_PATH: &str = "/info";

/// Request method passed to the transport. Only reads are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
        }
    }
}

#[derive(Debug, Error)]
pub enum InfoError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to unmarshal response. {body}. {source}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode request parameters: {0}")]
    Params(#[source] serde_json::Error),
}

/// One synchronous request/response exchange.
///
/// Implementations return the raw body for 2xx responses and
/// [`InfoError::Status`] (with the body text) otherwise.
pub trait Transport {
    fn call(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Vec<u8>, InfoError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InfoItem {
    #[serde(default)]
    pub cluster_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(rename = "dummy", default)]
    pub items: Vec<InfoItem>,
}

/// Query parameters from the record's top-level scalar fields; nulls, arrays
/// and objects are skipped.
pub fn to_query_params<T: Serialize>(record: &T) -> Result<Vec<(String, String)>, InfoError> {
    let value = serde_json::to_value(record).map_err(InfoError::Params)?;
    let Value::Object(map) = value else {
        return Ok(Vec::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s)),
            Value::Bool(b) => Some((key, b.to_string())),
            Value::Number(n) => Some((key, n.to_string())),
            _ => None,
        })
        .collect())
}

/// Fetch the cluster info (e.g. the cluster fsid).
pub fn get_info(transport: &dyn Transport, info: &Info) -> Result<Info, InfoError> {
    let params = to_query_params(info)?;
    let body = transport.call(Method::Get, INFO_PATH, &params)?;
    serde_json::from_slice(&body).map_err(|source| InfoError::Decode {
        body: String::from_utf8_lossy(&body).into_owned(),
        source,
    })
}
