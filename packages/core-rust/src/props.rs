//! Page properties and the server-side data-loading outcome.
//!
//! Page props are an ordered JSON object so they stay plain data on their
//! way to the rendering layer. Pipeline stages add keys with
//! [`PageProps::inject`], which never replaces a key the page already set.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the resolved tenant name is injected.
pub const TENANT_NAME_KEY: &str = "tenantName";

/// Key under which the GraphQL cache snapshot is injected.
pub const INITIAL_APOLLO_STATE_KEY: &str = "initialApolloState";

/// Errors converting or reading page props.
#[derive(Debug, thiserror::Error)]
pub enum PropsError {
    #[error("page props must serialize to a JSON object, got {found}")]
    NotAnObject { found: &'static str },
    #[error("page props (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// PageProps
// ---------------------------------------------------------------------------

/// Serializable property map handed from data loading to rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageProps(Map<String, Value>);

impl PageProps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts any serializable value into props.
    ///
    /// # Errors
    ///
    /// Returns `PropsError::NotAnObject` if `value` serializes to anything
    /// other than a JSON object, or `PropsError::Json` if serialization fails.
    pub fn from_serializable<P: Serialize + ?Sized>(value: &P) -> Result<Self, PropsError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(PropsError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    /// Inserts `value` under `key` only if the key is not already present.
    ///
    /// Returns `true` if the value was inserted.
    pub fn inject(&mut self, key: &str, value: Value) -> bool {
        if self.0.contains_key(key) {
            tracing::debug!(key, "page already set injected key, keeping page value");
            return false;
        }
        self.0.insert(key.to_string(), value);
        true
    }

    /// Inserts or replaces `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Reads `key` as a typed value. A missing key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `PropsError::Json` if the stored value does not deserialize
    /// into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PropsError> {
        self.0
            .get(key)
            .map(|value| T::deserialize(value).map_err(PropsError::from))
            .transpose()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

}

impl From<Map<String, Value>> for PageProps {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for PageProps {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// ServerSideResult
// ---------------------------------------------------------------------------

/// Redirect target returned instead of props.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub destination: String,
    pub permanent: bool,
}

/// Outcome of server-side data loading for one request.
///
/// Only `Props` is touched by the pipeline; redirects and not-found results
/// travel back to the caller exactly as the page returned them.
///
/// Serializes as `{"props": ...}`, `{"redirect": ...}` or `{"notFound": true}`.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerSideResult<P = PageProps> {
    Props(P),
    Redirect(Redirect),
    NotFound,
}

impl<P> ServerSideResult<P> {
    #[must_use]
    pub fn redirect(destination: impl Into<String>, permanent: bool) -> Self {
        Self::Redirect(Redirect {
            destination: destination.into(),
            permanent,
        })
    }

    #[must_use]
    pub fn is_props(&self) -> bool {
        matches!(self, Self::Props(_))
    }

    #[must_use]
    pub fn into_props(self) -> Option<P> {
        match self {
            Self::Props(props) => Some(props),
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Props(_) => "props",
            Self::Redirect(_) => "redirect",
            Self::NotFound => "not_found",
        }
    }

    /// Applies `f` to the props outcome; other outcomes pass through
    /// without calling `f`.
    ///
    /// # Errors
    ///
    /// Returns whatever error `f` returns.
    pub fn try_map_props<T, E>(
        self,
        f: impl FnOnce(P) -> Result<T, E>,
    ) -> Result<ServerSideResult<T>, E> {
        Ok(match self {
            Self::Props(props) => ServerSideResult::Props(f(props)?),
            Self::Redirect(redirect) => ServerSideResult::Redirect(redirect),
            Self::NotFound => ServerSideResult::NotFound,
        })
    }
}

// Wire forms. `notFound` carries a literal `true`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum ResultRef<'a, P> {
    Props(&'a P),
    Redirect(&'a Redirect),
    NotFound(bool),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
enum ResultRepr<P> {
    Props(P),
    Redirect(Redirect),
    NotFound(bool),
}

impl<P: Serialize> Serialize for ServerSideResult<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Props(props) => ResultRef::Props(props),
            Self::Redirect(redirect) => ResultRef::Redirect(redirect),
            Self::NotFound => ResultRef::NotFound(true),
        }
        .serialize(serializer)
    }
}

impl<'de, P: Deserialize<'de>> Deserialize<'de> for ServerSideResult<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ResultRepr::deserialize(deserializer)? {
            ResultRepr::Props(props) => Ok(Self::Props(props)),
            ResultRepr::Redirect(redirect) => Ok(Self::Redirect(redirect)),
            ResultRepr::NotFound(true) => Ok(Self::NotFound),
            ResultRepr::NotFound(false) => Err(de::Error::custom("notFound must be true")),
        }
    }
}
