//! Backend domain model.
//!
//! # Responsibility
//! - Define the storage backend record and its document mapping.
//! - Generate identity for records created without one.
//!
//! # Invariants
//! - `id` is stable once assigned and never reused for another backend.
//! - Unknown document fields survive a read/write cycle through `extra`.
//! - `extra` never holds a key that a named field serializes to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Document keys owned by the named fields of [`Backend`].
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "tenantId",
    "userId",
    "name",
    "type",
    "region",
    "endpoint",
    "bucketName",
    "access",
    "security",
];

/// Stable identifier for a stored backend.
pub type BackendId = Uuid;

/// Storage backend registration persisted as one document.
///
/// Named attributes are optional; anything else a caller stores is kept in
/// `extra` and flattened into the same document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    /// Assigned on create when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BackendId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Serialized as `type` to match the stored document naming.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Backend {
    /// Creates an unsaved backend with the given name and no identity yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Creates a backend with a caller-provided identity.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: BackendId, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::new(name)
        }
    }

    /// Returns the identity, generating one first when it is missing.
    pub fn ensure_id(&mut self) -> BackendId {
        *self.id.get_or_insert_with(Uuid::new_v4)
    }

    /// Stores an arbitrary extra field in the document.
    ///
    /// Reserved keys are accepted here and rejected by [`Backend::validate`].
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    /// Validates the document shape before it is written.
    ///
    /// A flattened `extra` key equal to a named field's key would serialize
    /// the same key twice, and the stored document could not be read back.
    pub fn validate(&self) -> Result<(), BackendValidationError> {
        match self
            .extra
            .keys()
            .find(|key| RESERVED_FIELDS.contains(&key.as_str()))
        {
            Some(key) => Err(BackendValidationError::ReservedExtraField(key.clone())),
            None => Ok(()),
        }
    }
}

/// Backend document validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendValidationError {
    ReservedExtraField(String),
}

impl Display for BackendValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReservedExtraField(key) => {
                write!(f, "extra field collides with a named field: {key}")
            }
        }
    }
}

impl Error for BackendValidationError {}
