//! Request envelopes accepted by the update and rebuild entry points.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("request is missing required field '{0}'")]
    MissingField(&'static str),
}

/// What happened to the index snapshot that triggered a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceType {
    #[default]
    Add,
    Modify,
    Delete,
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Add => "Add",
            Self::Modify => "Modify",
            Self::Delete => "Delete",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(rename = "OperationId")]
    pub operation_id: String,
    #[serde(rename = "Commits", default)]
    pub commits: Vec<String>,
}

impl UpdateRequest {
    pub fn new(operation_id: impl Into<String>, commits: Vec<String>) -> Result<Self, RequestError> {
        let request = Self {
            operation_id: operation_id.into(),
            commits,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.operation_id.trim().is_empty() {
            return Err(RequestError::MissingField("OperationId"));
        }
        Ok(())
    }
}

impl fmt::Display for UpdateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OperationId: '{}' Commits: '{}'",
            self.operation_id,
            self.commits.join(",")
        )
    }
}

/// Rebuild trigger. `reference` is a pre-signed blob URL and is never rendered by `Display`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildRequest {
    #[serde(rename = "OperationId")]
    pub operation_id: String,
    #[serde(rename = "sasReference")]
    pub reference: String,
    #[serde(rename = "ReferenceType", default)]
    pub reference_type: ReferenceType,
}

impl RebuildRequest {
    pub fn new(
        operation_id: impl Into<String>,
        reference: impl Into<String>,
        reference_type: ReferenceType,
    ) -> Result<Self, RequestError> {
        let request = Self {
            operation_id: operation_id.into(),
            reference: reference.into(),
            reference_type,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.operation_id.trim().is_empty() {
            return Err(RequestError::MissingField("OperationId"));
        }
        if self.reference.trim().is_empty() {
            return Err(RequestError::MissingField("sasReference"));
        }
        Ok(())
    }
}

impl fmt::Display for RebuildRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OperationId: '{}' ReferenceType: '{}'",
            self.operation_id, self.reference_type
        )
    }
}
