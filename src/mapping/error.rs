use thiserror::Error;

use crate::models::LocalField;

/// The assertion could not be turned into a local account key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Assertion from IdP '{idp_id}' yields an empty account key")]
    EmptyKey { idp_id: String },
}

/// Failure reported by the user-resolution collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserResolutionError {
    #[error("No account with {field} '{key}' and auto-creation is disabled")]
    NotFound { field: LocalField, key: String },

    #[error("More than one account has {field} '{key}'")]
    Ambiguous { field: LocalField, key: String },

    #[error("Account provisioning failed: {0}")]
    Provisioning(String),

    #[error("User directory unavailable: {0}")]
    Unavailable(String),
}

/// Why an SSO login was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Resolution(#[from] UserResolutionError),
}
