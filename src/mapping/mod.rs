//! Mapping of SAML2 assertions onto local accounts.
//!
//! A pure, single pass per assertion: pick the raw key (configured attribute
//! or NameID), fold case if configured, reject empty keys. Resolving or
//! provisioning the account is left to a [`UserResolver`].

mod error;
mod login;

use std::{borrow::Cow, collections::HashMap};

pub use error::*;
pub use login::*;
use serde::{Deserialize, Serialize};

use crate::models::{IdpConfig, LocalField};

/// Attribute name under which the NameID is exposed when
/// `name_id_as_attribute` is enabled.
pub const NAME_ID_ATTRIBUTE: &str = "NameID";

/// Attribute values carried by an assertion, keyed by attribute name.
pub type AssertionAttributes = HashMap<String, Vec<String>>;

/// The parts of a parsed SAML2 assertion the mapping needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub name_id: String,
    #[serde(default)]
    pub attributes: AssertionAttributes,
}

/// Mapped key plus what the caller needs to resolve the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalKey {
    pub local_field: LocalField,
    pub key: String,
    pub auto_create: bool,
}

/// Attributes as seen by downstream mapping, with the NameID added when the
/// IdP binding exposes it. An attribute already named `NameID` is kept.
pub fn effective_attributes<'a>(
    config: &IdpConfig,
    attributes: &'a AssertionAttributes,
    name_id: &str,
) -> Cow<'a, AssertionAttributes> {
    if !config.name_id_as_attribute || attributes.contains_key(NAME_ID_ATTRIBUTE) {
        return Cow::Borrowed(attributes);
    }
    let mut with_name_id = attributes.clone();
    with_name_id.insert(NAME_ID_ATTRIBUTE.to_string(), vec![name_id.to_string()]);
    Cow::Owned(with_name_id)
}

/// Compute the local account key for an assertion.
///
/// The configured attribute's first value is used when present; otherwise the
/// NameID. An attribute present with no values counts as absent.
pub fn resolve_local_key(
    config: &IdpConfig,
    attributes: &AssertionAttributes,
    name_id: &str,
) -> Result<String, MappingError> {
    let attributes = effective_attributes(config, attributes, name_id);

    let raw = if config.attribute_name.is_empty() {
        name_id
    } else {
        match attributes
            .get(&config.attribute_name)
            .and_then(|values| values.first())
        {
            Some(value) => value.as_str(),
            None => {
                tracing::debug!(
                    idp_id = %config.idp_id,
                    attribute = %config.attribute_name,
                    "Mapping attribute absent from assertion, falling back to NameID"
                );
                name_id
            }
        }
    };

    let key = if config.to_lower {
        raw.to_lowercase()
    } else {
        raw.to_string()
    };

    if key.is_empty() {
        return Err(MappingError::EmptyKey {
            idp_id: config.idp_id.clone(),
        });
    }

    Ok(key)
}

/// [`resolve_local_key`] bundled with the binding's lookup settings.
pub fn map_assertion(config: &IdpConfig, assertion: &Assertion) -> Result<LocalKey, MappingError> {
    let key = resolve_local_key(config, &assertion.attributes, &assertion.name_id)?;
    Ok(LocalKey {
        local_field: config.local_field,
        key,
        auto_create: config.auto_create,
    })
}
