use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Maximum length (in characters) of the SAML attribute name holding the mapping key.
pub const MAX_ATTRIBUTE_NAME_LENGTH: usize = 50;

/// Maximum length (in characters) of an IdP identifier.
pub const MAX_IDP_ID_LENGTH: usize = 255;

/// Reason `value` cannot be used as a post-logout redirect, if any.
///
/// Only absolute http(s) URLs with a host are accepted; anything else would
/// end up verbatim in a `Location` header.
pub fn logout_url_problem(value: &str) -> Option<String> {
    let parsed = match url::Url::parse(value) {
        Ok(parsed) => parsed,
        Err(e) => return Some(e.to_string()),
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return Some("scheme must be http or https".to_string());
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Some("missing host".to_string());
    }
    None
}

/// IdP identifiers are stored and looked up verbatim, so padding is refused
/// rather than stripped.
pub fn has_surrounding_whitespace(value: &str) -> bool {
    value.trim() != value
}

fn validate_idp_id(idp_id: &str) -> Result<(), ValidationError> {
    if has_surrounding_whitespace(idp_id) {
        let mut err = ValidationError::new("surrounding_whitespace");
        err.message = Some(Cow::Borrowed(
            "IdP identifier cannot start or end with whitespace",
        ));
        return Err(err);
    }
    Ok(())
}

fn validate_logout_url(url: &str) -> Result<(), ValidationError> {
    match logout_url_problem(url) {
        Some(reason) => {
            let mut err = ValidationError::new("invalid_logout_url");
            err.message = Some(Cow::Owned(reason));
            Err(err)
        }
        None => Ok(()),
    }
}

/// NameID format requested from and accepted by the IdP.
///
/// The eight formats defined in section 8.3 of the SAML 2.0 core specification.
/// Serialized as the full URN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NameIdPolicy {
    #[default]
    #[serde(rename = "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified")]
    Unspecified,
    #[serde(rename = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress")]
    EmailAddress,
    #[serde(rename = "urn:oasis:names:tc:SAML:1.1:nameid-format:X509SubjectName")]
    X509SubjectName,
    #[serde(rename = "urn:oasis:names:tc:SAML:1.1:nameid-format:WindowsDomainQualifiedName")]
    WindowsDomainQualifiedName,
    #[serde(rename = "urn:oasis:names:tc:SAML:2.0:nameid-format:kerberos")]
    Kerberos,
    #[serde(rename = "urn:oasis:names:tc:SAML:2.0:nameid-format:entity")]
    Entity,
    #[serde(rename = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent")]
    Persistent,
    #[serde(rename = "urn:oasis:names:tc:SAML:2.0:nameid-format:transient")]
    Transient,
}

impl NameIdPolicy {
    /// All supported formats, in the order they are offered to administrators.
    pub const ALL: [NameIdPolicy; 8] = [
        NameIdPolicy::Unspecified,
        NameIdPolicy::EmailAddress,
        NameIdPolicy::X509SubjectName,
        NameIdPolicy::WindowsDomainQualifiedName,
        NameIdPolicy::Kerberos,
        NameIdPolicy::Entity,
        NameIdPolicy::Persistent,
        NameIdPolicy::Transient,
    ];

    /// The format URN.
    pub const fn as_uri(&self) -> &'static str {
        match self {
            NameIdPolicy::Unspecified => "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
            NameIdPolicy::EmailAddress => "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress",
            NameIdPolicy::X509SubjectName => {
                "urn:oasis:names:tc:SAML:1.1:nameid-format:X509SubjectName"
            }
            NameIdPolicy::WindowsDomainQualifiedName => {
                "urn:oasis:names:tc:SAML:1.1:nameid-format:WindowsDomainQualifiedName"
            }
            NameIdPolicy::Kerberos => "urn:oasis:names:tc:SAML:2.0:nameid-format:kerberos",
            NameIdPolicy::Entity => "urn:oasis:names:tc:SAML:2.0:nameid-format:entity",
            NameIdPolicy::Persistent => "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
            NameIdPolicy::Transient => "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
        }
    }
}

impl std::fmt::Display for NameIdPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_uri())
    }
}

impl std::str::FromStr for NameIdPolicy {
    type Err = String;

    /// URNs are matched exactly; the SAML specification defines them case-sensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NameIdPolicy::ALL
            .into_iter()
            .find(|policy| policy.as_uri() == s)
            .ok_or_else(|| format!("Invalid NameID policy: {}", s))
    }
}

/// Local account field the mapped key is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocalField {
    #[default]
    Username,
    Email,
}

impl LocalField {
    pub const ALL: [LocalField; 2] = [LocalField::Username, LocalField::Email];

    pub const fn as_str(&self) -> &'static str {
        match self {
            LocalField::Username => "username",
            LocalField::Email => "email",
        }
    }
}

impl std::fmt::Display for LocalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LocalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "username" => Ok(LocalField::Username),
            "email" => Ok(LocalField::Email),
            _ => Err(format!("Invalid local field: {}", s)),
        }
    }
}

/// Binding of one SAML2 identity provider to local accounts.
///
/// Records are replaced as a whole; there is no partial update. The derive
/// rules mirror the schema limits so a store can re-check records that did
/// not come through form validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct IdpConfig {
    /// Opaque IdP identifier, immutable once created
    #[validate(length(min = 1, max = 255), custom(function = "validate_idp_id"))]
    pub idp_id: String,
    /// NameID format to request
    pub name_id_policy: NameIdPolicy,
    /// Expose the NameID value as an assertion attribute named `NameID`
    pub name_id_as_attribute: bool,
    /// SAML attribute holding the mapping key; empty means use the NameID
    #[validate(length(max = 50))]
    pub attribute_name: String,
    /// Local account field the key is matched against
    pub local_field: LocalField,
    /// Lower-case the key before matching
    pub to_lower: bool,
    /// Provision a local account when no match exists
    pub auto_create: bool,
    /// Where to send users after logout instead of the default page
    #[validate(custom(function = "validate_logout_url"))]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alternate_logout_url: Option<String>,
    /// Periodically refresh the IdP metadata
    pub metadata_refresh_enabled: bool,
    /// Offer this IdP on the login page
    pub show_login_link: bool,
}

impl IdpConfig {
    /// A record with every optional field at its default.
    pub fn new(idp_id: impl Into<String>) -> Self {
        Self {
            idp_id: idp_id.into(),
            name_id_policy: NameIdPolicy::default(),
            name_id_as_attribute: false,
            attribute_name: String::new(),
            local_field: LocalField::default(),
            to_lower: false,
            auto_create: false,
            alternate_logout_url: None,
            metadata_refresh_enabled: false,
            show_login_link: true,
        }
    }
}
