use super::{ConfigSchema, FieldKind, FieldSpec, RawFields, ValidationError, ValidationErrors};
use crate::models::{
    IdpConfig, LocalField, MAX_ATTRIBUTE_NAME_LENGTH, MAX_IDP_ID_LENGTH, NameIdPolicy,
    has_surrounding_whitespace, logout_url_problem,
};

/// Fields of an IdP binding, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdpField {
    MetadataRefreshEnabled,
    ShowLoginLink,
    NameIdPolicy,
    NameIdAsAttribute,
    AttributeName,
    LocalField,
    ToLower,
    AutoCreate,
    AlternateLogoutUrl,
    IdpId,
}

impl IdpField {
    pub const ALL: [IdpField; 10] = [
        IdpField::MetadataRefreshEnabled,
        IdpField::ShowLoginLink,
        IdpField::NameIdPolicy,
        IdpField::NameIdAsAttribute,
        IdpField::AttributeName,
        IdpField::LocalField,
        IdpField::ToLower,
        IdpField::AutoCreate,
        IdpField::AlternateLogoutUrl,
        IdpField::IdpId,
    ];

    pub const fn key(&self) -> &'static str {
        match self {
            IdpField::MetadataRefreshEnabled => "metadata_refresh_enabled",
            IdpField::ShowLoginLink => "show_login_link",
            IdpField::NameIdPolicy => "name_id_policy",
            IdpField::NameIdAsAttribute => "name_id_as_attribute",
            IdpField::AttributeName => "attribute_name",
            IdpField::LocalField => "local_field",
            IdpField::ToLower => "to_lower",
            IdpField::AutoCreate => "auto_create",
            IdpField::AlternateLogoutUrl => "alternate_logout_url",
            IdpField::IdpId => "idp_id",
        }
    }

    pub fn spec(&self) -> &'static FieldSpec {
        &IDP_FIELDS[*self as usize]
    }
}

const NAME_ID_POLICY_OPTIONS: [&str; 8] = [
    NameIdPolicy::Unspecified.as_uri(),
    NameIdPolicy::EmailAddress.as_uri(),
    NameIdPolicy::X509SubjectName.as_uri(),
    NameIdPolicy::WindowsDomainQualifiedName.as_uri(),
    NameIdPolicy::Kerberos.as_uri(),
    NameIdPolicy::Entity.as_uri(),
    NameIdPolicy::Persistent.as_uri(),
    NameIdPolicy::Transient.as_uri(),
];

const LOCAL_FIELD_OPTIONS: [&str; 2] = [LocalField::Username.as_str(), LocalField::Email.as_str()];

// Indexed by `IdpField as usize`; keep the order in sync with `IdpField::ALL`.
static IDP_FIELDS: [FieldSpec; 10] = [
    FieldSpec {
        key: IdpField::MetadataRefreshEnabled.key(),
        label: "IdP metadata refresh",
        help: "Periodically re-fetch the IdP metadata so certificate and endpoint changes are picked up.",
        kind: FieldKind::YesNo,
        default: Some("0"),
    },
    FieldSpec {
        key: IdpField::ShowLoginLink.key(),
        label: "Show IdP link",
        help: "Display a link for this IdP on the login page.",
        kind: FieldKind::YesNo,
        default: Some("1"),
    },
    FieldSpec {
        key: IdpField::NameIdPolicy.key(),
        label: "NameID policy",
        help: "NameID format requested from the IdP (SAML 2.0 core, section 8.3).",
        kind: FieldKind::Select {
            options: &NAME_ID_POLICY_OPTIONS,
        },
        default: Some(NameIdPolicy::Unspecified.as_uri()),
    },
    FieldSpec {
        key: IdpField::NameIdAsAttribute.key(),
        label: "Expose NameID as attribute",
        help: "Make the NameID value available as an attribute named NameID.",
        kind: FieldKind::YesNo,
        default: Some("0"),
    },
    FieldSpec {
        key: IdpField::AttributeName.key(),
        label: "Mapping attribute",
        help: "SAML attribute holding the value matched against the local account field. Leave empty to use the NameID.",
        kind: FieldKind::Text {
            max_length: MAX_ATTRIBUTE_NAME_LENGTH,
        },
        default: Some(""),
    },
    FieldSpec {
        key: IdpField::LocalField.key(),
        label: "Mapping local field",
        help: "Local account field the mapped value is matched against.",
        kind: FieldKind::Select {
            options: &LOCAL_FIELD_OPTIONS,
        },
        default: Some(LocalField::Username.as_str()),
    },
    FieldSpec {
        key: IdpField::ToLower.key(),
        label: "Case-insensitive matching",
        help: "Lower-case the mapped value before matching.",
        kind: FieldKind::YesNo,
        default: Some("0"),
    },
    FieldSpec {
        key: IdpField::AutoCreate.key(),
        label: "Auto create users",
        help: "Create a local account when no account matches the mapped value.",
        kind: FieldKind::YesNo,
        default: Some("0"),
    },
    FieldSpec {
        key: IdpField::AlternateLogoutUrl.key(),
        label: "Logout URL",
        help: "Send users here after logout instead of the default page.",
        kind: FieldKind::Url,
        default: None,
    },
    FieldSpec {
        key: IdpField::IdpId.key(),
        label: "IdP identifier",
        help: "",
        kind: FieldKind::Hidden,
        default: None,
    },
];

/// Schema for [`IdpConfig`] records.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdpConfigSchema;

impl ConfigSchema for IdpConfigSchema {
    type Record = IdpConfig;

    fn fields(&self) -> &'static [FieldSpec] {
        &IDP_FIELDS
    }

    fn validate(&self, raw: &RawFields) -> Result<IdpConfig, ValidationErrors> {
        let mut config = IdpConfig::new(String::new());
        let mut errors = ValidationErrors::new();

        for field in IdpField::ALL {
            let value = raw.get(field.key()).map(String::as_str);
            if let Err(e) = apply_field(&mut config, field, value) {
                errors.push(e);
            }
        }

        errors.into_result(|| config)
    }

    fn to_raw_fields(&self, config: &IdpConfig) -> RawFields {
        IdpField::ALL
            .into_iter()
            .map(|field| {
                let value = match field {
                    IdpField::IdpId => config.idp_id.clone(),
                    IdpField::NameIdPolicy => config.name_id_policy.as_uri().to_string(),
                    IdpField::NameIdAsAttribute => yes_no(config.name_id_as_attribute),
                    IdpField::AttributeName => config.attribute_name.clone(),
                    IdpField::LocalField => config.local_field.as_str().to_string(),
                    IdpField::ToLower => yes_no(config.to_lower),
                    IdpField::AutoCreate => yes_no(config.auto_create),
                    IdpField::AlternateLogoutUrl => {
                        config.alternate_logout_url.clone().unwrap_or_default()
                    }
                    IdpField::MetadataRefreshEnabled => yes_no(config.metadata_refresh_enabled),
                    IdpField::ShowLoginLink => yes_no(config.show_login_link),
                };
                (field.key().to_string(), value)
            })
            .collect()
    }
}

/// Parse one submitted value into the record.
///
/// Values are trimmed and a blank value counts as absent. Length limits apply
/// to the text as submitted, and the identifier is never trimmed.
fn apply_field(
    config: &mut IdpConfig,
    field: IdpField,
    submitted: Option<&str>,
) -> Result<(), ValidationError> {
    let key = field.key();
    let value = submitted.map(str::trim).filter(|v| !v.is_empty());
    match field {
        IdpField::IdpId => {
            let submitted = submitted
                .filter(|_| value.is_some())
                .ok_or(ValidationError::MissingField { field: key })?;
            if has_surrounding_whitespace(submitted) {
                return Err(ValidationError::SurroundingWhitespace { field: key });
            }
            check_length(key, submitted, MAX_IDP_ID_LENGTH)?;
            config.idp_id = submitted.to_string();
        }
        IdpField::NameIdPolicy => {
            if let Some(value) = value {
                config.name_id_policy =
                    value
                        .parse()
                        .map_err(|_| ValidationError::UnknownEnumValue {
                            field: key,
                            value: value.to_string(),
                        })?;
            }
        }
        IdpField::LocalField => {
            if let Some(value) = value {
                config.local_field =
                    value
                        .parse()
                        .map_err(|_| ValidationError::UnknownEnumValue {
                            field: key,
                            value: value.to_string(),
                        })?;
            }
        }
        IdpField::AttributeName => {
            check_length(key, submitted.unwrap_or_default(), MAX_ATTRIBUTE_NAME_LENGTH)?;
            config.attribute_name = value.unwrap_or_default().to_string();
        }
        IdpField::AlternateLogoutUrl => {
            config.alternate_logout_url = value.map(|v| check_url(key, v)).transpose()?;
        }
        IdpField::NameIdAsAttribute => {
            config.name_id_as_attribute = parse_bool(key, value, false)?;
        }
        IdpField::ToLower => config.to_lower = parse_bool(key, value, false)?,
        IdpField::AutoCreate => config.auto_create = parse_bool(key, value, false)?,
        IdpField::MetadataRefreshEnabled => {
            config.metadata_refresh_enabled = parse_bool(key, value, false)?;
        }
        IdpField::ShowLoginLink => config.show_login_link = parse_bool(key, value, true)?,
    }
    Ok(())
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(())
}

fn check_url(field: &'static str, value: &str) -> Result<String, ValidationError> {
    match logout_url_problem(value) {
        Some(reason) => Err(ValidationError::InvalidUrl { field, reason }),
        None => Ok(value.to_string()),
    }
}

fn parse_bool(
    field: &'static str,
    value: Option<&str>,
    default: bool,
) -> Result<bool, ValidationError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ValidationError::InvalidBoolean {
            field,
            value: value.to_string(),
        }),
    }
}

fn yes_no(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}
