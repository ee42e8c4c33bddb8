use async_trait::async_trait;
use uuid::Uuid;

use super::{Assertion, LoginError, UserResolutionError, map_assertion};
use crate::models::{IdpConfig, LocalField};

/// Identifier of a local account.
pub type UserId = Uuid;

/// Looks up, or provisions, the local account for a mapped key.
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Find the account whose `field` equals `key`. When none exists and
    /// `auto_create` is set, create one.
    async fn resolve_or_create_user(
        &self,
        field: LocalField,
        key: &str,
        auto_create: bool,
    ) -> Result<UserId, UserResolutionError>;
}

/// Result of a successful SSO login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub idp_id: String,
    pub local_field: LocalField,
    pub key: String,
}

/// Map an assertion with the IdP binding and resolve the local account.
///
/// Failures are logged for the administrator; the caller reports them to the
/// end user as a failed login.
pub async fn authenticate(
    config: &IdpConfig,
    assertion: &Assertion,
    resolver: &dyn UserResolver,
) -> Result<AuthenticatedUser, LoginError> {
    let mapped = map_assertion(config, assertion).inspect_err(|e| {
        tracing::warn!(idp_id = %config.idp_id, error = %e, "SAML assertion mapping failed");
    })?;

    let user_id = resolver
        .resolve_or_create_user(mapped.local_field, &mapped.key, mapped.auto_create)
        .await
        .inspect_err(|e| {
            tracing::warn!(
                idp_id = %config.idp_id,
                field = %mapped.local_field,
                error = %e,
                "Local account resolution failed"
            );
        })?;

    tracing::info!(
        idp_id = %config.idp_id,
        field = %mapped.local_field,
        user_id = %user_id,
        "SSO login mapped to local account"
    );

    Ok(AuthenticatedUser {
        user_id,
        idp_id: config.idp_id.clone(),
        local_field: mapped.local_field,
        key: mapped.key,
    })
}

/// Where to send a user after logging out through this IdP.
pub fn logout_redirect<'a>(config: &'a IdpConfig, default_url: &'a str) -> &'a str {
    config.alternate_logout_url.as_deref().unwrap_or(default_url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokio::sync::Mutex;

    use super::*;
    use crate::mapping::{AssertionAttributes, MappingError};

    /// Directory keyed by (field, value), creating accounts on demand.
    #[derive(Default)]
    struct InMemoryDirectory {
        accounts: Mutex<HashMap<(LocalField, String), Uuid>>,
    }

    impl InMemoryDirectory {
        async fn with_account(field: LocalField, key: &str) -> (Self, Uuid) {
            let directory = Self::default();
            let id = Uuid::new_v4();
            directory
                .accounts
                .lock()
                .await
                .insert((field, key.to_string()), id);
            (directory, id)
        }
    }

    #[async_trait]
    impl UserResolver for InMemoryDirectory {
        async fn resolve_or_create_user(
            &self,
            field: LocalField,
            key: &str,
            auto_create: bool,
        ) -> Result<Uuid, UserResolutionError> {
            let mut accounts = self.accounts.lock().await;
            if let Some(id) = accounts.get(&(field, key.to_string())) {
                return Ok(*id);
            }
            if !auto_create {
                return Err(UserResolutionError::NotFound {
                    field,
                    key: key.to_string(),
                });
            }
            let id = Uuid::new_v4();
            accounts.insert((field, key.to_string()), id);
            Ok(id)
        }
    }

    fn email_binding(auto_create: bool) -> IdpConfig {
        let mut config = IdpConfig::new("acme");
        config.attribute_name = "mail".to_string();
        config.local_field = LocalField::Email;
        config.to_lower = true;
        config.auto_create = auto_create;
        config
    }

    fn assertion(mail: &str) -> Assertion {
        Assertion {
            name_id: "opaque-123".to_string(),
            attributes: AssertionAttributes::from([("mail".to_string(), vec![mail.to_string()])]),
        }
    }

    #[tokio::test]
    async fn test_existing_account_is_resolved() {
        let (directory, id) =
            InMemoryDirectory::with_account(LocalField::Email, "jane@example.com").await;

        let user = authenticate(&email_binding(false), &assertion("Jane@Example.com"), &directory)
            .await
            .unwrap();

        assert_eq!(user.user_id, id);
        assert_eq!(user.key, "jane@example.com");
        assert_eq!(user.local_field, LocalField::Email);
        assert_eq!(user.idp_id, "acme");
    }

    #[tokio::test]
    async fn test_unknown_account_without_auto_create_fails() {
        let directory = InMemoryDirectory::default();

        let err = authenticate(&email_binding(false), &assertion("new@example.com"), &directory)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LoginError::Resolution(UserResolutionError::NotFound {
                field: LocalField::Email,
                key: "new@example.com".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_account_with_auto_create_is_provisioned() {
        let directory = InMemoryDirectory::default();
        let binding = email_binding(true);

        let first = authenticate(&binding, &assertion("New@Example.com"), &directory)
            .await
            .unwrap();
        let second = authenticate(&binding, &assertion("new@example.com"), &directory)
            .await
            .unwrap();

        assert_eq!(first.user_id, second.user_id);
    }

    #[tokio::test]
    async fn test_mapping_failure_skips_resolution() {
        let directory = InMemoryDirectory::default();
        let binding = email_binding(true);
        let assertion = Assertion {
            name_id: String::new(),
            attributes: AssertionAttributes::new(),
        };

        let err = authenticate(&binding, &assertion, &directory)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LoginError::Mapping(MappingError::EmptyKey { .. })
        ));
        assert!(directory.accounts.lock().await.is_empty());
    }

    #[test]
    fn test_logout_redirect() {
        let mut config = IdpConfig::new("acme");
        assert_eq!(logout_redirect(&config, "/"), "/");

        config.alternate_logout_url = Some("https://example.com/bye".to_string());
        assert_eq!(logout_redirect(&config, "/"), "https://example.com/bye");
    }
}
