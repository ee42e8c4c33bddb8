use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::{
    mapping::{
        self, Assertion, AssertionAttributes, AuthenticatedUser, LocalKey, LoginError,
        MappingError, UserResolver,
    },
    models::IdpConfig,
    schema::{ConfigForm, FormDefinition, IdpConfigSchema, IdpField, RawFields, ValidationErrors},
    store::{IdpConfigStore, StoreError, StoreResult},
};

/// Service layer for IdP binding configuration.
///
/// Composes the schema (validation and form), the store, and the mapping
/// engine behind the operations the admin surface needs.
#[derive(Clone)]
pub struct IdpConfigService {
    store: Arc<dyn IdpConfigStore>,
    form: ConfigForm<IdpConfigSchema>,
}

impl IdpConfigService {
    pub fn new(store: Arc<dyn IdpConfigStore>) -> Self {
        Self {
            store,
            form: ConfigForm::new(IdpConfigSchema),
        }
    }

    /// Get the binding for an IdP, if configured.
    pub async fn get(&self, idp_id: &str) -> StoreResult<Option<IdpConfig>> {
        self.store.get(idp_id).await
    }

    /// All bindings, ordered by IdP identifier.
    pub async fn list(&self) -> StoreResult<Vec<IdpConfig>> {
        self.store.list().await
    }

    /// Validate a form submission and persist it as the full binding for
    /// `idp_id`.
    ///
    /// The identifier from the caller always wins over any `idp_id` in the
    /// submitted fields. Fields not submitted take their defaults, so a save
    /// replaces the whole record.
    pub async fn save(
        &self,
        idp_id: &str,
        mut raw: RawFields,
    ) -> Result<IdpConfig, IdpConfigError> {
        raw.insert(IdpField::IdpId.key().to_string(), idp_id.to_string());

        let config = self.form.submit(&raw).inspect_err(|errors| {
            tracing::debug!(
                idp_id,
                error_count = errors.errors().len(),
                "Rejected IdP configuration"
            );
        })?;

        self.store.put(idp_id, config.clone()).await?;
        tracing::info!(
            idp_id = %config.idp_id,
            local_field = %config.local_field,
            auto_create = config.auto_create,
            "Saved IdP configuration"
        );

        Ok(config)
    }

    /// Remove the binding for an IdP. Removing an unknown IdP succeeds.
    pub async fn delete(&self, idp_id: &str) -> StoreResult<()> {
        self.store.delete(idp_id).await?;
        tracing::info!(idp_id, "Deleted IdP configuration");
        Ok(())
    }

    /// Form for editing an IdP's binding, pre-filled with the stored values
    /// or with the defaults for an IdP not configured yet.
    pub async fn form(&self, idp_id: &str) -> StoreResult<FormDefinition> {
        let config = self
            .store
            .get(idp_id)
            .await?
            .unwrap_or_else(|| IdpConfig::new(idp_id));
        Ok(self.form.definition(Some(&config)))
    }

    /// IdPs to offer as buttons on the login page.
    pub async fn login_links(&self) -> StoreResult<Vec<LoginLink>> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|config| config.show_login_link)
            .map(|config| LoginLink {
                idp_id: config.idp_id,
            })
            .collect())
    }

    /// IdPs whose metadata the scheduled refresh job should re-fetch.
    pub async fn metadata_refresh_targets(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|config| config.metadata_refresh_enabled)
            .map(|config| config.idp_id)
            .collect())
    }

    /// Show what an assertion would map to under an IdP's stored binding,
    /// without resolving or creating any account.
    pub async fn preview_mapping(
        &self,
        idp_id: &str,
        assertion: &Assertion,
    ) -> Result<MappingPreview, IdpConfigError> {
        let config = self.require(idp_id).await?;

        let attributes =
            mapping::effective_attributes(&config, &assertion.attributes, &assertion.name_id)
                .into_owned();
        let local_key = mapping::map_assertion(&config, assertion)?;

        Ok(MappingPreview {
            idp_id: config.idp_id,
            attributes,
            local_key,
        })
    }

    /// Complete an SSO login for an assertion from `idp_id`.
    pub async fn authenticate(
        &self,
        idp_id: &str,
        assertion: &Assertion,
        resolver: &dyn UserResolver,
    ) -> Result<AuthenticatedUser, IdpConfigError> {
        let config = self.require(idp_id).await?;
        Ok(mapping::authenticate(&config, assertion, resolver).await?)
    }

    /// Post-logout destination for users who signed in through `idp_id`.
    pub async fn logout_redirect(&self, idp_id: &str, default_url: &str) -> StoreResult<String> {
        Ok(match self.store.get(idp_id).await? {
            Some(config) => mapping::logout_redirect(&config, default_url).to_string(),
            None => default_url.to_string(),
        })
    }

    pub async fn health_check(&self) -> StoreResult<()> {
        self.store.health_check().await
    }

    async fn require(&self, idp_id: &str) -> Result<IdpConfig, IdpConfigError> {
        self.store
            .get(idp_id)
            .await?
            .ok_or_else(|| IdpConfigError::NotFound(idp_id.to_string()))
    }
}

/// An IdP shown on the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginLink {
    pub idp_id: String,
}

/// Result of a dry-run mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingPreview {
    pub idp_id: String,
    /// Attributes after NameID exposure
    pub attributes: AssertionAttributes,
    pub local_key: LocalKey,
}

#[derive(Debug, Error)]
pub enum IdpConfigError {
    #[error("Invalid IdP configuration: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IdP '{0}' is not configured")]
    NotFound(String),

    #[error("Mapping failed: {0}")]
    Mapping(#[from] MappingError),

    #[error("Login failed: {0}")]
    Login(LoginError),
}

impl From<LoginError> for IdpConfigError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::Mapping(e) => IdpConfigError::Mapping(e),
            other => IdpConfigError::Login(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::{
        mapping::{UserId, UserResolutionError},
        models::LocalField,
        schema::ValidationError,
        store::MemoryIdpConfigStore,
    };

    fn service() -> IdpConfigService {
        IdpConfigService::new(Arc::new(MemoryIdpConfigStore::new()))
    }

    fn raw(pairs: &[(&str, &str)]) -> RawFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Store whose backend is always unreachable.
    struct UnavailableStore;

    #[async_trait]
    impl IdpConfigStore for UnavailableStore {
        async fn get(&self, _idp_id: &str) -> StoreResult<Option<IdpConfig>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn put(&self, _idp_id: &str, _config: IdpConfig) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _idp_id: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn list(&self) -> StoreResult<Vec<IdpConfig>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    struct FixedResolver(UserId);

    #[async_trait]
    impl UserResolver for FixedResolver {
        async fn resolve_or_create_user(
            &self,
            _field: LocalField,
            _key: &str,
            _auto_create: bool,
        ) -> Result<UserId, UserResolutionError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let service = service();
        let saved = service
            .save(
                "acme",
                raw(&[
                    ("attribute_name", "mail"),
                    ("local_field", "email"),
                    ("to_lower", "1"),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(saved.idp_id, "acme");
        assert_eq!(saved.local_field, LocalField::Email);
        assert_eq!(service.get("acme").await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn test_save_uses_caller_identifier() {
        let service = service();
        let saved = service
            .save("acme", raw(&[("idp_id", "globex")]))
            .await
            .unwrap();

        assert_eq!(saved.idp_id, "acme");
        assert_eq!(service.get("globex").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_replaces_whole_record() {
        let service = service();
        service
            .save("acme", raw(&[("auto_create", "1"), ("attribute_name", "uid")]))
            .await
            .unwrap();
        service.save("acme", RawFields::new()).await.unwrap();

        assert_eq!(
            service.get("acme").await.unwrap(),
            Some(IdpConfig::new("acme"))
        );
    }

    #[tokio::test]
    async fn test_save_invalid_persists_nothing() {
        let service = service();
        let err = service
            .save("acme", raw(&[("local_field", "idnumber")]))
            .await
            .unwrap_err();

        let IdpConfigError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.contains(&ValidationError::UnknownEnumValue {
            field: "local_field",
            value: "idnumber".to_string(),
        }));
        assert_eq!(service.get("acme").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_rejects_padded_identifier() {
        let service = service();
        service.save("acme", raw(&[("attribute_name", "uid")])).await.unwrap();

        let err = service.save(" acme ", RawFields::new()).await.unwrap_err();
        let IdpConfigError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.contains(&ValidationError::SurroundingWhitespace { field: "idp_id" }));

        assert_eq!(service.get(" acme ").await.unwrap(), None);
        let existing = service.get("acme").await.unwrap().unwrap();
        assert_eq!(existing.attribute_name, "uid");
    }

    #[tokio::test]
    async fn test_form_for_new_and_existing_idp() {
        let service = service();

        let form = service.form("acme").await.unwrap();
        assert_eq!(form.value("idp_id"), Some("acme"));
        assert_eq!(form.value("show_login_link"), Some("1"));

        service
            .save("acme", raw(&[("show_login_link", "0")]))
            .await
            .unwrap();
        let form = service.form("acme").await.unwrap();
        assert_eq!(form.value("show_login_link"), Some("0"));
    }

    #[tokio::test]
    async fn test_login_links_and_refresh_targets() {
        let service = service();
        service.save("a", RawFields::new()).await.unwrap();
        service
            .save(
                "b",
                raw(&[("show_login_link", "0"), ("metadata_refresh_enabled", "1")]),
            )
            .await
            .unwrap();

        assert_eq!(
            service.login_links().await.unwrap(),
            vec![LoginLink {
                idp_id: "a".to_string()
            }]
        );
        assert_eq!(
            service.metadata_refresh_targets().await.unwrap(),
            vec!["b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_preview_mapping() {
        let service = service();
        service
            .save(
                "acme",
                raw(&[
                    ("name_id_as_attribute", "1"),
                    ("attribute_name", "NameID"),
                    ("to_lower", "1"),
                ]),
            )
            .await
            .unwrap();
        let assertion = Assertion {
            name_id: "JDoe".to_string(),
            attributes: AssertionAttributes::new(),
        };

        let preview = service.preview_mapping("acme", &assertion).await.unwrap();

        assert_eq!(preview.attributes["NameID"], vec!["JDoe".to_string()]);
        assert_eq!(preview.local_key.key, "jdoe");
        assert_eq!(preview.local_key.local_field, LocalField::Username);
    }

    #[tokio::test]
    async fn test_preview_mapping_errors() {
        let service = service();
        let assertion = Assertion::default();

        let err = service
            .preview_mapping("acme", &assertion)
            .await
            .unwrap_err();
        assert!(matches!(err, IdpConfigError::NotFound(_)));

        service.save("acme", RawFields::new()).await.unwrap();
        let err = service
            .preview_mapping("acme", &assertion)
            .await
            .unwrap_err();
        assert!(matches!(err, IdpConfigError::Mapping(_)));
    }

    #[tokio::test]
    async fn test_authenticate_through_stored_binding() {
        let service = service();
        service.save("acme", RawFields::new()).await.unwrap();
        let user_id = Uuid::new_v4();
        let assertion = Assertion {
            name_id: "jdoe".to_string(),
            attributes: AssertionAttributes::new(),
        };

        let user = service
            .authenticate("acme", &assertion, &FixedResolver(user_id))
            .await
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.key, "jdoe");

        let err = service
            .authenticate("unknown", &assertion, &FixedResolver(user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, IdpConfigError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_logout_redirect() {
        let service = service();
        service
            .save(
                "acme",
                raw(&[("alternate_logout_url", "https://example.com/bye")]),
            )
            .await
            .unwrap();

        assert_eq!(
            service.logout_redirect("acme", "/").await.unwrap(),
            "https://example.com/bye"
        );
        assert_eq!(service.logout_redirect("other", "/").await.unwrap(), "/");
    }

    #[tokio::test]
    async fn test_unavailable_store_is_reported() {
        let service = IdpConfigService::new(Arc::new(UnavailableStore));

        let err = service.get("acme").await.unwrap_err();
        assert!(err.is_retryable());

        let err = service.save("acme", RawFields::new()).await.unwrap_err();
        assert!(matches!(
            err,
            IdpConfigError::Store(StoreError::Unavailable(_))
        ));

        assert!(service.login_links().await.is_err());
    }
}
