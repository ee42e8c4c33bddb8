use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{IdpConfigStore, StoreError, StoreResult, check_record};
use crate::models::{IdpConfig, LocalField, NameIdPolicy};

const SELECT_COLUMNS: &str = r#"
    SELECT idp_id, name_id_policy, name_id_as_attribute, attribute_name, local_field,
           to_lower, auto_create, alternate_logout_url, metadata_refresh_enabled,
           show_login_link
    FROM idp_configs
"#;

/// SQLite-backed store. One row per IdP in `idp_configs`.
pub struct SqliteIdpConfigStore {
    pool: SqlitePool,
}

impl SqliteIdpConfigStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the pool described by `config`, running migrations if enabled.
    #[cfg(feature = "server")]
    pub async fn from_config(config: &crate::config::SqliteConfig) -> StoreResult<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(
                sqlx::sqlite::SqliteConnectOptions::new()
                    .filename(&config.path)
                    .create_if_missing(config.create_if_missing)
                    .journal_mode(if config.wal_mode {
                        sqlx::sqlite::SqliteJournalMode::Wal
                    } else {
                        sqlx::sqlite::SqliteJournalMode::Delete
                    })
                    .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms)),
            )
            .await?;

        let store = Self::new(pool);
        if config.run_migrations {
            store.migrate().await?;
        }
        Ok(store)
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        tracing::info!("Running SQLite migrations");
        sqlx::migrate!("./migrations_sqlx/sqlite")
            .run(&self.pool)
            .await?;
        tracing::info!("SQLite migrations completed successfully");
        Ok(())
    }

    fn parse_config(row: &sqlx::sqlite::SqliteRow) -> StoreResult<IdpConfig> {
        let idp_id: String = row.try_get("idp_id")?;

        let policy_str: String = row.try_get("name_id_policy")?;
        let name_id_policy = policy_str.parse::<NameIdPolicy>().map_err(|e| {
            StoreError::Backend(format!("corrupt record for IdP '{}': {}", idp_id, e))
        })?;

        let local_field_str: String = row.try_get("local_field")?;
        let local_field = local_field_str.parse::<LocalField>().map_err(|e| {
            StoreError::Backend(format!("corrupt record for IdP '{}': {}", idp_id, e))
        })?;

        Ok(IdpConfig {
            name_id_policy,
            name_id_as_attribute: row.try_get::<i32, _>("name_id_as_attribute")? != 0,
            attribute_name: row.try_get("attribute_name")?,
            local_field,
            to_lower: row.try_get::<i32, _>("to_lower")? != 0,
            auto_create: row.try_get::<i32, _>("auto_create")? != 0,
            alternate_logout_url: row.try_get("alternate_logout_url")?,
            metadata_refresh_enabled: row.try_get::<i32, _>("metadata_refresh_enabled")? != 0,
            show_login_link: row.try_get::<i32, _>("show_login_link")? != 0,
            idp_id,
        })
    }
}

#[async_trait]
impl IdpConfigStore for SqliteIdpConfigStore {
    async fn get(&self, idp_id: &str) -> StoreResult<Option<IdpConfig>> {
        let query = format!("{} WHERE idp_id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(idp_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_config).transpose()
    }

    async fn put(&self, idp_id: &str, config: IdpConfig) -> StoreResult<()> {
        check_record(idp_id, &config)?;

        // Single statement so readers never observe a partially written record.
        sqlx::query(
            r#"
            INSERT INTO idp_configs (
                idp_id, name_id_policy, name_id_as_attribute, attribute_name, local_field,
                to_lower, auto_create, alternate_logout_url, metadata_refresh_enabled,
                show_login_link
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (idp_id) DO UPDATE SET
                name_id_policy = excluded.name_id_policy,
                name_id_as_attribute = excluded.name_id_as_attribute,
                attribute_name = excluded.attribute_name,
                local_field = excluded.local_field,
                to_lower = excluded.to_lower,
                auto_create = excluded.auto_create,
                alternate_logout_url = excluded.alternate_logout_url,
                metadata_refresh_enabled = excluded.metadata_refresh_enabled,
                show_login_link = excluded.show_login_link
            "#,
        )
        .bind(&config.idp_id)
        .bind(config.name_id_policy.as_uri())
        .bind(config.name_id_as_attribute as i32)
        .bind(&config.attribute_name)
        .bind(config.local_field.as_str())
        .bind(config.to_lower as i32)
        .bind(config.auto_create as i32)
        .bind(&config.alternate_logout_url)
        .bind(config.metadata_refresh_enabled as i32)
        .bind(config.show_login_link as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, idp_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM idp_configs WHERE idp_id = ?")
            .bind(idp_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<IdpConfig>> {
        let query = format!("{} ORDER BY idp_id ASC", SELECT_COLUMNS);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::parse_config).collect()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocalField, NameIdPolicy};

    async fn create_store() -> SqliteIdpConfigStore {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        let store = SqliteIdpConfigStore::new(pool);
        store.migrate().await.expect("Failed to run SQLite migrations");
        store
    }

    fn full_config(idp_id: &str) -> IdpConfig {
        IdpConfig {
            idp_id: idp_id.to_string(),
            name_id_policy: NameIdPolicy::Persistent,
            name_id_as_attribute: true,
            attribute_name: "mail".to_string(),
            local_field: LocalField::Email,
            to_lower: true,
            auto_create: true,
            alternate_logout_url: Some("https://example.com/bye".to_string()),
            metadata_refresh_enabled: true,
            show_login_link: false,
        }
    }

    #[tokio::test]
    async fn test_put_then_get_returns_equal_record() {
        let store = create_store().await;

        let config = full_config("https://idp.example.com/metadata");
        store
            .put("https://idp.example.com/metadata", config.clone())
            .await
            .unwrap();

        let fetched = store.get("https://idp.example.com/metadata").await.unwrap();
        assert_eq!(fetched, Some(config));
    }

    #[tokio::test]
    async fn test_defaults_round_trip() {
        let store = create_store().await;
        store.put("acme", IdpConfig::new("acme")).await.unwrap();
        assert_eq!(
            store.get("acme").await.unwrap(),
            Some(IdpConfig::new("acme"))
        );
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_row() {
        let store = create_store().await;
        store.put("acme", full_config("acme")).await.unwrap();
        store.put("acme", IdpConfig::new("acme")).await.unwrap();

        assert_eq!(
            store.get("acme").await.unwrap(),
            Some(IdpConfig::new("acme"))
        );
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_then_get_returns_none() {
        let store = create_store().await;
        store.put("acme", full_config("acme")).await.unwrap();

        store.delete("acme").await.unwrap();
        assert_eq!(store.get("acme").await.unwrap(), None);
        store.delete("acme").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_orders_by_identifier() {
        let store = create_store().await;
        store.put("b", IdpConfig::new("b")).await.unwrap();
        store.put("a", IdpConfig::new("a")).await.unwrap();

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.idp_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_put_rejects_mismatched_identifier() {
        let store = create_store().await;
        let err = store.put("acme", full_config("globex")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_corrupt_row_is_reported() {
        let store = create_store().await;
        sqlx::query("INSERT INTO idp_configs (idp_id, name_id_policy) VALUES ('bad', 'bogus')")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.get("bad").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[cfg(feature = "server")]
    #[tokio::test]
    async fn test_from_config_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idps.db");
        let config = crate::config::SqliteConfig {
            path: path.to_string_lossy().into_owned(),
            create_if_missing: true,
            run_migrations: true,
            wal_mode: true,
            busy_timeout_ms: 1000,
            max_connections: 2,
        };

        let store = SqliteIdpConfigStore::from_config(&config).await.unwrap();
        store.put("acme", full_config("acme")).await.unwrap();
        drop(store);

        let reopened = SqliteIdpConfigStore::from_config(&config).await.unwrap();
        assert_eq!(
            reopened.get("acme").await.unwrap(),
            Some(full_config("acme"))
        );
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable() {
        let store = create_store().await;
        store.pool.close().await;

        let err = store.get("acme").await.unwrap_err();
        assert!(err.is_retryable(), "expected Unavailable, got {err:?}");
        assert!(store.health_check().await.is_err());
    }
}
