use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert};
use gcloud_spanner::row::Row;
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SpannerConfig;
use crate::models::Item;
use crate::store::{parse_item_id, ItemFilter, ItemStore, NewItem};

const ITEMS_TABLE: &str = "items";

/// Item store backed by Cloud Spanner.
///
/// The opaque payload lives in a JSON column; `owner` is a separate indexed
/// column so that every query can carry the ownership predicate.
#[derive(Clone)]
pub struct SpannerStore {
    inner: Arc<Client>,
}

impl SpannerStore {
    /// Create a new Spanner-backed store from configuration
    ///
    /// The gcloud-spanner library automatically detects the
    /// SPANNER_EMULATOR_HOST environment variable and connects to
    /// the emulator when set, or production Spanner otherwise.
    ///
    /// This function also performs auto-provisioning: it will automatically
    /// create the instance, database, and items table if they don't exist.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        auto_provision(config).await?;

        let database_path = config.database_path();

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        // ClientConfig::default() automatically uses SPANNER_EMULATOR_HOST if set
        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }

    async fn query(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let mut statement = Statement::new(select_sql(filter));
        statement.add_param("owner", &filter.owner().to_string());
        if let Some(id) = filter.id() {
            statement.add_param("id", &parse_item_id(id)?.to_string());
        }

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query items from Spanner")?;

        let mut items = Vec::new();
        while let Some(row) = result_set.next().await? {
            items.push(item_from_row(&row)?);
        }

        Ok(items)
    }
}

#[async_trait]
impl ItemStore for SpannerStore {
    async fn insert(&self, item: NewItem) -> Result<Item> {
        let id = Uuid::new_v4().to_string();
        let data_str = serde_json::to_string(&item.fields)
            .context("Failed to serialize item payload")?;

        let mutation = insert(
            ITEMS_TABLE,
            &["id", "owner", "data", "created_at", "updated_at"],
            &[&id, &item.owner, &data_str, &CommitTimestamp::new(), &CommitTimestamp::new()],
        );

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to insert item into Spanner")?;

        tracing::debug!("Inserted item with id: {}", id);

        // Read back to pick up the commit timestamps
        let filter = ItemFilter::owned_by(item.owner).with_id(id.clone());
        self.find_one(&filter)
            .await?
            .with_context(|| format!("Inserted item {} was not readable", id))
    }

    async fn find(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let items = self.query(filter).await?;
        tracing::debug!("Found {} items for owner: {}", items.len(), filter.owner());
        Ok(items)
    }

    async fn find_one(&self, filter: &ItemFilter) -> Result<Option<Item>> {
        Ok(self.query(filter).await?.into_iter().next())
    }

    async fn delete_one(&self, filter: &ItemFilter) -> Result<bool> {
        let Some(item) = self.find_one(filter).await? else {
            return Ok(false);
        };

        self.inner
            .apply(vec![delete(ITEMS_TABLE, Key::new(&item.id))])
            .await
            .context("Failed to delete item from Spanner")?;

        tracing::debug!("Deleted item with id: {}", item.id);
        Ok(true)
    }

    /// Perform a health check by executing a simple query (SELECT 1)
    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

/// SELECT for `filter`. The owner predicate is unconditional.
fn select_sql(filter: &ItemFilter) -> &'static str {
    if filter.id().is_some() {
        "SELECT id, owner, data, created_at, updated_at FROM items WHERE owner = @owner AND id = @id"
    } else {
        "SELECT id, owner, data, created_at, updated_at FROM items WHERE owner = @owner"
    }
}

fn item_from_row(row: &Row) -> Result<Item> {
    let id: String = row.column_by_name("id")?;
    let owner: String = row.column_by_name("owner")?;
    let data_str: String = row.column_by_name("data")?;

    // Timestamps come back as RFC3339 strings
    let created_at_str: String = row.column_by_name("created_at")?;
    let updated_at_str: String = row.column_by_name("updated_at")?;

    let fields: JsonMap<String, JsonValue> = serde_json::from_str(&data_str)
        .context("Failed to deserialize item payload")?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .context("Failed to parse created_at timestamp")?
        .with_timezone(&Utc);
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .context("Failed to parse updated_at timestamp")?
        .with_timezone(&Utc);

    Ok(Item {
        id,
        owner,
        fields,
        created_at,
        updated_at,
    })
}

/// Automatically provision Spanner instance, database, and table
///
/// Checks if the configured resources exist and creates them if needed, so
/// local development against the emulator needs no setup.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_table_exists(&admin_client, &database_path).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

/// Ensure the items table and its owner index exist
async fn ensure_table_exists(admin_client: &AdminClient, database_path: &str) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let table_exists = ddl_response
        .into_inner()
        .statements
        .iter()
        .any(|stmt| stmt.contains("CREATE TABLE items") || stmt.contains("CREATE TABLE `items`"));

    if table_exists {
        tracing::info!("Table 'items' already exists");
        return Ok(());
    }

    tracing::info!("Table 'items' not found, creating...");

    let create_table_ddl = r#"
CREATE TABLE items (
    id STRING(36) NOT NULL,
    owner STRING(MAX) NOT NULL,
    data JSON NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (id)
"#
    .trim()
    .to_string();

    let create_index_ddl = "CREATE INDEX items_by_owner ON items(owner)".to_string();

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![create_table_ddl, create_index_ddl],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table 'items' created successfully");
    Ok(())
}
