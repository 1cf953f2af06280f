use crate::error::{Error, Result};
use crate::model::{DocumentType, Property};
use crate::repo::{DocumentTypeRepository, PropertyRepository};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config as PgConfig, NoTls, Transaction};

/// Document repository kept in PostgreSQL under the `dtp_meta` schema.
pub struct PgStore {
    client: Mutex<Client>,
    driver: JoinHandle<()>,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let config: PgConfig = url.parse()?;
        Self::connect_with(&config).await
    }

    pub async fn connect_with(config: &PgConfig) -> Result<Self> {
        let (client, connection) = config.connect(NoTls).await?;
        // The connection driver lives exactly as long as the store
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection error");
            }
        });
        Ok(Self {
            client: Mutex::new(client),
            driver,
        })
    }

    pub async fn bootstrap(&self) -> Result<()> {
        self.client
            .lock()
            .await
            .batch_execute(
                r#"
                CREATE SCHEMA IF NOT EXISTS dtp_meta;
                CREATE TABLE IF NOT EXISTS dtp_meta.properties (
                    name TEXT PRIMARY KEY,
                    attrs JSONB NOT NULL DEFAULT '{}'::jsonb
                );
                CREATE TABLE IF NOT EXISTS dtp_meta.doc_types (
                    name TEXT PRIMARY KEY,
                    description TEXT NOT NULL DEFAULT '',
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    sig_verify_interval INTEGER NOT NULL DEFAULT 0,
                    workflow_template_id TEXT
                );
                CREATE TABLE IF NOT EXISTS dtp_meta.doc_type_props (
                    doc_type TEXT NOT NULL REFERENCES dtp_meta.doc_types(name) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    prop_name TEXT NOT NULL REFERENCES dtp_meta.properties(name),
                    PRIMARY KEY (doc_type, position)
                );
                "#,
            )
            .await?;
        Ok(())
    }

    pub async fn upsert_property(&self, prop: &Property) -> Result<()> {
        let attrs = serde_json::Value::Object(prop.attributes.clone());
        self.client
            .lock()
            .await
            .execute(
                "INSERT INTO dtp_meta.properties(name, attrs) VALUES($1, $2) \
                 ON CONFLICT (name) DO UPDATE SET attrs = EXCLUDED.attrs",
                &[&prop.name, &attrs],
            )
            .await?;
        Ok(())
    }

    pub async fn upsert_doc_type(&self, doc_type: &DocumentType) -> Result<()> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        tx.execute(
            "INSERT INTO dtp_meta.doc_types(name, description, is_active, sig_verify_interval, workflow_template_id) \
             VALUES($1, $2, $3, $4, $5) ON CONFLICT (name) DO UPDATE SET \
             description = EXCLUDED.description, is_active = EXCLUDED.is_active, \
             sig_verify_interval = EXCLUDED.sig_verify_interval, workflow_template_id = EXCLUDED.workflow_template_id",
            &[
                &doc_type.name,
                &doc_type.description,
                &doc_type.is_active,
                &doc_type.sig_verify_interval,
                &doc_type.workflow_template_id,
            ],
        )
        .await?;
        replace_props(&tx, doc_type).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn write_doc_type(&self, doc_type: &DocumentType) -> Result<()> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let n = tx
            .execute(
                "UPDATE dtp_meta.doc_types SET description = $2, is_active = $3, \
                 sig_verify_interval = $4, workflow_template_id = $5 WHERE name = $1",
                &[
                    &doc_type.name,
                    &doc_type.description,
                    &doc_type.is_active,
                    &doc_type.sig_verify_interval,
                    &doc_type.workflow_template_id,
                ],
            )
            .await?;
        if n == 0 {
            return Err(Error::Msg("no such document type".to_string()));
        }
        replace_props(&tx, doc_type).await?;
        tx.commit().await?;
        Ok(())
    }
}

impl Drop for PgStore {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl PropertyRepository for PgStore {
    async fn find_property(&self, name: &str) -> Result<Option<Property>> {
        let row = self
            .client
            .lock()
            .await
            .query_opt("SELECT name, attrs FROM dtp_meta.properties WHERE name = $1", &[&name])
            .await?;
        Ok(row.map(|r| Property {
            name: r.get(0),
            attributes: into_object(r.get(1)),
        }))
    }
}

impl DocumentTypeRepository for PgStore {
    async fn find_doc_type(&self, name: &str) -> Result<Option<DocumentType>> {
        let client = self.client.lock().await;
        let Some(row) = client
            .query_opt(
                "SELECT name, description, is_active, sig_verify_interval, workflow_template_id \
                 FROM dtp_meta.doc_types WHERE name = $1",
                &[&name],
            )
            .await?
        else {
            return Ok(None);
        };
        let props = client
            .query(
                "SELECT p.name, p.attrs FROM dtp_meta.doc_type_props dp \
                 JOIN dtp_meta.properties p ON p.name = dp.prop_name \
                 WHERE dp.doc_type = $1 ORDER BY dp.position ASC",
                &[&name],
            )
            .await?
            .into_iter()
            .map(|r| Property {
                name: r.get(0),
                attributes: into_object(r.get(1)),
            })
            .collect();
        Ok(Some(DocumentType {
            name: row.get(0),
            description: row.get(1),
            is_active: row.get(2),
            sig_verify_interval: row.get(3),
            workflow_template_id: row.get(4),
            props,
        }))
    }

    async fn update_doc_type(&self, doc_type: &DocumentType) -> Result<()> {
        self.write_doc_type(doc_type)
            .await
            .map_err(|e| Error::Persistence {
                name: doc_type.name.clone(),
                detail: e.to_string(),
            })
    }
}

async fn replace_props(tx: &Transaction<'_>, doc_type: &DocumentType) -> Result<()> {
    tx.execute("DELETE FROM dtp_meta.doc_type_props WHERE doc_type = $1", &[&doc_type.name])
        .await?;
    for (i, prop) in doc_type.props.iter().enumerate() {
        let position = i as i32;
        tx.execute(
            "INSERT INTO dtp_meta.doc_type_props(doc_type, position, prop_name) VALUES($1, $2, $3)",
            &[&doc_type.name, &position, &prop.name],
        )
        .await?;
    }
    Ok(())
}

fn into_object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}
