use doctype_prune::model::{DocumentType, Property};
use doctype_prune::store::PgStore;
use rand::{Rng, distributions::Alphanumeric};
use tokio_postgres::{Config, NoTls};

/// Scratch database holding a bootstrapped `dtp_meta` schema, created on the
/// server named by `DOCTYPE_PRUNE_TEST_POSTGRES_URL` and dropped with the value.
pub struct TestDb {
    admin: Config,
    pub dbname: String,
}

impl TestDb {
    pub async fn provision_from_env() -> Option<Self> {
        let admin: Config = std::env::var("DOCTYPE_PRUNE_TEST_POSTGRES_URL").ok()?.parse().ok()?;
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        let dbname = format!("doctype_prune_{}", suffix.to_lowercase());

        let (client, conn) = admin.connect(NoTls).await.ok()?;
        tokio::spawn(async move {
            let _ = conn.await;
        });
        client
            .batch_execute(&format!("CREATE DATABASE \"{dbname}\" TEMPLATE template0"))
            .await
            .ok()?;
        Some(Self { admin, dbname })
    }

    /// Connection settings for the scratch database itself.
    pub fn config(&self) -> Config {
        let mut cfg = self.admin.clone();
        cfg.dbname(&self.dbname);
        cfg
    }

    /// Store on the scratch database with the schema bootstrapped and a
    /// small catalog loaded:
    /// properties `Vendor`, `Amount`, `OIT_OldDocID` (with a `type` attribute),
    /// and document type `Invoice` = [Vendor, OIT_OldDocID, Amount].
    pub async fn store(&self) -> PgStore {
        let store = PgStore::connect_with(&self.config()).await.expect("connect");
        store.bootstrap().await.expect("bootstrap");

        let mut old = Property::named("OIT_OldDocID");
        old.attributes.insert("type".into(), serde_json::json!("string"));
        for prop in [Property::named("Vendor"), Property::named("Amount"), old] {
            store.upsert_property(&prop).await.expect("upsert property");
        }
        let mut invoice = DocumentType::new(
            "Invoice",
            vec![Property::named("Vendor"), Property::named("OIT_OldDocID"), Property::named("Amount")],
        );
        invoice.description = "AP invoices".into();
        invoice.sig_verify_interval = 7;
        invoice.workflow_template_id = Some("301YX".into());
        store.upsert_doc_type(&invoice).await.expect("upsert doc type");
        store
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        // The test's runtime may already be shutting down, so drop the
        // database from a runtime of our own.
        let admin = self.admin.clone();
        let dbname = self.dbname.clone();
        let _ = std::thread::spawn(move || {
            let Ok(rt) = tokio::runtime::Builder::new_current_thread().enable_all().build() else {
                return;
            };
            rt.block_on(async move {
                let Ok((client, conn)) = admin.connect(NoTls).await else {
                    return;
                };
                tokio::spawn(async move {
                    let _ = conn.await;
                });
                let _ = client
                    .batch_execute(&format!("DROP DATABASE IF EXISTS \"{dbname}\" WITH (FORCE)"))
                    .await;
            });
        })
        .join();
    }
}
