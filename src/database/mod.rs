use crate::utils::AppError;
use mongodb::{bson::doc, options::IndexOptions, Client, Collection, Database, IndexModel};

pub const USERS: &str = "users";
pub const FAMILIES: &str = "families";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    /// Connects, pings the server and makes sure the indexes exist.
    pub async fn new(uri: &str, default_db: &str) -> Result<Self, AppError> {
        let mongodb = Self::connect(uri, default_db).await?;

        mongodb.db.run_command(doc! { "ping": 1 }).await?;
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Builds the client without touching the network. The driver connects
    /// lazily on the first operation.
    pub async fn connect(uri: &str, default_db: &str) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        // Database named in the URI path wins over the service default
        let db_name = client_options
            .default_database
            .clone()
            .unwrap_or_else(|| default_db.to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        Ok(Self { db })
    }

    async fn ensure_indexes(&self) -> Result<(), AppError> {
        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<mongodb::bson::Document>(USERS);
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index ready: users(email) unique"),
            Err(e) => log::warn!("   ⚠️  Could not create users(email) index: {}", e),
        }

        let families = self.collection::<mongodb::bson::Document>(FAMILIES);
        let name_index = IndexModel::builder()
            .keys(doc! { "full_name": 1 })
            .build();

        match families.create_index(name_index).await {
            Ok(_) => log::info!("   ✅ Index ready: families(full_name)"),
            Err(e) => log::warn!("   ⚠️  Could not create families(full_name) index: {}", e),
        }

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn health_check(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}
