/// Application context and dependency injection
use crate::{
    admin::{AdminRoleManager, AuditLog, Authorizer, ModerationManager, OrgManager, ScopeResolver, SqlDirectory},
    config::ServerConfig,
    db::{self, users::UserRepository},
    error::{KudosError, KudosResult},
    kudos::KudosStore,
    media::{DiskMediaBackend, MediaBackend},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub users: Arc<UserRepository>,
    pub media: Arc<dyn MediaBackend>,
    // Authorization
    pub authorizer: Arc<Authorizer>,
    // Kudos feed
    pub kudos_store: Arc<KudosStore>,
    // Admin & Moderation
    pub moderation_manager: Arc<ModerationManager>,
    pub admin_role_manager: Arc<AdminRoleManager>,
    pub org_manager: Arc<OrgManager>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> KudosResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let media: Arc<dyn MediaBackend> =
            Arc::new(DiskMediaBackend::new(config.storage.media_directory.clone()));

        let ctx = Self::from_parts(config, db, media);

        let promoted = ctx
            .admin_role_manager
            .bootstrap_site_admins(&ctx.config.authentication.site_admin_ids)
            .await?;
        if promoted > 0 {
            tracing::info!("Bootstrapped {} site admin(s)", promoted);
        }

        Ok(ctx)
    }

    /// Wire services over an existing pool and media backend
    pub fn from_parts(config: ServerConfig, db: SqlitePool, media: Arc<dyn MediaBackend>) -> Self {
        let resolver = ScopeResolver::new(Arc::new(SqlDirectory::new(db.clone())));
        let authorizer = Authorizer::new(resolver.clone());
        let audit = AuditLog::new(db.clone());
        let users = UserRepository::new(db.clone());

        let moderation_manager = ModerationManager::new(
            db.clone(),
            authorizer.clone(),
            media.clone(),
            audit.clone(),
        );
        let admin_role_manager = AdminRoleManager::new(users.clone(), authorizer.clone(), audit.clone());
        let org_manager = OrgManager::new(db.clone(), resolver, audit);

        Self {
            config: Arc::new(config),
            kudos_store: Arc::new(KudosStore::new(db.clone())),
            users: Arc::new(users),
            media,
            authorizer: Arc::new(authorizer),
            moderation_manager: Arc::new(moderation_manager),
            admin_role_manager: Arc::new(admin_role_manager),
            org_manager: Arc::new(org_manager),
            db,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> KudosResult<()> {
        let dirs = [
            &config.storage.data_directory,
            &config.storage.media_directory,
        ];

        for dir in dirs {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    KudosError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
