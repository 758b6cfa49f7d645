/// Admin level management
use crate::{
    admin::{
        audit::{AuditLog, AuditLogEntry},
        evaluator::{Authorizer, Target, DENIED_MESSAGE},
        level::{Actor, AdminLevel, Scope},
    },
    db::users::{UserRecord, UserRepository},
    error::{KudosError, KudosResult},
};

/// Admin role manager
#[derive(Clone)]
pub struct AdminRoleManager {
    users: UserRepository,
    authorizer: Authorizer,
    audit: AuditLog,
}

impl AdminRoleManager {
    pub fn new(users: UserRepository, authorizer: Authorizer, audit: AuditLog) -> Self {
        Self {
            users,
            authorizer,
            audit,
        }
    }

    /// Assign an admin level and scope to a user
    ///
    /// SITE admins may assign anything. DOMAIN admins may only assign USER or
    /// DEPARTMENT to users of their own domain, for departments of that domain.
    pub async fn assign_level(
        &self,
        granter_id: &str,
        user_id: &str,
        level: AdminLevel,
        scope: Option<&str>,
    ) -> KudosResult<UserRecord> {
        let granter = self.load_actor(granter_id).await?;
        if !matches!(granter.profile.scope(), Scope::Site | Scope::Domain(_)) {
            return Err(denied());
        }

        let scope = self.normalize_scope(level, scope).await?;

        if let Scope::Domain(granter_domain) = granter.profile.scope() {
            if !matches!(level, AdminLevel::User | AdminLevel::Department) {
                return Err(denied());
            }

            // Only users strictly below the granter may be changed
            let target = self.users.get(user_id).await?.ok_or_else(denied)?;
            if target.admin_level.can_act_as(granter.profile.level()) {
                return Err(denied());
            }

            let decision = self
                .authorizer
                .decide(&granter, Some(Target::User(user_id.to_string())))
                .await?;
            if !decision.allowed {
                return Err(denied());
            }

            if level == AdminLevel::Department {
                let department_id = scope.as_deref().unwrap_or_default();
                let department_domain = self
                    .authorizer
                    .resolver()
                    .department_domain(department_id)
                    .await?;
                if department_domain.as_deref() != Some(granter_domain.as_str()) {
                    return Err(denied());
                }
            }
        }

        self.users
            .set_admin_level(user_id, level, scope.as_deref())
            .await?;

        let details = match &scope {
            Some(scope) => format!("{} {}", level, scope),
            None => level.to_string(),
        };
        tracing::info!("admin.assign {} -> {} by {}", user_id, details, granter_id);
        self.audit
            .record(granter_id, "admin.assign", Some(user_id), Some(&details))
            .await;

        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| KudosError::NotFound(format!("User {} not found", user_id)))
    }

    /// List admins visible to the actor
    pub async fn list_admins(&self, actor_id: &str) -> KudosResult<Vec<UserRecord>> {
        let actor = self.load_actor(actor_id).await?;

        match actor.profile.scope() {
            Scope::Site => self.users.list_admins(None).await,
            Scope::Domain(domain) => self.users.list_admins(Some(domain)).await,
            Scope::Department(_) | Scope::None => Err(denied()),
        }
    }

    /// Read the audit log; SITE admins only
    pub async fn list_audit_log(&self, actor_id: &str, limit: i64) -> KudosResult<Vec<AuditLogEntry>> {
        let actor = self.load_actor(actor_id).await?;
        if actor.profile.level() != AdminLevel::Site {
            return Err(denied());
        }

        self.audit.list(limit).await
    }

    /// Promote configured users to SITE at startup
    ///
    /// Ids without a user row are skipped. Returns how many users were promoted.
    pub async fn bootstrap_site_admins(&self, user_ids: &[String]) -> KudosResult<usize> {
        let mut promoted = 0;

        for user_id in user_ids {
            match self.users.get(user_id).await? {
                Some(user) if user.admin_level == AdminLevel::Site => {}
                Some(_) => {
                    self.users
                        .set_admin_level(user_id, AdminLevel::Site, None)
                        .await?;
                    self.audit
                        .record("system", "admin.bootstrap", Some(user_id), Some("SITE"))
                        .await;
                    tracing::info!("Promoted {} to SITE admin", user_id);
                    promoted += 1;
                }
                None => {
                    tracing::warn!("Configured site admin {} does not exist, skipping", user_id);
                }
            }
        }

        Ok(promoted)
    }

    async fn load_actor(&self, actor_id: &str) -> KudosResult<Actor> {
        self.authorizer
            .resolver()
            .actor(actor_id)
            .await?
            .ok_or_else(denied)
    }

    /// Validate and canonicalize the scope stored with a level
    async fn normalize_scope(&self, level: AdminLevel, scope: Option<&str>) -> KudosResult<Option<String>> {
        let scope = scope.map(str::trim).filter(|s| !s.is_empty());

        match level {
            AdminLevel::User | AdminLevel::Site => Ok(None),
            AdminLevel::Domain => scope
                .map(|domain| Some(domain.to_ascii_lowercase()))
                .ok_or_else(|| KudosError::Validation("DOMAIN level requires a domain scope".to_string())),
            AdminLevel::Department => {
                let department_id = scope.ok_or_else(|| {
                    KudosError::Validation("DEPARTMENT level requires a department scope".to_string())
                })?;

                if self
                    .authorizer
                    .resolver()
                    .department_domain(department_id)
                    .await?
                    .is_none()
                {
                    return Err(KudosError::Validation(format!(
                        "Unknown department: {}",
                        department_id
                    )));
                }

                Ok(Some(department_id.to_string()))
            }
        }
    }
}

fn denied() -> KudosError {
    KudosError::Authorization(DENIED_MESSAGE.to_string())
}
