/// Authorization evaluator
///
/// Decides whether an admin may moderate content or manage users, based on
/// the admin's level and scope and the organizational scope of the target.
use crate::{
    admin::{
        level::{Actor, AdminLevel, AdminProfile, OwnerScope, Scope},
        resolver::ScopeResolver,
    },
    error::{KudosError, KudosResult},
};
use serde::{Deserialize, Serialize};

/// Message used for every denial, so callers cannot probe scopes
pub const DENIED_MESSAGE: &str = "Not permitted to moderate this resource";

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationDecision {
    pub allowed: bool,
    pub level: AdminLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl ModerationDecision {
    fn denied_user() -> Self {
        Self {
            allowed: false,
            level: AdminLevel::User,
            scope: None,
        }
    }
}

/// What an action is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A user, e.g. when assigning admin levels
    User(String),
    /// A kudos post, resolved through its author
    Content(String),
    /// A scope that is already known
    Owner(OwnerScope),
}

/// Evaluate a profile against an optional target scope.
///
/// Without a target this answers whether the profile has any usable admin
/// capability at all.
pub fn evaluate(profile: &AdminProfile, target: Option<&OwnerScope>) -> ModerationDecision {
    let level = profile.level();

    match level {
        AdminLevel::User => return ModerationDecision::denied_user(),
        AdminLevel::Site => {
            return ModerationDecision {
                allowed: true,
                level,
                scope: Scope::Site.label(),
            }
        }
        AdminLevel::Domain | AdminLevel::Department => {}
    }

    let allowed = match (profile.scope(), target) {
        (Scope::None, _) => false,
        (_, None) => true,
        (Scope::Domain(name), Some(owner)) => owner.domain.as_deref() == Some(name.as_str()),
        (Scope::Department(id), Some(owner)) => owner.department_id.as_deref() == Some(id.as_str()),
        _ => false,
    };

    ModerationDecision {
        allowed,
        level,
        scope: profile.scope().label(),
    }
}

/// Directory-backed evaluator
#[derive(Clone)]
pub struct Authorizer {
    resolver: ScopeResolver,
}

impl Authorizer {
    pub fn new(resolver: ScopeResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    /// Check whether `actor_id` may act on `target`.
    ///
    /// A missing actor is a denial at USER level. Only directory faults are
    /// returned as errors.
    pub async fn can_moderate(
        &self,
        actor_id: &str,
        target: Option<Target>,
    ) -> KudosResult<ModerationDecision> {
        let actor = match self.resolver.actor(actor_id).await? {
            Some(actor) => actor,
            None => {
                tracing::debug!("Authorization denied: actor {} not found", actor_id);
                return Ok(ModerationDecision::denied_user());
            }
        };

        self.decide(&actor, target).await
    }

    /// Same as [`Authorizer::can_moderate`] for an actor that is already loaded
    pub async fn decide(
        &self,
        actor: &Actor,
        target: Option<Target>,
    ) -> KudosResult<ModerationDecision> {
        let decision = match (actor.profile.level(), target) {
            // Decided by level alone, no target lookup needed
            (AdminLevel::User | AdminLevel::Site, _) | (_, None) => evaluate(&actor.profile, None),
            (_, Some(target)) => {
                let owner = self.resolve_target(target).await?;
                evaluate(&actor.profile, Some(&owner))
            }
        };

        if !decision.allowed {
            tracing::debug!(
                "Authorization denied for {} at level {}",
                actor.id,
                decision.level
            );
        }

        Ok(decision)
    }

    /// Gate for write paths: a denial becomes [`KudosError::Authorization`]
    pub async fn require(&self, actor_id: &str, target: Target) -> KudosResult<ModerationDecision> {
        let decision = self.can_moderate(actor_id, Some(target)).await?;
        if decision.allowed {
            Ok(decision)
        } else {
            Err(KudosError::Authorization(DENIED_MESSAGE.to_string()))
        }
    }

    async fn resolve_target(&self, target: Target) -> KudosResult<OwnerScope> {
        match target {
            Target::User(user_id) => self.resolver.owner_scope(&user_id).await,
            Target::Content(kudos_id) => self.resolver.content_owner_scope(&kudos_id).await,
            Target::Owner(scope) => Ok(scope),
        }
    }
}
