/// Admin and Moderation System
///
/// Scope-based authorization for admins, the visibility rules applied to the
/// kudos feed, moderation actions, admin level management and the audit log.

pub mod audit;
pub mod directory;
pub mod evaluator;
pub mod level;
pub mod moderation;
pub mod org;
pub mod resolver;
pub mod roles;
pub mod visibility;

pub use audit::{AuditLog, AuditLogEntry};
pub use directory::{Directory, MemoryDirectory, SqlDirectory};
pub use evaluator::{evaluate, Authorizer, ModerationDecision, Target, DENIED_MESSAGE};
pub use level::{Actor, AdminLevel, AdminProfile, OwnerScope, Scope};
pub use moderation::{DeletionReport, ModerationManager, ModerationRecord};
pub use org::{Department, OrgManager};
pub use resolver::ScopeResolver;
pub use roles::AdminRoleManager;
pub use visibility::{build_visibility_predicate, RequestedView, VisibilityFilter};
