/// Admin levels, scopes and the actor profile they form
use serde::{Deserialize, Serialize};

/// Admin authority levels, ordered by increasing authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminLevel {
    /// No moderation capability
    User,
    /// Restricted to one department
    Department,
    /// Restricted to one organizational domain
    Domain,
    /// Unconstrained
    Site,
}

impl AdminLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminLevel::User => "USER",
            AdminLevel::Department => "DEPARTMENT",
            AdminLevel::Domain => "DOMAIN",
            AdminLevel::Site => "SITE",
        }
    }

    /// Parse a persisted level. Unknown or malformed values parse to `User`.
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse_strict(s).unwrap_or(AdminLevel::User)
    }

    /// Parse a level from request input, rejecting unknown values
    pub fn parse_strict(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(AdminLevel::User),
            "DEPARTMENT" => Some(AdminLevel::Department),
            "DOMAIN" => Some(AdminLevel::Domain),
            "SITE" => Some(AdminLevel::Site),
            _ => None,
        }
    }

    /// Check if this level can perform actions requiring another level
    pub fn can_act_as(&self, required: AdminLevel) -> bool {
        self >= &required
    }
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an admin's authority is restricted to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Site,
    Domain(String),
    Department(String),
    None,
}

impl Scope {
    /// Wire form of the scope: "site", the domain name or the department id
    pub fn label(&self) -> Option<String> {
        match self {
            Scope::Site => Some("site".to_string()),
            Scope::Domain(name) => Some(name.clone()),
            Scope::Department(id) => Some(id.clone()),
            Scope::None => None,
        }
    }
}

/// An admin level paired with the scope that level is allowed to carry
///
/// The only constructor is [`AdminProfile::new`], so a DOMAIN level never
/// holds a department scope and vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminProfile {
    level: AdminLevel,
    scope: Scope,
}

impl AdminProfile {
    pub fn new(level: AdminLevel, raw_scope: Option<&str>) -> Self {
        let raw_scope = raw_scope.map(str::trim).filter(|s| !s.is_empty());

        let scope = match (level, raw_scope) {
            (AdminLevel::Site, _) => Scope::Site,
            (AdminLevel::Domain, Some(name)) => Scope::Domain(name.to_string()),
            (AdminLevel::Department, Some(id)) => Scope::Department(id.to_string()),
            _ => Scope::None,
        };

        Self { level, scope }
    }

    /// Build from persisted columns, failing closed on unknown levels
    pub fn from_columns(level: &str, scope: Option<&str>) -> Self {
        Self::new(AdminLevel::parse_lenient(level), scope)
    }

    /// Profile of a principal with no admin capability
    pub fn user() -> Self {
        Self::new(AdminLevel::User, None)
    }

    pub fn level(&self) -> AdminLevel {
        self.level
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// The acting principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub profile: AdminProfile,
    /// Domain the actor belongs to
    pub domain: Option<String>,
    /// Department the actor belongs to
    pub department_id: Option<String>,
}

/// Organizational scope of a user, or of content through its owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerScope {
    pub domain: Option<String>,
    pub department_id: Option<String>,
}

impl OwnerScope {
    pub fn new(domain: Option<String>, department_id: Option<String>) -> Self {
        Self {
            domain,
            department_id,
        }
    }

    /// Scope of a missing owner; every comparison against it fails
    pub fn unknown() -> Self {
        Self::default()
    }
}
