/// Visibility filter for content listings
///
/// Hidden rows are only visible inside the viewer's own admin scope. A view
/// requested by the caller (site / domain / department) is always ANDed
/// with that authority and can never widen it.
use crate::admin::level::{Actor, AdminLevel, Scope};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

/// View toggle requested by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedView {
    /// No extra narrowing
    #[default]
    Site,
    /// Only rows owned by the viewer's own domain
    Domain,
    /// Only rows owned by the viewer's own department
    Department,
}

impl RequestedView {
    /// Parse a query parameter; unknown values mean no narrowing
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("domain") => RequestedView::Domain,
            Some("department") => RequestedView::Department,
            _ => RequestedView::Site,
        }
    }
}

/// Rows the viewer's admin level lets them see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authority {
    All,
    PublicOnly,
    PublicOrHiddenInDomain(String),
    PublicOrHiddenInDepartment(String),
}

/// Restriction to the viewer's own membership. `None` membership matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Narrowing {
    Domain(Option<String>),
    Department(Option<String>),
}

/// Organizational scope and moderation state of one content row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowScope<'a> {
    pub hidden: bool,
    pub owner_domain: Option<&'a str>,
    pub owner_department_id: Option<&'a str>,
}

/// Column expressions a filter is rendered against
#[derive(Debug, Clone, Copy)]
pub struct SqlColumns {
    pub hidden: &'static str,
    pub owner_domain: &'static str,
    pub owner_department_id: &'static str,
}

/// Combined visibility predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityFilter {
    pub authority: Authority,
    pub narrowing: Option<Narrowing>,
}

/// Build the visibility predicate for `actor` viewing `requested`
pub fn build_visibility_predicate(actor: &Actor, requested: RequestedView) -> VisibilityFilter {
    let authority = match (actor.profile.level(), actor.profile.scope()) {
        (AdminLevel::Site, _) => Authority::All,
        (AdminLevel::Domain, Scope::Domain(name)) => Authority::PublicOrHiddenInDomain(name.clone()),
        (AdminLevel::Department, Scope::Department(id)) => {
            Authority::PublicOrHiddenInDepartment(id.clone())
        }
        // USER, or an admin whose scope is unset
        _ => Authority::PublicOnly,
    };

    let narrowing = match requested {
        RequestedView::Site => None,
        RequestedView::Domain => Some(Narrowing::Domain(actor.domain.clone())),
        RequestedView::Department => Some(Narrowing::Department(actor.department_id.clone())),
    };

    VisibilityFilter {
        authority,
        narrowing,
    }
}

impl VisibilityFilter {
    /// Evaluate the filter against one row
    pub fn matches(&self, row: &RowScope<'_>) -> bool {
        let permitted = match &self.authority {
            Authority::All => true,
            Authority::PublicOnly => !row.hidden,
            Authority::PublicOrHiddenInDomain(name) => {
                !row.hidden || row.owner_domain == Some(name.as_str())
            }
            Authority::PublicOrHiddenInDepartment(id) => {
                !row.hidden || row.owner_department_id == Some(id.as_str())
            }
        };

        permitted
            && match &self.narrowing {
                None => true,
                Some(Narrowing::Domain(domain)) => {
                    domain.is_some() && row.owner_domain == domain.as_deref()
                }
                Some(Narrowing::Department(id)) => {
                    id.is_some() && row.owner_department_id == id.as_deref()
                }
            }
    }

    /// Append the filter as a parenthesized SQL condition with bound values
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Sqlite>, columns: &SqlColumns) {
        qb.push("(");

        match &self.authority {
            Authority::All => {
                qb.push("1 = 1");
            }
            Authority::PublicOnly => {
                qb.push(columns.hidden).push(" = 0");
            }
            Authority::PublicOrHiddenInDomain(name) => {
                qb.push("(")
                    .push(columns.hidden)
                    .push(" = 0 OR ")
                    .push(columns.owner_domain)
                    .push(" = ")
                    .push_bind(name.clone())
                    .push(")");
            }
            Authority::PublicOrHiddenInDepartment(id) => {
                qb.push("(")
                    .push(columns.hidden)
                    .push(" = 0 OR ")
                    .push(columns.owner_department_id)
                    .push(" = ")
                    .push_bind(id.clone())
                    .push(")");
            }
        }

        match &self.narrowing {
            None => {}
            Some(Narrowing::Domain(Some(domain))) => {
                qb.push(" AND ")
                    .push(columns.owner_domain)
                    .push(" = ")
                    .push_bind(domain.clone());
            }
            Some(Narrowing::Department(Some(id))) => {
                qb.push(" AND ")
                    .push(columns.owner_department_id)
                    .push(" = ")
                    .push_bind(id.clone());
            }
            Some(Narrowing::Domain(None)) | Some(Narrowing::Department(None)) => {
                qb.push(" AND 1 = 0");
            }
        }

        qb.push(")");
    }
}
