//! Protected-route authorization
//!
//! A static, ordered rule table evaluated on every admitted request. Rules
//! are checked in declaration order and the first pattern match wins; later
//! rules are never consulted even if they also match, so overlapping
//! patterns must be declared most-specific first. Paths matching no rule
//! fall through to the table's named default policy.

use std::fmt;

/// Dashboard role carried in the access token's `roles` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Property and user management.
    Manager,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Parse a claim string, case-insensitively. Unknown role names map to
    /// `None` and are dropped, so a token can never smuggle in a role the
    /// dashboard does not know about.
    pub fn from_claim(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Viewer => "viewer",
        };
        f.write_str(s)
    }
}

/// Path matcher for a route rule: an exact path, or a `/*` prefix wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    prefix: String,
    wildcard: bool,
}

impl PathPattern {
    /// Parse a pattern string. `"/admin/users"` matches only that path;
    /// `"/admin/*"` matches `/admin` and everything under it.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/*") {
            Some(prefix) => Self {
                prefix: prefix.to_string(),
                wildcard: true,
            },
            None => Self {
                prefix: pattern.to_string(),
                wildcard: false,
            },
        }
    }

    /// Whether the request path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        if !self.wildcard {
            return path == self.prefix;
        }
        path == self.prefix
            || path
                .strip_prefix(self.prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// One entry of the protected-route table.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub pattern: PathPattern,
    pub allowed_roles: Vec<Role>,
}

impl RouteRule {
    pub fn new(pattern: &str, allowed_roles: Vec<Role>) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            allowed_roles,
        }
    }
}

/// What happens to paths no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPolicy {
    /// Unmatched paths are unprotected by this gate.
    Open,
    /// Unmatched paths are denied.
    Deny,
}

/// Outcome of a route authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

/// Ordered protected-route table. Loaded once at startup, immutable after.
#[derive(Debug, Clone)]
pub struct ProtectedRoutes {
    rules: Vec<RouteRule>,
    default_policy: DefaultPolicy,
}

impl ProtectedRoutes {
    /// Build a table with the explicit default for unmatched paths.
    pub fn new(rules: Vec<RouteRule>, default_policy: DefaultPolicy) -> Self {
        Self {
            rules,
            default_policy,
        }
    }

    /// An empty table where every path is open.
    pub fn open() -> Self {
        Self::new(Vec::new(), DefaultPolicy::Open)
    }

    /// Authorize `path` for the given decoded roles.
    ///
    /// First matching rule wins: the decision comes from whether that rule's
    /// allowed roles intersect the user's roles, and no further rules are
    /// consulted.
    pub fn authorize(&self, path: &str, roles: &[Role]) -> Access {
        for rule in &self.rules {
            if rule.pattern.matches(path) {
                let granted = rule
                    .allowed_roles
                    .iter()
                    .any(|allowed| roles.contains(allowed));
                return if granted { Access::Granted } else { Access::Denied };
            }
        }
        match self.default_policy {
            DefaultPolicy::Open => Access::Granted,
            DefaultPolicy::Deny => Access::Denied,
        }
    }
}
