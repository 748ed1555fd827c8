use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection tags the worker knows about.
pub mod collections {
    /// Projects. Each project is a tenant; the list lives in the console namespace.
    pub const PROJECTS: &str = "projects";
    pub const FUNCTIONS: &str = "functions";
    pub const USERS: &str = "users";
    /// Collection definitions. Documents of a collection carry its id as their tag.
    pub const COLLECTIONS: &str = "collections";
    pub const TEAMS: &str = "teams";
    pub const MEMBERSHIPS: &str = "memberships";
    pub const TOKENS: &str = "tokens";
    pub const SESSIONS: &str = "sessions";
    /// Function build artifacts; each points at a code bundle on disk.
    pub const TAGS: &str = "tags";
    pub const EXECUTIONS: &str = "executions";
    pub const REALTIME_CONNECTIONS: &str = "realtime_connections";
    pub const AUDIT: &str = "audit";
    pub const ABUSE: &str = "abuse";
}

/// Attribute names read by the cascades.
pub mod attributes {
    pub const USER_ID: &str = "userId";
    pub const TEAM_ID: &str = "teamId";
    pub const FUNCTION_ID: &str = "functionId";
    pub const CONFIRMED: &str = "confirmed";
    pub const MEMBER_COUNT: &str = "memberCount";
    pub const PATH: &str = "path";
    pub const CREATED_AT: &str = "createdAt";
    pub const TIMESTAMP: &str = "timestamp";
    pub const TOKENS: &str = "tokens";
    pub const SESSIONS: &str = "sessions";
}

/// Role granted to everyone, including unauthenticated callers.
pub const ANY_ROLE: &str = "any";

/// A store namespace. Every tenant gets its own; cross-tenant metadata
/// (the project list, realtime connections) lives in the console namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Console,
    Tenant(String),
}

impl Namespace {
    const PREFIX: &'static str = "app_";
    const CONSOLE: &'static str = "console";

    pub fn tenant(id: impl Into<String>) -> Self {
        Self::Tenant(id.into())
    }

    /// Storage key, e.g. `app_console` or `app_5f3a`.
    pub fn key(&self) -> String {
        match self {
            Self::Console => format!("{}{}", Self::PREFIX, Self::CONSOLE),
            Self::Tenant(id) => format!("{}{}", Self::PREFIX, id),
        }
    }

    /// Inverse of [`Namespace::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        let rest = key.strip_prefix(Self::PREFIX)?;
        match rest {
            "" => None,
            Self::CONSOLE => Some(Self::Console),
            id => Some(Self::Tenant(id.to_string())),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Per-record role lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
}

impl Permissions {
    pub fn allows_read(&self, roles: &[String]) -> bool {
        Self::grants(&self.read, roles)
    }

    pub fn allows_write(&self, roles: &[String]) -> bool {
        Self::grants(&self.write, roles)
    }

    fn grants(granted: &[String], roles: &[String]) -> bool {
        granted.iter().any(|g| g == ANY_ROLE || roles.contains(g))
    }
}

/// A tenant-scoped entity as stored: id, collection tag, permissions and a
/// flat attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$collection")]
    pub collection: String,
    #[serde(rename = "$permissions", default)]
    pub permissions: Permissions,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            permissions: Permissions::default(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn str_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    /// Integers, including whole floats such as `3.0`.
    pub fn int_attribute(&self, name: &str) -> Option<i64> {
        let value = self.attribute(name)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
    }

    /// Missing or non-boolean attributes read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.attribute(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Ids of the child records embedded under `name`.
    ///
    /// Accepts nested records (`{"$id": ...}`) and bare id strings; anything
    /// else in the array is ignored.
    pub fn child_ids(&self, name: &str) -> Vec<String> {
        let Some(Value::Array(items)) = self.attribute(name) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(id.clone()),
                Value::Object(map) => map.get("$id").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect()
    }
}
