//! Domain types shared across the store, services, and API adapters.
//!
//! All enums serialize as lowercase snake_case strings, which is also the
//! form they take in the SQLite schema and in API payloads.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

/// Classified type of an indicator of compromise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IocType {
    Ip,
    Cidr,
    Domain,
    Wildcard,
    Md5,
    Sha1,
    Sha256,
}

impl IocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Cidr => "cidr",
            Self::Domain => "domain",
            Self::Wildcard => "wildcard",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// True for the hash family, which is never subject to exclusion rules.
    pub fn is_hash(&self) -> bool {
        matches!(self, Self::Md5 | Self::Sha1 | Self::Sha256)
    }
}

impl fmt::Display for IocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ip" => Ok(Self::Ip),
            "cidr" => Ok(Self::Cidr),
            "domain" => Ok(Self::Domain),
            "wildcard" => Ok(Self::Wildcard),
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!("unknown IOC type: {other}")),
        }
    }
}

/// Declared type constraint of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Ip,
    Domain,
    Hash,
    #[default]
    Mixed,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Domain => "domain",
            Self::Hash => "hash",
            Self::Mixed => "mixed",
        }
    }

    /// List compatibility check: which IOC types may join a list of this type.
    ///
    /// `ip` lists accept both bare IPs and CIDR ranges; `domain` lists accept
    /// domains and wildcards; `hash` lists accept the three hash types;
    /// `mixed` accepts everything.
    pub fn accepts(&self, ioc_type: IocType) -> bool {
        match self {
            Self::Mixed => true,
            Self::Ip => matches!(ioc_type, IocType::Ip | IocType::Cidr),
            Self::Domain => matches!(ioc_type, IocType::Domain | IocType::Wildcard),
            Self::Hash => ioc_type.is_hash(),
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ip" => Ok(Self::Ip),
            "domain" => Ok(Self::Domain),
            "hash" => Ok(Self::Hash),
            "mixed" => Ok(Self::Mixed),
            other => Err(format!("unknown list type: {other}")),
        }
    }
}

/// Pattern type of an exclusion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionType {
    Ip,
    Cidr,
    Domain,
    Wildcard,
}

impl ExclusionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Cidr => "cidr",
            Self::Domain => "domain",
            Self::Wildcard => "wildcard",
        }
    }
}

impl fmt::Display for ExclusionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExclusionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ip" => Ok(Self::Ip),
            "cidr" => Ok(Self::Cidr),
            "domain" => Ok(Self::Domain),
            "wildcard" => Ok(Self::Wildcard),
            other => Err(format!("unknown exclusion type: {other}")),
        }
    }
}

/// Action recorded in an IOC's append-only audit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    AddedToList,
    RemovedFromList,
    Comment,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AddedToList => "added_to_list",
            Self::RemovedFromList => "removed_from_list",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "added_to_list" => Ok(Self::AddedToList),
            "removed_from_list" => Ok(Self::RemovedFromList),
            "comment" => Ok(Self::Comment),
            other => Err(format!("unknown audit action: {other}")),
        }
    }
}

// rusqlite conversions: enums are stored as their lowercase string form.
macro_rules! sql_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

sql_enum!(IocType);
sql_enum!(ListType);
sql_enum!(ExclusionType);
sql_enum!(AuditAction);

/// A named blocklist served as an EDL at `/edl/{slug}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockList {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub list_type: ListType,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single stored indicator. `value` is canonical and globally unique;
/// the same indicator is stored once and linked to N lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ioc {
    pub id: i64,
    pub value: String,
    pub ioc_type: IocType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List-to-IOC association. Unique per `(list_id, ioc_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub list_id: i64,
    pub ioc_id: i64,
    pub added_by: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// An exclusion rule. Built-in rules are seeded at startup and protected
/// from deletion; custom rules are user-managed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub id: i64,
    pub value: String,
    pub excl_type: ExclusionType,
    pub reason: Option<String>,
    pub is_builtin: bool,
    pub created_at: DateTime<Utc>,
}

/// One entry in an IOC's append-only audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub ioc_id: i64,
    pub action: AuditAction,
    pub list_id: Option<i64>,
    pub content: Option<String>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Generate the URL-safe slug for a list name: lowercase alphanumerics only.
///
/// The slug is the list's immutable identifier in the EDL URL; it is only
/// regenerated on an explicit rename.
pub fn generate_slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_strips_non_alphanumerics() {
        assert_eq!(generate_slug("Known C2 Servers"), "knownc2servers");
        assert_eq!(generate_slug("Phishing-2024!"), "phishing2024");
        assert_eq!(generate_slug("ALLCAPS"), "allcaps");
    }

    #[test]
    fn mixed_list_accepts_everything() {
        for t in [
            IocType::Ip,
            IocType::Cidr,
            IocType::Domain,
            IocType::Wildcard,
            IocType::Md5,
            IocType::Sha1,
            IocType::Sha256,
        ] {
            assert!(ListType::Mixed.accepts(t));
        }
    }

    #[test]
    fn ip_list_accepts_cidr() {
        assert!(ListType::Ip.accepts(IocType::Ip));
        assert!(ListType::Ip.accepts(IocType::Cidr));
        assert!(!ListType::Ip.accepts(IocType::Domain));
        assert!(!ListType::Ip.accepts(IocType::Sha256));
    }

    #[test]
    fn domain_list_accepts_wildcards() {
        assert!(ListType::Domain.accepts(IocType::Domain));
        assert!(ListType::Domain.accepts(IocType::Wildcard));
        assert!(!ListType::Domain.accepts(IocType::Ip));
    }

    #[test]
    fn hash_list_accepts_all_hash_types() {
        assert!(ListType::Hash.accepts(IocType::Md5));
        assert!(ListType::Hash.accepts(IocType::Sha1));
        assert!(ListType::Hash.accepts(IocType::Sha256));
        assert!(!ListType::Hash.accepts(IocType::Wildcard));
    }

    #[test]
    fn enum_round_trip_through_strings() {
        for s in ["ip", "cidr", "domain", "wildcard", "md5", "sha1", "sha256"] {
            assert_eq!(s.parse::<IocType>().unwrap().as_str(), s);
        }
        for s in ["created", "added_to_list", "removed_from_list", "comment"] {
            assert_eq!(s.parse::<AuditAction>().unwrap().as_str(), s);
        }
    }
}
