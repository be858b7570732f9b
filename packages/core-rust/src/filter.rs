//! List filters: conditions on indexable attributes and pagination.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::validate::ValidationError;

/// Page size used when the caller supplies none (or zero).
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Default upper bound for a requested page size.
pub const DEFAULT_MAX_PAGE_LIMIT: u32 = 500;

/// Attributes a list query may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKey {
    Id,
    Country,
    Nickname,
    FirstName,
    LastName,
}

impl FilterKey {
    /// Store column name for this key.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            FilterKey::Id => "id",
            FilterKey::Country => "country",
            FilterKey::Nickname => "nickname",
            FilterKey::FirstName => "first_name",
            FilterKey::LastName => "last_name",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for FilterKey {
    type Err = ValidationError;

    /// Accepts both the column name and the camelCase wire name.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "id" => Ok(FilterKey::Id),
            "country" => Ok(FilterKey::Country),
            "nickname" => Ok(FilterKey::Nickname),
            "first_name" | "firstName" => Ok(FilterKey::FirstName),
            "last_name" | "lastName" => Ok(FilterKey::LastName),
            other => Err(ValidationError::UnknownFilter(other.to_string())),
        }
    }
}

/// Conjunctive equality filter for list queries. Empty means "no filter".
///
/// Keys are typed, so an unknown attribute can never reach the query layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    entries: BTreeMap<FilterKey, String>,
}

impl Conditions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expected value for `key`, replacing any previous one.
    pub fn insert(&mut self, key: FilterKey, value: impl Into<String>) {
        self.entries.insert(key, value.into());
    }

    /// Sets `key` only when `value` is non-empty. Unset fields are omitted,
    /// never sent as empty-string matches.
    pub fn insert_non_empty(&mut self, key: FilterKey, value: &str) {
        if !value.is_empty() {
            self.insert(key, value);
        }
    }

    #[must_use]
    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates in a stable key order.
    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Resolved page window. `offset` is one-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    /// Applies defaults and the ceiling to caller-supplied values.
    ///
    /// A zero limit becomes [`DEFAULT_PAGE_LIMIT`], capped at `max_limit`; an
    /// offset below one is coerced to one.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::LimitTooLarge`] when `limit` exceeds
    /// `max_limit`.
    pub fn resolve(limit: u32, offset: u32, max_limit: u32) -> Result<Self, ValidationError> {
        if limit > max_limit {
            return Err(ValidationError::LimitTooLarge { limit, max: max_limit });
        }
        Ok(Self {
            limit: if limit == 0 {
                DEFAULT_PAGE_LIMIT.min(max_limit)
            } else {
                limit
            },
            offset: offset.max(1),
        })
    }

    /// Number of rows to skip at the store boundary.
    #[must_use]
    pub fn skip(&self) -> u32 {
        self.offset.saturating_sub(1)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 1,
        }
    }
}
