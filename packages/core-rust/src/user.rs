//! User account entity and its write-side shapes.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format accepted when parsing externally visible timestamps.
///
/// ISO-8601 without a zone suffix, with an optional fraction of 1 to 9 digits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Renders a timestamp as ISO-8601 without a zone suffix.
///
/// The fraction keeps only its significant digits (`.12`, not `.120`) and is
/// omitted for whole seconds.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    let mut out = ts.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = ts.timestamp_subsec_nanos() % 1_000_000_000;
    if nanos != 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}

/// Parses a timestamp previously rendered with [`format_timestamp`].
///
/// Returns `None` for empty or malformed input.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Writable string attributes of a user account.
///
/// Each variant maps one-to-one onto a store column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    FirstName,
    LastName,
    Nickname,
    Password,
    Email,
    Country,
}

impl Attribute {
    /// All attributes in column order.
    pub const ALL: [Attribute; 6] = [
        Attribute::FirstName,
        Attribute::LastName,
        Attribute::Nickname,
        Attribute::Password,
        Attribute::Email,
        Attribute::Country,
    ];

    /// Store column name.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Attribute::FirstName => "first_name",
            Attribute::LastName => "last_name",
            Attribute::Nickname => "nickname",
            Attribute::Password => "password",
            Attribute::Email => "email",
            Attribute::Country => "country",
        }
    }
}

/// The attribute values shared by every write shape.
///
/// An empty string means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserFields {
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub password: String,
    pub email: String,
    pub country: String,
}

impl UserFields {
    /// Value of a single attribute.
    #[must_use]
    pub fn get(&self, attr: Attribute) -> &str {
        match attr {
            Attribute::FirstName => &self.first_name,
            Attribute::LastName => &self.last_name,
            Attribute::Nickname => &self.nickname,
            Attribute::Password => &self.password,
            Attribute::Email => &self.email,
            Attribute::Country => &self.country,
        }
    }

    /// Mutable access to a single attribute.
    pub fn get_mut(&mut self, attr: Attribute) -> &mut String {
        match attr {
            Attribute::FirstName => &mut self.first_name,
            Attribute::LastName => &mut self.last_name,
            Attribute::Nickname => &mut self.nickname,
            Attribute::Password => &mut self.password,
            Attribute::Email => &mut self.email,
            Attribute::Country => &mut self.country,
        }
    }

    /// Attributes that carry a value, in column order.
    #[must_use]
    pub fn non_empty(&self) -> Vec<(Attribute, &str)> {
        Attribute::ALL
            .iter()
            .map(|attr| (*attr, self.get(*attr)))
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }
}

/// A persisted user account.
///
/// Never partially constructed: the repository assigns `id` and both
/// timestamps before a `User` exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub fields: UserFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Applies the non-empty attributes of `changes` and bumps `updated_at`.
    pub fn apply(&mut self, changes: &UserFields, now: DateTime<Utc>) {
        for (attr, value) in changes.non_empty() {
            *self.fields.get_mut(attr) = value.to_string();
        }
        self.updated_at = now;
    }
}

/// Payload for creating a user. The identifier is assigned by the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub fields: UserFields,
}

/// Partial update addressed by identifier. Empty fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub id: String,
    pub fields: UserFields,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    #[test]
    fn timestamp_has_fractional_seconds_when_present() {
        let formatted = format_timestamp(&ts(1_700_000_000, 123_456_000));
        assert_eq!(formatted, "2023-11-14T22:13:20.123456");
    }

    #[test]
    fn timestamp_fraction_drops_trailing_zeros() {
        assert_eq!(
            format_timestamp(&ts(1_700_000_000, 120_000_000)),
            "2023-11-14T22:13:20.12"
        );
        assert_eq!(
            format_timestamp(&ts(1_700_000_000, 1)),
            "2023-11-14T22:13:20.000000001"
        );
    }

    #[test]
    fn timestamp_without_fraction_has_no_dot() {
        let formatted = format_timestamp(&ts(1_700_000_000, 0));
        assert_eq!(formatted, "2023-11-14T22:13:20");
    }

    #[test]
    fn timestamp_parses_back() {
        for nanos in [0, 500_000_000, 120_000_000, 123_456_789] {
            let original = ts(1_700_000_000, nanos);
            let parsed = parse_timestamp(&format_timestamp(&original)).unwrap();
            assert_eq!(parsed, original);
        }
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn non_empty_skips_blank_attributes() {
        let fields = UserFields {
            nickname: "alice".to_string(),
            country: "NL".to_string(),
            ..UserFields::default()
        };
        assert_eq!(
            fields.non_empty(),
            vec![(Attribute::Nickname, "alice"), (Attribute::Country, "NL")]
        );
    }

    #[test]
    fn apply_only_overwrites_supplied_fields() {
        let mut user = User {
            id: "u1".to_string(),
            fields: UserFields {
                first_name: "Alice".to_string(),
                nickname: "alice".to_string(),
                ..UserFields::default()
            },
            created_at: ts(10, 0),
            updated_at: ts(10, 0),
        };
        let changes = UserFields {
            nickname: "alice2".to_string(),
            ..UserFields::default()
        };

        user.apply(&changes, ts(20, 0));

        assert_eq!(user.fields.first_name, "Alice");
        assert_eq!(user.fields.nickname, "alice2");
        assert_eq!(user.created_at, ts(10, 0));
        assert_eq!(user.updated_at, ts(20, 0));
    }
}
