//! Request and response types of the four user operations.
//!
//! These are the shapes transports decode into and encode from. Field names
//! serialize in camelCase.

use serde::{Deserialize, Serialize};

use crate::envelope::UserEnvelope;
use crate::filter::{Conditions, FilterKey};
use crate::observe::{Field, Observed};
use crate::user::{format_timestamp, NewUser, User, UserFields, UserUpdate};
use crate::validate::{Validate, ValidationError};

// ---------------------------------------------------------------------------
// CreateUser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserRequest {
    #[serde(flatten)]
    pub fields: UserFields,
    pub password_confirm: String,
}

impl CreateUserRequest {
    #[must_use]
    pub fn to_new_user(&self) -> NewUser {
        NewUser {
            fields: self.fields.clone(),
        }
    }
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.fields.password != self.password_confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}

impl Observed for CreateUserRequest {
    fn log_fields(&self) -> Vec<Field> {
        vec![
            ("nickname", self.fields.nickname.clone()),
            ("email", self.fields.email.clone()),
            ("country", self.fields.country.clone()),
        ]
    }

    fn trace_fields(&self) -> Vec<Field> {
        vec![("nickname", self.fields.nickname.clone())]
    }

    fn report_extras(&self) -> Vec<Field> {
        vec![
            ("nickname", self.fields.nickname.clone()),
            ("email", self.fields.email.clone()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub id: String,
}

impl Observed for CreateUserResponse {
    fn log_fields(&self) -> Vec<Field> {
        vec![("id", self.id.clone())]
    }

    fn trace_fields(&self) -> Vec<Field> {
        vec![("id", self.id.clone())]
    }
}

// ---------------------------------------------------------------------------
// GetUsers
// ---------------------------------------------------------------------------

/// List query. Zero `limit`/`offset` mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetUsersRequest {
    pub limit: u32,
    pub offset: u32,
    pub id: String,
    pub country: String,
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
}

impl GetUsersRequest {
    /// Builds conditions from the filter fields the caller actually set.
    #[must_use]
    pub fn conditions(&self) -> Conditions {
        let mut conditions = Conditions::new();
        conditions.insert_non_empty(FilterKey::Id, &self.id);
        conditions.insert_non_empty(FilterKey::Country, &self.country);
        conditions.insert_non_empty(FilterKey::Nickname, &self.nickname);
        conditions.insert_non_empty(FilterKey::FirstName, &self.first_name);
        conditions.insert_non_empty(FilterKey::LastName, &self.last_name);
        conditions
    }

    /// Sets a filter field from a raw transport key.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownFilter`] for keys that are not
    /// indexable attributes.
    pub fn set_filter(&mut self, key: &str, value: String) -> Result<(), ValidationError> {
        match key.parse::<FilterKey>()? {
            FilterKey::Id => self.id = value,
            FilterKey::Country => self.country = value,
            FilterKey::Nickname => self.nickname = value,
            FilterKey::FirstName => self.first_name = value,
            FilterKey::LastName => self.last_name = value,
        }
        Ok(())
    }
}

impl Observed for GetUsersRequest {
    fn log_fields(&self) -> Vec<Field> {
        let mut fields = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        for (key, value) in self.conditions().iter() {
            fields.push((key.column(), value.to_string()));
        }
        fields
    }

    fn trace_fields(&self) -> Vec<Field> {
        self.log_fields()
    }

    fn report_extras(&self) -> Vec<Field> {
        self.log_fields()
    }
}

/// External representation of a user. The password is never exposed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub country: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.fields.first_name.clone(),
            last_name: user.fields.last_name.clone(),
            nickname: user.fields.nickname.clone(),
            email: user.fields.email.clone(),
            country: user.fields.country.clone(),
            created_at: format_timestamp(&user.created_at),
            updated_at: format_timestamp(&user.updated_at),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GetUsersResponse(pub Vec<UserView>);

impl Observed for GetUsersResponse {
    fn log_fields(&self) -> Vec<Field> {
        vec![("count", self.0.len().to_string())]
    }

    fn trace_fields(&self) -> Vec<Field> {
        self.log_fields()
    }
}

// ---------------------------------------------------------------------------
// UpdateUser
// ---------------------------------------------------------------------------

/// Partial update. Empty attributes are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    pub id: String,
    #[serde(flatten)]
    pub fields: UserFields,
    pub created_at: String,
    pub updated_at: String,
}

impl UpdateUserRequest {
    #[must_use]
    pub fn to_update(&self) -> UserUpdate {
        UserUpdate {
            id: self.id.clone(),
            fields: self.fields.clone(),
        }
    }

    /// Snapshot published after the update is committed.
    #[must_use]
    pub fn to_envelope(&self) -> UserEnvelope {
        UserEnvelope {
            id: self.id.clone(),
            first_name: self.fields.first_name.clone(),
            last_name: self.fields.last_name.clone(),
            nickname: self.fields.nickname.clone(),
            email: self.fields.email.clone(),
            country: self.fields.country.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    fn changed_columns(&self) -> String {
        self.fields
            .non_empty()
            .iter()
            .map(|(attr, _)| attr.column())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingId);
        }
        Ok(())
    }
}

impl Observed for UpdateUserRequest {
    fn log_fields(&self) -> Vec<Field> {
        vec![("id", self.id.clone()), ("changed", self.changed_columns())]
    }

    fn trace_fields(&self) -> Vec<Field> {
        self.log_fields()
    }

    fn report_extras(&self) -> Vec<Field> {
        self.log_fields()
    }
}

// ---------------------------------------------------------------------------
// DeleteUser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteUserRequest {
    pub id: String,
}

impl Validate for DeleteUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingId);
        }
        Ok(())
    }
}

impl Observed for DeleteUserRequest {
    fn log_fields(&self) -> Vec<Field> {
        vec![("id", self.id.clone())]
    }

    fn trace_fields(&self) -> Vec<Field> {
        self.log_fields()
    }

    fn report_extras(&self) -> Vec<Field> {
        self.log_fields()
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Acknowledgement returned by mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub status: bool,
    pub message: String,
}

impl Status {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: true,
            message: "OK".to_string(),
        }
    }
}

impl Observed for Status {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_matching_passwords() {
        let mut req = CreateUserRequest {
            fields: UserFields {
                password: "a".to_string(),
                ..UserFields::default()
            },
            password_confirm: "b".to_string(),
        };
        assert_eq!(req.validate(), Err(ValidationError::PasswordMismatch));

        req.password_confirm = "a".to_string();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_request_never_logs_password() {
        let req = CreateUserRequest {
            fields: UserFields {
                nickname: "alice".to_string(),
                password: "hunter2".to_string(),
                ..UserFields::default()
            },
            password_confirm: "hunter2".to_string(),
        };
        let all: Vec<_> = req
            .log_fields()
            .into_iter()
            .chain(req.trace_fields())
            .chain(req.report_extras())
            .collect();
        assert!(all.iter().all(|(_, v)| v != "hunter2"));
    }

    #[test]
    fn create_request_decodes_camel_case() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"nickname":"alice","firstName":"Alice","password":"p","passwordConfirm":"p"}"#,
        )
        .unwrap();
        assert_eq!(req.fields.first_name, "Alice");
        assert_eq!(req.password_confirm, "p");
    }

    #[test]
    fn get_request_conditions_skip_unset_fields() {
        let req = GetUsersRequest {
            country: "NL".to_string(),
            ..GetUsersRequest::default()
        };
        let conditions = req.conditions();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions.get(FilterKey::Country), Some("NL"));
    }

    #[test]
    fn get_request_set_filter_rejects_unknown_key() {
        let mut req = GetUsersRequest::default();
        req.set_filter("firstName", "Alice".to_string()).unwrap();
        assert_eq!(req.first_name, "Alice");
        assert!(matches!(
            req.set_filter("email", "x".to_string()),
            Err(ValidationError::UnknownFilter(_))
        ));
    }

    #[test]
    fn update_and_delete_require_id() {
        assert_eq!(
            UpdateUserRequest::default().validate(),
            Err(ValidationError::MissingId)
        );
        assert_eq!(
            DeleteUserRequest::default().validate(),
            Err(ValidationError::MissingId)
        );
    }

    #[test]
    fn update_envelope_mirrors_input() {
        let req = UpdateUserRequest {
            id: "u1".to_string(),
            fields: UserFields {
                nickname: "alice2".to_string(),
                password: "secret".to_string(),
                ..UserFields::default()
            },
            ..UpdateUserRequest::default()
        };
        let envelope = req.to_envelope();
        assert_eq!(envelope.id, "u1");
        assert_eq!(envelope.nickname, "alice2");
        assert_eq!(req.log_fields()[1], ("changed", "nickname,password".to_string()));
    }

    #[test]
    fn list_response_serializes_as_array() {
        let resp = GetUsersResponse(vec![UserView {
            id: "u1".to_string(),
            ..UserView::default()
        }]);
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["id"], "u1");
        assert!(json[0].get("password").is_none());
    }
}
