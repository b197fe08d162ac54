use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Group that may submit ideas.
pub const SUBMITTER_GROUP: &str = "EM";
/// Group with full administrative access.
pub const ADMIN_GROUP: &str = "camunda-admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl User {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.id.clone()
        } else {
            name.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// The authenticated principal as reported by `GET /api/auth/me`.
///
/// Group checks here only decide what the client shows. The backend is
/// the enforcement boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl CurrentUser {
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn is_submitter(&self) -> bool {
        self.in_group(SUBMITTER_GROUP)
    }

    pub fn is_admin(&self) -> bool {
        self.in_group(ADMIN_GROUP)
    }

    /// Create, edit and delete controls on the idea list.
    pub fn can_manage_ideas(&self) -> bool {
        self.is_submitter() || self.is_admin()
    }

    pub fn can_manage_users(&self) -> bool {
        self.is_admin()
    }
}

/// Body of `POST /api/users` and `PUT /api/users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Empty on update means "leave unchanged".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

impl UserInput {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            password: String::new(),
        }
    }

    pub fn validate(&self, creating: bool) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("user id"));
        }
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::MissingField("first name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::MissingField("last name"));
        }
        if creating && self.password.is_empty() {
            return Err(ValidationError::MissingField("password"));
        }
        Ok(())
    }
}

/// Body of `POST /api/developpements/process-instances/{id}/equipe`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAssignment {
    pub chef_de_projet: String,
    pub membres_equipe: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(groups: &[&str]) -> CurrentUser {
        CurrentUser {
            username: "u".into(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn role_gates() {
        assert!(user(&["EM"]).can_manage_ideas());
        assert!(!user(&["EM"]).can_manage_users());
        assert!(user(&["camunda-admin"]).can_manage_ideas());
        assert!(user(&["camunda-admin"]).can_manage_users());
        assert!(!user(&["CQ"]).can_manage_ideas());
        assert!(!user(&[]).can_manage_users());
    }

    #[test]
    fn update_password_is_optional() {
        let input = UserInput {
            id: "jdoe".into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: "j@example.com".into(),
            password: String::new(),
        };
        assert!(input.validate(false).is_ok());
        assert_eq!(
            input.validate(true),
            Err(ValidationError::MissingField("password"))
        );
        let json = serde_json::to_value(&input).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["firstName"], "John");
    }

    #[test]
    fn full_name_falls_back_to_id() {
        let u = User {
            id: "dev1".into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
        };
        assert_eq!(u.full_name(), "dev1");
    }
}
