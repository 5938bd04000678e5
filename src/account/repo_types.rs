use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Portal role. Serialized lowercase, both in documents and in token claims.
/// Immutable once assigned at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    /// Login view a denied visitor is redirected to.
    pub fn login_route(&self) -> &'static str {
        match self {
            Role::Student => "/student-login",
            Role::Teacher => "/teacher-login",
            Role::Admin => "/admin-login",
        }
    }
}

/// Approval state. Only teachers ever sit in `Pending`; a document missing
/// the field reads as `Pending` so an incomplete record never opens a gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Approved,
    #[default]
    Pending,
    Rejected,
}

impl AccountStatus {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(AccountStatus::Approved),
            "pending" => Some(AccountStatus::Pending),
            "rejected" => Some(AccountStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Approved => "approved",
            AccountStatus::Pending => "pending",
            AccountStatus::Rejected => "rejected",
        }
    }
}

/// Account document as persisted under `users/{uid}` and, for students,
/// mirrored into `students/{rollNumber}`. Field names are the stored wire
/// contract and must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub uid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_section: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_and_status_round_trip_lowercase() {
        assert_eq!(serde_json::to_value(Role::Teacher).unwrap(), json!("teacher"));
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("principal"), None);
        assert_eq!(
            serde_json::to_value(AccountStatus::Approved).unwrap(),
            json!("approved")
        );
        assert_eq!(AccountStatus::from_str("rejected"), Some(AccountStatus::Rejected));
    }

    #[test]
    fn record_uses_stored_field_names() {
        let record = AccountRecord {
            uid: "r-101".into(),
            name: "Asha Verma".into(),
            email: None,
            role: Role::Student,
            status: AccountStatus::Approved,
            phone: Some("9876543210".into()),
            class: Some("10".into()),
            section: Some("A".into()),
            roll_number: Some("r-101".into()),
            class_section: Some("10-A".into()),
            created_at: None,
        };
        let doc = serde_json::to_value(&record).unwrap();
        assert_eq!(doc["rollNumber"], "r-101");
        assert_eq!(doc["classSection"], "10-A");
        assert_eq!(doc["role"], "student");
        assert!(doc.get("email").is_none());
    }

    #[test]
    fn missing_status_field_reads_as_pending() {
        let doc = json!({
            "uid": "t-1",
            "name": "Old Teacher",
            "role": "teacher"
        });
        let record: AccountRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.status, AccountStatus::Pending);
    }

    #[test]
    fn login_routes_are_role_specific() {
        assert_eq!(Role::Admin.login_route(), "/admin-login");
        assert_eq!(Role::Teacher.login_route(), "/teacher-login");
        assert_eq!(Role::Student.login_route(), "/student-login");
    }
}
