use serde::{Deserialize, Serialize};

use crate::account::repo_types::{AccountRecord, Role};

/// Signup form shared by the teacher and admin paths.
#[derive(Debug, Deserialize)]
pub struct StaffSignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Self-service student signup form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub class: String,
    pub section: String,
    pub roll_number: String,
    pub phone: String,
}

/// Roster entry created by staff on a student's behalf. No credential is
/// created and the roll number doubles as the record key.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentForm {
    pub name: String,
    pub class: String,
    pub section: String,
    pub roll_number: String,
    pub phone: String,
}

/// Established after a successful login or student self-signup.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub uid: String,
    pub email: String,
    pub role: Role,
    /// Account document at login time, when it was readable.
    pub profile: Option<AccountRecord>,
}
