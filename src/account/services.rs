use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::account::dto::{RegisterStudentForm, Session, StaffSignupForm, StudentSignupForm};
use crate::account::repo;
use crate::account::repo_types::{AccountRecord, AccountStatus, Role};
use crate::authz::resolver::AuthzResolver;
use crate::error::{PortalError, PortalResult};
use crate::provider::identity::IdentityProvider;
use crate::provider::store::ProfileStore;

lazy_static! {
    static ref ROLL_RE: Regex = Regex::new(r"^[A-Za-z0-9._-]+$").unwrap();
    static ref CLASS_RE: Regex = Regex::new(r"^(?:[1-9]|1[0-2])$").unwrap();
    static ref SECTION_RE: Regex = Regex::new(r"^[A-Z]$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\d{10}$").unwrap();
}

fn require_non_empty(value: &str, field: &str) -> PortalResult<()> {
    if value.trim().is_empty() {
        warn!(field = %field, "missing required field");
        return Err(PortalError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Shape rules applied to both student-creation paths.
fn validate_student_shape(
    roll_number: &str,
    class: &str,
    section: &str,
    phone: &str,
) -> PortalResult<()> {
    if !ROLL_RE.is_match(roll_number) {
        return Err(PortalError::Validation(
            "roll number can include letters, numbers, - _ . only".into(),
        ));
    }
    if !CLASS_RE.is_match(class) {
        return Err(PortalError::Validation("class must be 1-12".into()));
    }
    if !SECTION_RE.is_match(section) {
        return Err(PortalError::Validation(
            "section must be a single uppercase letter".into(),
        ));
    }
    if !PHONE_RE.is_match(phone) {
        return Err(PortalError::Validation("phone must be 10 digits".into()));
    }
    Ok(())
}

/// Drives every account state transition: signups, the teacher approval
/// workflow, role-checked login, and the roster reads built on top.
pub struct LifecycleController {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProfileStore>,
}

impl LifecycleController {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn ProfileStore>) -> Self {
        Self { identity, store }
    }

    /// Teacher signup. The account lands in `pending` and stays locked out
    /// of teacher views until an admin approves it.
    pub async fn signup_teacher(&self, form: StaffSignupForm) -> PortalResult<String> {
        self.signup_staff(form, Role::Teacher).await
    }

    /// Admin signup, approved at creation.
    pub async fn signup_admin(&self, form: StaffSignupForm) -> PortalResult<String> {
        self.signup_staff(form, Role::Admin).await
    }

    async fn signup_staff(&self, form: StaffSignupForm, role: Role) -> PortalResult<String> {
        let name = form.name.trim().to_string();
        let email = form.email.trim().to_lowercase();
        let phone = form.phone.trim().to_string();
        require_non_empty(&name, "name")?;
        require_non_empty(&email, "email")?;
        require_non_empty(&form.password, "password")?;
        require_non_empty(&phone, "phone")?;

        let identity = self.identity.sign_up(&email, &form.password).await?;

        let status = match role {
            Role::Teacher => AccountStatus::Pending,
            _ => AccountStatus::Approved,
        };
        let record = AccountRecord {
            uid: identity.uid.clone(),
            name,
            email: Some(identity.email.clone()),
            role,
            status,
            phone: Some(phone),
            class: None,
            section: None,
            roll_number: None,
            class_section: None,
            created_at: Some(OffsetDateTime::now_utc()),
        };
        record.create(self.store.as_ref()).await?;

        info!(
            uid = %identity.uid,
            role = role.as_str(),
            status = status.as_str(),
            "account created"
        );
        Ok(identity.uid)
    }

    /// Student self-signup. Creates the credential, writes the account plus
    /// its roster mirror with `approved` status, and returns the session the
    /// provider opened.
    pub async fn signup_student(&self, form: StudentSignupForm) -> PortalResult<Session> {
        let name = form.name.trim().to_string();
        let email = form.email.trim().to_lowercase();
        let class = form.class.trim().to_string();
        let section = form.section.trim().to_string();
        let roll_number = form.roll_number.trim().to_string();
        let phone = form.phone.trim().to_string();
        require_non_empty(&name, "name")?;
        require_non_empty(&email, "email")?;
        require_non_empty(&form.password, "password")?;
        require_non_empty(&class, "class")?;
        require_non_empty(&section, "section")?;
        require_non_empty(&roll_number, "roll number")?;
        require_non_empty(&phone, "phone")?;
        validate_student_shape(&roll_number, &class, &section, &phone)?;

        let identity = self.identity.sign_up(&email, &form.password).await?;

        let record = self.student_record(
            identity.uid.clone(),
            name,
            Some(identity.email.clone()),
            class,
            section,
            roll_number,
            phone,
        );
        record.create(self.store.as_ref()).await?;

        info!(uid = %identity.uid, "student signed up");
        Ok(Session {
            uid: identity.uid,
            email: identity.email,
            role: Role::Student,
            profile: Some(record),
        })
    }

    /// Registrar path: staff creates the roster entry on a student's behalf.
    /// No credential is created and the roll number doubles as the account
    /// identifier.
    pub async fn register_student(&self, form: RegisterStudentForm) -> PortalResult<String> {
        let name = form.name.trim().to_string();
        let class = form.class.trim().to_string();
        let section = form.section.trim().to_string();
        let roll_number = form.roll_number.trim().to_string();
        let phone = form.phone.trim().to_string();
        require_non_empty(&name, "name")?;
        require_non_empty(&class, "class")?;
        require_non_empty(&section, "section")?;
        require_non_empty(&roll_number, "roll number")?;
        require_non_empty(&phone, "phone")?;
        validate_student_shape(&roll_number, &class, &section, &phone)?;

        let record = self.student_record(
            roll_number.clone(),
            name,
            None,
            class,
            section,
            roll_number.clone(),
            phone,
        );
        record.create(self.store.as_ref()).await?;

        info!(roll_number = %roll_number, "student registered");
        Ok(roll_number)
    }

    #[allow(clippy::too_many_arguments)]
    fn student_record(
        &self,
        uid: String,
        name: String,
        email: Option<String>,
        class: String,
        section: String,
        roll_number: String,
        phone: String,
    ) -> AccountRecord {
        let class_section = format!("{}-{}", class, section);
        AccountRecord {
            uid,
            name,
            email,
            role: Role::Student,
            status: AccountStatus::Approved,
            phone: Some(phone),
            class: Some(class),
            section: Some(section),
            roll_number: Some(roll_number),
            class_section: Some(class_section),
            created_at: Some(OffsetDateTime::now_utc()),
        }
    }

    /// Authenticates and gates on the resolved role. Teachers additionally
    /// need `approved` status; `NotAuthorized` (wrong role) and
    /// `ApprovalPending` (right role, not approved) stay distinct because
    /// the caller shows different messages for them.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        expected_role: Role,
    ) -> PortalResult<Session> {
        let email = email.trim().to_lowercase();
        require_non_empty(&email, "email")?;
        require_non_empty(password, "password")?;

        let identity = self.identity.sign_in(&email, password).await?;

        let resolver = AuthzResolver::new(self.identity.clone(), self.store.clone());
        let resolution = resolver.resolve_identity(&identity).await?;

        if resolution.role != Some(expected_role) {
            warn!(
                uid = %identity.uid,
                expected = expected_role.as_str(),
                "login role mismatch"
            );
            return Err(PortalError::NotAuthorized);
        }
        if expected_role == Role::Teacher && resolution.status != AccountStatus::Approved {
            info!(uid = %identity.uid, status = resolution.status.as_str(), "login gated on approval");
            return Err(PortalError::ApprovalPending);
        }

        let profile = AccountRecord::find_by_uid(self.store.as_ref(), &identity.uid)
            .await
            .unwrap_or_else(|e| {
                warn!(uid = %identity.uid, error = %e, "profile read failed at login");
                None
            });

        info!(uid = %identity.uid, role = expected_role.as_str(), "login succeeded");
        Ok(Session {
            uid: identity.uid,
            email: identity.email,
            role: expected_role,
            profile,
        })
    }

    /// Approves a pending teacher. Plain last-write-wins status update; a
    /// repeat application succeeds with nothing new to do.
    pub async fn approve(&self, uid: &str) -> PortalResult<()> {
        repo::set_status(self.store.as_ref(), uid, AccountStatus::Approved).await?;
        info!(uid = %uid, "teacher approved");
        Ok(())
    }

    /// Rejects a pending teacher. Terminal; no re-review path exists.
    pub async fn reject(&self, uid: &str) -> PortalResult<()> {
        repo::set_status(self.store.as_ref(), uid, AccountStatus::Rejected).await?;
        info!(uid = %uid, "teacher rejected");
        Ok(())
    }

    /// Teachers awaiting an approval decision, for the admin review screen.
    pub async fn pending_teachers(&self) -> PortalResult<Vec<AccountRecord>> {
        Ok(repo::pending_teachers(self.store.as_ref()).await?)
    }

    /// Student accounts, optionally narrowed by class and section. Blank
    /// filters mean no narrowing.
    pub async fn list_students(
        &self,
        class: Option<&str>,
        section: Option<&str>,
    ) -> PortalResult<Vec<AccountRecord>> {
        let class = class.map(str::trim).filter(|c| !c.is_empty());
        let section = section.map(str::trim).filter(|s| !s.is_empty());
        Ok(repo::students(self.store.as_ref(), class, section).await?)
    }

    pub async fn find_account(&self, uid: &str) -> PortalResult<Option<AccountRecord>> {
        Ok(AccountRecord::find_by_uid(self.store.as_ref(), uid).await?)
    }

    /// Roster mirror lookup by roll number.
    pub async fn student_profile(&self, roll_number: &str) -> PortalResult<Option<AccountRecord>> {
        Ok(AccountRecord::find_student_profile(self.store.as_ref(), roll_number).await?)
    }

    /// Ends the provider session. Guards subscribed to identity changes see
    /// the transition and drop back to their checking state.
    pub async fn sign_out(&self) {
        self.identity.sign_out().await;
    }
}
