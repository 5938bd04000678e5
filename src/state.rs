use std::sync::Arc;

use crate::account::repo_types::Role;
use crate::account::LifecycleController;
use crate::attendance::RosterRecorder;
use crate::authz::{AuthzResolver, RouteGuard};
use crate::config::PortalConfig;
use crate::provider::identity::IdentityProvider;
use crate::provider::local::LocalIdentityProvider;
use crate::provider::memory::MemoryProfileStore;
use crate::provider::store::ProfileStore;

/// Provider handles plus configuration, constructed once at startup and
/// handed to every controller. Both collaborators are explicit client
/// objects, never process-wide singletons.
#[derive(Clone)]
pub struct Portal {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn ProfileStore>,
    pub config: Arc<PortalConfig>,
}

impl Portal {
    /// Environment-configured portal over the in-process providers.
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(PortalConfig::from_env()?);
        let identity =
            Arc::new(LocalIdentityProvider::new(&config.token)) as Arc<dyn IdentityProvider>;
        let store = Arc::new(MemoryProfileStore::new()) as Arc<dyn ProfileStore>;
        Ok(Self {
            identity,
            store,
            config,
        })
    }

    /// Wires the portal over externally constructed provider handles.
    pub fn from_parts(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProfileStore>,
        config: Arc<PortalConfig>,
    ) -> Self {
        Self {
            identity,
            store,
            config,
        }
    }

    /// Fully in-memory portal with a fixed local configuration. Used by
    /// tests and demos; reads nothing from the environment.
    pub fn in_memory() -> Self {
        let config = Arc::new(PortalConfig::local());
        let identity =
            Arc::new(LocalIdentityProvider::new(&config.token)) as Arc<dyn IdentityProvider>;
        let store = Arc::new(MemoryProfileStore::new()) as Arc<dyn ProfileStore>;
        Self {
            identity,
            store,
            config,
        }
    }

    pub fn lifecycle(&self) -> LifecycleController {
        LifecycleController::new(self.identity.clone(), self.store.clone())
    }

    pub fn resolver(&self) -> AuthzResolver {
        AuthzResolver::new(self.identity.clone(), self.store.clone())
    }

    /// Guard for a view requiring `required`, already subscribed to
    /// identity changes.
    pub fn guard(&self, required: Role) -> RouteGuard {
        RouteGuard::new(required, self.identity.clone(), self.store.clone())
    }

    pub fn recorder(&self) -> RosterRecorder {
        RosterRecorder::new(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountStatus, RegisterStudentForm, StaffSignupForm};
    use crate::attendance::{AttendanceSheet, AttendanceStatus};
    use crate::authz::{DenyReason, GuardOutcome, GuardState};
    use crate::error::PortalError;
    use std::collections::BTreeMap;

    fn staff(name: &str, email: &str) -> StaffSignupForm {
        StaffSignupForm {
            name: name.into(),
            email: email.into(),
            password: "pass123".into(),
            phone: "9876543210".into(),
        }
    }

    #[tokio::test]
    async fn whole_portal_workflow() {
        let portal = Portal::in_memory();
        let lifecycle = portal.lifecycle();

        // An admin and a teacher sign up; only the teacher needs review.
        let admin_uid = lifecycle
            .signup_admin(staff("Head Admin", "head@school.edu"))
            .await
            .unwrap();
        let teacher_uid = lifecycle
            .signup_teacher(staff("Ms. Rao", "rao@school.edu"))
            .await
            .unwrap();

        let err = lifecycle
            .login("rao@school.edu", "pass123", Role::Teacher)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::ApprovalPending));

        // Admin reviews the pending queue and approves.
        lifecycle
            .login("head@school.edu", "pass123", Role::Admin)
            .await
            .unwrap();
        let pending = lifecycle.pending_teachers().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].uid, teacher_uid);
        lifecycle.approve(&teacher_uid).await.unwrap();

        let admin_account = lifecycle.find_account(&admin_uid).await.unwrap().unwrap();
        assert_eq!(admin_account.status, AccountStatus::Approved);

        // The teacher signs in, passes the guard, registers two students.
        let session = lifecycle
            .login("rao@school.edu", "pass123", Role::Teacher)
            .await
            .unwrap();
        assert_eq!(session.role, Role::Teacher);

        let mut teacher_guard = portal.guard(Role::Teacher);
        assert_eq!(teacher_guard.evaluate().await, GuardState::Authorized);

        for (roll, name) in [("101", "Asha Verma"), ("102", "Ravi Kumar")] {
            lifecycle
                .register_student(RegisterStudentForm {
                    name: name.into(),
                    class: "10".into(),
                    section: "A".into(),
                    roll_number: roll.into(),
                    phone: "9123456780".into(),
                })
                .await
                .unwrap();
        }

        // Roster loads and the day's marks are recorded.
        let recorder = portal.recorder();
        let roster = recorder.fetch_roster("10", "A").await.unwrap();
        assert_eq!(roster.len(), 2);

        let mut marks = BTreeMap::new();
        marks.insert("101".to_string(), AttendanceStatus::Present);
        marks.insert("102".to_string(), AttendanceStatus::Absent);
        let outcome = recorder
            .record(AttendanceSheet {
                class: "10".into(),
                section: "A".into(),
                date: "2024-01-15".into(),
                marks,
                marked_by: session.profile.map(|p| p.name).unwrap_or_default(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, 2);

        let history = recorder.history("102", None, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].marked_by, "Ms. Rao");

        // Signing out flips the guard back to checking, then denies.
        lifecycle.sign_out().await;
        teacher_guard.identity_changed().await;
        assert_eq!(
            teacher_guard.render(|| "tools"),
            GuardOutcome::<&str>::Placeholder
        );
        assert_eq!(
            teacher_guard.evaluate().await,
            GuardState::Denied(DenyReason::Unauthorized)
        );
    }
}
