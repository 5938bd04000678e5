//! Access and approval core for a role-based school portal.
//!
//! The modeled system has no backend of its own: every rule runs client-side
//! against two hosted services, an identity provider (credentials plus
//! short-lived tokens with optional role claims) and a document profile
//! store. This crate owns the pieces with logical structure — account
//! lifecycle (teacher signup lands `pending` until an admin approves),
//! claims-first role resolution, the route-guard state machine, and the
//! attendance batch recorder — behind provider traits with in-process
//! implementations for development and tests.

pub mod account;
pub mod attendance;
pub mod authz;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod state;

pub use account::{AccountRecord, AccountStatus, LifecycleController, Role, Session};
pub use attendance::{AttendanceSheet, BatchOutcome, RosterRecorder};
pub use authz::{AuthzResolver, DenyReason, GuardOutcome, GuardState, RouteGuard};
pub use error::{PortalError, PortalResult};
pub use state::Portal;
