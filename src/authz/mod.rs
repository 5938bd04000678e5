pub mod guard;
pub mod resolver;

pub use guard::{guard, DenyReason, GuardOutcome, GuardState, RouteGuard};
pub use resolver::{AuthzResolver, Resolution, ResolveError};
