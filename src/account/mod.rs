mod dto;
pub(crate) mod repo;
pub mod repo_types;
mod services;

pub use dto::{RegisterStudentForm, Session, StaffSignupForm, StudentSignupForm};
pub use repo_types::{AccountRecord, AccountStatus, Role};
pub use services::LifecycleController;
