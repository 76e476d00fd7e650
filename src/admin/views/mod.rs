mod project;
mod role;
mod user;

pub use project::{Project, ProjectAdmin};
pub use role::{Role, RoleAdmin};
pub use user::{User, UserAdmin};
