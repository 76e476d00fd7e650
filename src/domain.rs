mod person_name;
mod project_cost;
mod project_name;
mod role_name;
mod user_email;
mod user_password;

pub use person_name::{PersonName, PersonNameError};
pub use project_cost::{CostPolicy, ProjectCost, ProjectCostError};
pub use project_name::{ProjectName, ProjectNameError};
pub use role_name::{RoleName, RoleNameError};
pub use user_email::{UserEmail, UserEmailError};
pub use user_password::{UserPassword, UserPasswordError};
