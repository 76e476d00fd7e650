mod middleware;
mod password;
mod principal;

pub use middleware::enforce_admin_access;
pub use password::{compute_password_hash, validate_credentials, AuthError, Credentials};
pub use principal::{load_principal, Principal};
