pub mod access_policy;
pub mod admin;
pub mod authentication;
pub mod configuration;
pub mod domain;
pub mod routes;
pub mod seed;
pub mod session_state;
pub mod startup;
pub mod telemetry;
pub mod template;
pub mod user_role;
pub mod utils;
