mod admin;
mod health_check;
mod home;
mod login;
mod logout;

pub use admin::*;
pub use health_check::*;
pub use home::*;
pub use login::*;
pub use logout::*;
