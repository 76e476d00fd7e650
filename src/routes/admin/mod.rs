mod custom;
mod dashboard;

pub use custom::custom_view;
pub use dashboard::admin_index;
