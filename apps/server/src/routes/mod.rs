pub mod bank;
pub mod results;
pub mod sessions;
