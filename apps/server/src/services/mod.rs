pub mod quiz;
pub mod sink;
