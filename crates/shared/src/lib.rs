pub mod config;
pub mod model;
pub mod result;
pub mod time;
