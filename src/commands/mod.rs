pub mod ask;
pub mod config;
pub mod serve;
pub mod tools;
