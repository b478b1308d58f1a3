pub mod agent;
pub mod commands;
pub mod config;
pub mod llm;
pub mod ocl;
pub mod server;
pub mod settings;
pub mod telemetry;
pub mod toolbox;
