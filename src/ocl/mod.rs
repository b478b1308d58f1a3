//! Client for the Open Concept Lab terminology API.

pub mod client;
pub mod error;
pub mod matching;
pub mod params;
pub mod servers;

pub use client::OclClient;
pub use error::OclError;
