pub mod config;
pub mod error;
pub mod finding;
pub mod inventory;
pub mod network;
pub mod run;
pub mod stats;
