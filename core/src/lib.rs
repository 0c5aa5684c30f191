pub mod controller;
pub mod discovery;
pub mod network;
pub mod scanner;
pub mod store;
pub mod topology;
