pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod prompt;
pub mod retry;
pub mod service;
