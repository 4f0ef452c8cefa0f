pub mod api;
pub mod cli;
pub mod error;
pub mod export;
pub mod format;
pub mod identity;
pub mod models;
pub mod pins;
pub mod services;
pub mod settings;
pub mod threads;
