pub mod address;
pub mod api;
pub mod balance;
pub mod cancel;
pub mod config;
pub mod error;
pub mod explorer;
pub mod history;
pub mod models;
pub mod node;
pub mod tokens;
pub mod units;
