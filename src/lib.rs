pub mod api;
pub mod config;
pub mod middleware;
pub mod visitor;
