pub mod access_rules;
pub mod auth;
pub mod clock;
pub mod context;
pub mod entities;
pub mod error;
pub mod repository;
