pub mod auth;
pub mod ticket;
