pub mod filter;
pub mod ticket;
