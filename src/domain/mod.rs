pub mod employee;
pub mod filter;
pub mod refresh;
pub mod status;
pub mod ticket;
