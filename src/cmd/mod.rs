pub mod config;
pub mod render;
pub mod serve;
pub mod session;
pub mod ticket;
