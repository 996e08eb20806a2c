pub mod board;
pub mod loader;
pub mod mutator;
