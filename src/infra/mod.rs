pub mod cms;
pub mod dev_server;
pub mod store;
