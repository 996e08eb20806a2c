pub mod collection;
pub mod status_endpoint;

pub use collection::CollectionSource;
pub use status_endpoint::StatusEndpoint;
