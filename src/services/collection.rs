use async_trait::async_trait;

use crate::error::AppResult;

/// A remote JSON array that can be fetched whole.
#[async_trait]
pub trait CollectionSource<T>: Send + Sync {
    /// Where the collection lives, for logs.
    fn location(&self) -> &str;

    async fn fetch(&self) -> AppResult<Vec<T>>;
}
