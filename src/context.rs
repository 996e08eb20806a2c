use crate::config::AppConfig;
use crate::error::AppResult;
use crate::infra::cms::CmsClient;

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub cms: CmsClient,
}

impl AppContext {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let cms = CmsClient::new(&config.base_url, config.request_timeout())?;
        Ok(Self { config, cms })
    }
}
