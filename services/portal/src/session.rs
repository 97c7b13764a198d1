use std::sync::Arc;

use excuse_portal::api::{HttpTransport, PortalClient};
use excuse_portal::config::AppConfig;
use excuse_portal::error::AppError;
use excuse_portal::lookup::{FormDataCache, SessionContext, SessionScope};
use excuse_portal::telemetry;

/// Configuration and a connected client for one CLI invocation.
pub(crate) struct Connection {
    pub(crate) config: AppConfig,
    pub(crate) client: PortalClient,
    pub(crate) cache: FormDataCache,
}

impl Connection {
    pub(crate) fn open(endpoint: Option<String>) -> Result<Self, AppError> {
        let mut config = AppConfig::load()?;
        if let Some(endpoint) = endpoint {
            config.backend.endpoint = Some(endpoint);
        }
        telemetry::init(&config.telemetry)?;

        let transport = HttpTransport::new(config.backend.clone())?;
        let client = PortalClient::new(Arc::new(transport));
        let cache = FormDataCache::from_config(&config.cache);

        Ok(Self {
            config,
            client,
            cache,
        })
    }

    pub(crate) async fn context(&self, scope: SessionScope) -> Result<SessionContext, AppError> {
        Ok(SessionContext::initialize(&self.client, Some(&self.cache), scope).await?)
    }
}
