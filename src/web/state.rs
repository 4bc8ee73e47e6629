use crate::{Config, cache::SharedCache, market::SharedMarketData, model::ModelManager};

#[derive(Clone)]
pub struct AppState {
    mm: ModelManager,
    cache: SharedCache,
    market: SharedMarketData,
    config: &'static Config,
}

impl AppState {
    pub fn new(
        mm: ModelManager,
        cache: SharedCache,
        market: SharedMarketData,
        config: &'static Config,
    ) -> Self {
        Self {
            mm,
            cache,
            market,
            config,
        }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn market(&self) -> &SharedMarketData {
        &self.market
    }

    pub fn config(&self) -> &'static Config {
        self.config
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("mm", &self.mm)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
