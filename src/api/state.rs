//! Shared state handed to every handler.

use crate::fetcher::ResultFetcher;
use crate::router::IntentRouter;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<IntentRouter>,
    pub fetcher: Arc<ResultFetcher>,
}

impl AppState {
    pub fn new(router: IntentRouter, fetcher: ResultFetcher) -> Self {
        Self {
            router: Arc::new(router),
            fetcher: Arc::new(fetcher),
        }
    }
}
