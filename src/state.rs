//! Shared application state, threaded through the façade and the websocket
//! endpoint (spec.md §9 "Global state": "should be threaded through an
//! explicit application context rather than module-initialized"), grounded
//! on the teacher's `Matrix`/`MatrixParams` struct-of-params constructor.

use std::sync::Arc;

use crate::broker::BrokerProducer;
use crate::config::Config;
use crate::registry::ConnectionRegistry;
use crate::services::ServiceContext;

pub struct AppStateParams {
    pub services: ServiceContext,
    pub registry: Arc<ConnectionRegistry>,
    pub producer: BrokerProducer,
    pub config: Config,
}

#[derive(Clone)]
pub struct AppState {
    pub services: ServiceContext,
    pub registry: Arc<ConnectionRegistry>,
    pub producer: Arc<BrokerProducer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(params: AppStateParams) -> Self {
        Self {
            services: params.services,
            registry: params.registry,
            producer: Arc::new(params.producer),
            config: Arc::new(params.config),
        }
    }
}
