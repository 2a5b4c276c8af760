use crate::config::GatewayConfig;
use crate::dispatcher::TaskDispatcher;
use matching_engine::Exchange;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub exchange: Arc<Exchange>,
    pub dispatcher: Arc<TaskDispatcher>,
}

impl AppState {
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_exchange(Exchange::with_config(config.engine.clone()), config)
    }

    pub fn with_exchange(exchange: Exchange, config: &GatewayConfig) -> Self {
        Self {
            exchange: Arc::new(exchange),
            dispatcher: Arc::new(TaskDispatcher::new(
                config.wait_timeout(),
                config.poll_timeout(),
                config.result_ttl(),
            )),
        }
    }
}
