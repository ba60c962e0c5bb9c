use crate::errors::Result;
use crate::outbound::OutboundCall;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Which outbound operation an interceptor is hooked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineEvent {
    Send,
    Edit,
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::Send => "on_send",
            PipelineEvent::Edit => "on_edit",
        }
    }
}

/// Middleware that may rewrite a message before it leaves the bot.
#[async_trait]
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;
    async fn intercept(&self, event: PipelineEvent, call: OutboundCall) -> Result<OutboundCall>;
}

/// Ordered interceptor chains, one per event. Each interceptor sees the previous one's output.
#[derive(Default)]
pub struct SendPipeline {
    chains: HashMap<PipelineEvent, Vec<Arc<dyn Interceptor>>>,
}

impl SendPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event: PipelineEvent, interceptor: Arc<dyn Interceptor>) {
        debug!("Pipeline: registering {} for {}", interceptor.name(), event.name());
        self.chains.entry(event).or_default().push(interceptor);
    }

    pub fn interceptors(&self, event: PipelineEvent) -> Vec<&str> {
        self.chains
            .get(&event)
            .map(|chain| chain.iter().map(|i| i.name()).collect())
            .unwrap_or_default()
    }

    pub async fn run(&self, event: PipelineEvent, mut call: OutboundCall) -> Result<OutboundCall> {
        if let Some(chain) = self.chains.get(&event) {
            for interceptor in chain {
                call = interceptor.intercept(event, call).await?;
            }
        }
        Ok(call)
    }
}
