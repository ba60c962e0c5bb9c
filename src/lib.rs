pub mod commands;
pub mod componesy;
pub mod config;
pub mod db;
pub mod errors;
pub mod language;
pub mod outbound;

use componesy::ViewBuilder;
use language::LanguageService;
use outbound::{PipelineEvent, SendPipeline};
use std::sync::Arc;
use tracing::info;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub db: db::Database,
    pub language: Arc<LanguageService>,
    pub views: Arc<ViewBuilder>,
    pub pipeline: Arc<SendPipeline>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

impl Data {
    pub fn new(config: config::Config) -> anyhow::Result<Self> {
        let db = db::Database::new(&config)?;
        db.execute_init()?;

        let language = Arc::new(LanguageService::new(db.clone(), &config.replies_path));
        let views = Arc::new(ViewBuilder::new());
        let pipeline = Arc::new(build_pipeline(language.clone(), views.clone()));

        Ok(Self {
            config,
            db,
            language,
            views,
            pipeline,
        })
    }

    /// Populate caches once the bot is connected.
    pub async fn init(&self) -> errors::Result<()> {
        self.language.init().await?;
        info!(
            "Send pipeline: on_send={:?} on_edit={:?}",
            self.pipeline.interceptors(PipelineEvent::Send),
            self.pipeline.interceptors(PipelineEvent::Edit)
        );
        Ok(())
    }

    pub fn shutdown(&self) {
        self.language.shutdown();
    }
}

/// Translation runs first so views are attached to already translated content.
pub fn build_pipeline(language: Arc<LanguageService>, views: Arc<ViewBuilder>) -> SendPipeline {
    let mut pipeline = SendPipeline::new();
    pipeline.register(PipelineEvent::Send, language);
    pipeline.register(PipelineEvent::Send, views.clone());
    pipeline.register(PipelineEvent::Edit, views);
    pipeline
}
