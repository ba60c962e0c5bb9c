//! Per-user/guild language settings and automatic translation of outgoing messages.
//!
//! Outgoing text is written in Japanese; when a message answers someone whose preference is
//! English, the text is swapped for the matching entry in the translation table.
//! Variable parts go between `$` markers in code and show up as `$$` in the table.

pub mod placeholder;
pub mod preference;
pub mod store;

use crate::db::Database;
use crate::errors::{Result, RtError};
use crate::outbound::{Interceptor, OutboundCall, OutboundEmbed, PipelineEvent};
use async_trait::async_trait;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

pub use preference::PreferenceCache;
pub use store::TranslationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Japanese,
    English,
}

impl Language {
    pub const PRIMARY: Language = Language::Japanese;
    pub const ALL: [Language; 2] = [Language::Japanese, Language::English];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Japanese => "ja",
            Language::English => "en",
        }
    }
}

impl FromStr for Language {
    type Err = RtError;

    fn from_str(s: &str) -> Result<Self> {
        Language::ALL
            .into_iter()
            .find(|language| language.code() == s)
            .ok_or_else(|| RtError::InvalidLanguageCode(s.to_string()))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Whose language to translate into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationTarget {
    Language(Language),
    Subject(u64),
}

impl From<Language> for TranslationTarget {
    fn from(language: Language) -> Self {
        TranslationTarget::Language(language)
    }
}

/// Owns the translation table and the preference cache for the lifetime of the bot.
pub struct LanguageService {
    store: TranslationStore,
    preferences: PreferenceCache,
}

impl LanguageService {
    pub fn new(db: Database, replies_path: impl Into<PathBuf>) -> Self {
        Self::from_parts(TranslationStore::new(replies_path), PreferenceCache::new(db))
    }

    pub fn from_parts(store: TranslationStore, preferences: PreferenceCache) -> Self {
        Self { store, preferences }
    }

    pub fn store(&self) -> &TranslationStore {
        &self.store
    }

    pub fn preferences(&self) -> &PreferenceCache {
        &self.preferences
    }

    /// Load preferences and the translation table. The language table must already exist.
    pub async fn init(&self) -> Result<()> {
        self.preferences.refresh().await?;
        self.store.reload().await?;
        info!("Language: ready with {} phrases", self.store.len());
        Ok(())
    }

    pub async fn reload(&self) -> Result<()> {
        self.store.reload().await
    }

    pub fn shutdown(&self) {
        debug!("Language: dropping cached preferences");
        self.preferences.clear();
    }

    pub fn resolve(&self, target: TranslationTarget) -> Language {
        match target {
            TranslationTarget::Language(language) => language,
            TranslationTarget::Subject(subject_id) => self.preferences.get(subject_id),
        }
    }

    pub fn get_text(&self, text: &str, target: impl Into<TranslationTarget>) -> String {
        self.store.translate(text, self.resolve(target.into()))
    }

    pub fn get_embed(&self, embed: OutboundEmbed, target: impl Into<TranslationTarget>) -> OutboundEmbed {
        let language = self.resolve(target.into());
        embed.map_text(|text| self.store.translate(text, language))
    }

    /// Language an outbound call should be rendered in.
    pub fn language_for(&self, call: &OutboundCall) -> Language {
        if !call.replace_language {
            return Language::PRIMARY;
        }
        match (call.reply_to, call.target) {
            (Some(reply), _) => self.preferences.get(reply.author_id),
            (None, Some(subject_id)) => self.preferences.get(subject_id),
            (None, None) => Language::PRIMARY,
        }
    }

    pub fn rewrite(&self, mut call: OutboundCall) -> OutboundCall {
        let language = self.language_for(&call);

        if let Some(content) = call.content.take() {
            call.content = Some(self.store.translate(&content, language));
        }
        call.embeds = std::mem::take(&mut call.embeds)
            .into_iter()
            .map(|embed| self.get_embed(embed, language))
            .collect();
        call
    }
}

#[async_trait]
impl Interceptor for LanguageService {
    fn name(&self) -> &str {
        "language"
    }

    async fn intercept(&self, _event: PipelineEvent, call: OutboundCall) -> Result<OutboundCall> {
        Ok(self.rewrite(call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::language::store::table;

    fn service(entries: &[(&str, &str, &str)]) -> LanguageService {
        let db = Database::new(&test_config()).unwrap();
        db.execute_init().unwrap();
        LanguageService::from_parts(
            TranslationStore::with_table(table(entries)),
            PreferenceCache::new(db),
        )
    }

    #[test]
    fn test_language_codes() {
        assert_eq!("ja".parse::<Language>().unwrap(), Language::Japanese);
        assert_eq!("en".parse::<Language>().unwrap(), Language::English);
        assert!(matches!(
            "EN".parse::<Language>(),
            Err(RtError::InvalidLanguageCode(_))
        ));
        assert_eq!(Language::PRIMARY.to_string(), "ja");
    }

    #[tokio::test]
    async fn test_reply_is_translated_for_referenced_author() {
        let service = service(&[("Ok", "en", "OK!")]);
        service.preferences().set(42, "en").await.unwrap();

        let call = OutboundCall::new().content("Ok").reply_to(42, None);
        let call = service
            .intercept(PipelineEvent::Send, call)
            .await
            .unwrap();
        assert_eq!(call.content.as_deref(), Some("OK!"));
    }

    #[tokio::test]
    async fn test_non_reply_uses_primary() {
        let service = service(&[("Ok", "en", "OK!"), ("Ok", "ja", "了解")]);
        service.preferences().set(42, "en").await.unwrap();

        let call = service.rewrite(OutboundCall::text("Ok"));
        assert_eq!(call.content.as_deref(), Some("了解"));
    }

    #[tokio::test]
    async fn test_explicit_target_and_reply_precedence() {
        let service = service(&[("Ok", "en", "OK!")]);
        service.preferences().set(42, "en").await.unwrap();

        let call = service.rewrite(OutboundCall::text("Ok").target(42));
        assert_eq!(call.content.as_deref(), Some("OK!"));

        // reply author 7 has no preference and wins over the target
        let call = service.rewrite(OutboundCall::text("Ok").target(42).reply_to(7, None));
        assert_eq!(call.content.as_deref(), Some("Ok"));
    }

    #[tokio::test]
    async fn test_opt_out_forces_primary() {
        let service = service(&[("Ok", "en", "OK!")]);
        service.preferences().set(42, "en").await.unwrap();

        let call = OutboundCall::text("Ok")
            .reply_to(42, None)
            .replace_language(false);
        let call = service.rewrite(call);
        assert_eq!(call.content.as_deref(), Some("Ok"));
    }

    #[tokio::test]
    async fn test_embeds_are_rewritten_field_by_field() {
        let service = service(&[
            ("Ok", "en", "OK!"),
            ("設定", "en", "Settings"),
            ("言語: $$", "en", "Language: $$"),
            ("フッター", "en", "Footer"),
        ]);
        service.preferences().set(42, "en").await.unwrap();

        let embed = OutboundEmbed::new()
            .title("Ok")
            .description("untranslated")
            .field("設定", "言語: $en$", false)
            .footer("フッター")
            .color(0x0066ff);
        let call = OutboundCall::new()
            .embed(embed.clone())
            .embed(OutboundEmbed::new().title("設定"))
            .reply_to(42, None);
        let call = service.rewrite(call);

        assert_eq!(call.embeds.len(), 2);
        let first = &call.embeds[0];
        assert_eq!(first.title.as_deref(), Some("OK!"));
        assert_eq!(first.description.as_deref(), Some("untranslated"));
        assert_eq!(first.fields[0].name, "Settings");
        assert_eq!(first.fields[0].value, "Language: en");
        assert_eq!(first.footer.as_deref(), Some("Footer"));
        assert_eq!(first.color, Some(0x0066ff));
        assert_eq!(call.embeds[1].title.as_deref(), Some("Settings"));
    }

    #[tokio::test]
    async fn test_get_text_by_subject_or_code() {
        let service = service(&[("こんにちは", "en", "Hello")]);
        service.preferences().set(5, "en").await.unwrap();

        assert_eq!(service.get_text("こんにちは", TranslationTarget::Subject(5)), "Hello");
        assert_eq!(service.get_text("こんにちは", TranslationTarget::Subject(6)), "こんにちは");
        assert_eq!(service.get_text("こんにちは", Language::English), "Hello");
    }

    #[tokio::test]
    async fn test_shutdown_drops_cached_preferences() {
        let service = service(&[]);
        service.preferences().set(5, "en").await.unwrap();
        service.shutdown();
        assert_eq!(service.preferences().get(5), Language::PRIMARY);
    }
}
