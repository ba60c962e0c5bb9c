//! Everything the bot says goes through here: an `OutboundCall` is built, run through the
//! `SendPipeline` and only then turned into a serenity/poise builder.

pub mod pipeline;

use crate::componesy::{LiveView, ViewArg, ViewDescriptor};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use serenity::{
    ChannelId, CreateActionRow, CreateEmbed, CreateEmbedFooter, CreateInteractionResponseMessage,
    CreateMessage, EditMessage, MessageId,
};
use tracing::warn;

pub use pipeline::{Interceptor, PipelineEvent, SendPipeline};

/// The message an outgoing call is answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub author_id: u64,
    pub message: Option<(ChannelId, MessageId)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Readable embed model. Serenity's `CreateEmbed` cannot be inspected, so rewriting
/// happens on this and conversion is the very last step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundEmbed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub color: Option<u32>,
}

impl OutboundEmbed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(text.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Apply `f` to every piece of text in the embed.
    pub fn map_text(mut self, mut f: impl FnMut(&str) -> String) -> Self {
        self.title = self.title.as_deref().map(&mut f);
        self.description = self.description.as_deref().map(&mut f);
        for field in &mut self.fields {
            field.name = f(&field.name);
            field.value = f(&field.value);
        }
        self.footer = self.footer.as_deref().map(&mut f);
        self
    }

    pub fn to_create_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new();
        if let Some(title) = &self.title {
            embed = embed.title(title);
        }
        if let Some(description) = &self.description {
            embed = embed.description(description);
        }
        for field in &self.fields {
            embed = embed.field(&field.name, &field.value, field.inline);
        }
        if let Some(footer) = &self.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        if let Some(color) = self.color {
            embed = embed.color(color);
        }
        embed
    }
}

/// Arguments of one send or edit, before they reach Discord.
#[derive(Clone)]
pub struct OutboundCall {
    pub channel_id: Option<ChannelId>,
    pub content: Option<String>,
    pub embeds: Vec<OutboundEmbed>,
    pub reply_to: Option<ReplyTarget>,
    /// Explicit subject whose language should be used when this is not a reply.
    pub target: Option<u64>,
    /// `false` skips translation entirely.
    pub replace_language: bool,
    pub ephemeral: bool,
    pub view: Option<ViewArg>,
}

impl Default for OutboundCall {
    fn default() -> Self {
        Self {
            channel_id: None,
            content: None,
            embeds: Vec::new(),
            reply_to: None,
            target: None,
            replace_language: true,
            ephemeral: false,
            view: None,
        }
    }
}

impl std::fmt::Debug for OutboundCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundCall")
            .field("channel_id", &self.channel_id)
            .field("content", &self.content)
            .field("embeds", &self.embeds.len())
            .field("reply_to", &self.reply_to)
            .field("target", &self.target)
            .field("replace_language", &self.replace_language)
            .field("view", &self.view.as_ref().map(|v| v.name().to_string()))
            .finish()
    }
}

impl OutboundCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new().content(content)
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embed(mut self, embed: OutboundEmbed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn embeds(mut self, embeds: Vec<OutboundEmbed>) -> Self {
        self.embeds = embeds;
        self
    }

    pub fn reply_to(mut self, author_id: u64, message: Option<(ChannelId, MessageId)>) -> Self {
        self.reply_to = Some(ReplyTarget { author_id, message });
        self
    }

    pub fn target(mut self, subject_id: u64) -> Self {
        self.target = Some(subject_id);
        self
    }

    pub fn replace_language(mut self, replace: bool) -> Self {
        self.replace_language = replace;
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    pub fn view(mut self, view: ViewDescriptor) -> Self {
        self.view = Some(ViewArg::Descriptor(view));
        self
    }

    fn components(&self) -> Option<Vec<CreateActionRow>> {
        match &self.view {
            Some(ViewArg::Live(view)) => Some(view.render()),
            Some(ViewArg::Descriptor(descriptor)) => {
                warn!(
                    "Outbound: view {:?} was never built, sending without components",
                    descriptor.view_name
                );
                None
            }
            None => None,
        }
    }

    fn create_embeds(&self) -> Vec<CreateEmbed> {
        self.embeds.iter().map(OutboundEmbed::to_create_embed).collect()
    }

    pub fn live_view(&self) -> Option<&LiveView> {
        match &self.view {
            Some(ViewArg::Live(view)) => Some(view),
            _ => None,
        }
    }

    pub fn to_create_reply(&self) -> poise::CreateReply {
        let mut reply = poise::CreateReply::default()
            .ephemeral(self.ephemeral)
            .reply(self.reply_to.is_some());
        if let Some(content) = &self.content {
            reply = reply.content(content);
        }
        for embed in self.create_embeds() {
            reply = reply.embed(embed);
        }
        if let Some(components) = self.components() {
            reply = reply.components(components);
        }
        reply
    }

    pub fn to_create_message(&self) -> CreateMessage {
        let mut message = CreateMessage::new().embeds(self.create_embeds());
        if let Some(content) = &self.content {
            message = message.content(content);
        }
        if let Some(reference) = self.reply_to.and_then(|r| r.message) {
            message = message.reference_message(reference);
        }
        if let Some(components) = self.components() {
            message = message.components(components);
        }
        message
    }

    pub fn to_edit_message(&self) -> EditMessage {
        let mut edit = EditMessage::new();
        if let Some(content) = &self.content {
            edit = edit.content(content);
        }
        if !self.embeds.is_empty() {
            edit = edit.embeds(self.create_embeds());
        }
        if let Some(components) = self.components() {
            edit = edit.components(components);
        }
        edit
    }

    pub fn to_interaction_message(&self) -> CreateInteractionResponseMessage {
        let mut message = CreateInteractionResponseMessage::new()
            .ephemeral(self.ephemeral)
            .embeds(self.create_embeds());
        if let Some(content) = &self.content {
            message = message.content(content);
        }
        if let Some(components) = self.components() {
            message = message.components(components);
        }
        message
    }
}

/// Reply to the invoking command through the pipeline.
pub async fn reply(ctx: Context<'_>, mut call: OutboundCall) -> Result<poise::ReplyHandle<'_>, Error> {
    if call.reply_to.is_none() {
        let message = match ctx {
            poise::Context::Prefix(prefix) => Some((prefix.msg.channel_id, prefix.msg.id)),
            poise::Context::Application(_) => None,
        };
        call = call.reply_to(ctx.author().id.get(), message);
    }
    call.channel_id = Some(ctx.channel_id());

    let call = ctx.data().pipeline.run(PipelineEvent::Send, call).await?;
    Ok(ctx.send(call.to_create_reply()).await?)
}

/// Run `call` through the chain for `event`, addressed to `channel_id`.
pub async fn prepare(
    pipeline: &SendPipeline,
    event: PipelineEvent,
    channel_id: ChannelId,
    mut call: OutboundCall,
) -> crate::errors::Result<OutboundCall> {
    call.channel_id = Some(channel_id);
    pipeline.run(event, call).await
}

/// Send to an arbitrary channel through the pipeline. Set `target` on the call to
/// pick whose language it is rendered in.
pub async fn send_message(
    http: &serenity::Http,
    pipeline: &SendPipeline,
    channel_id: ChannelId,
    call: OutboundCall,
) -> Result<serenity::Message, Error> {
    let call = prepare(pipeline, PipelineEvent::Send, channel_id, call).await?;
    Ok(channel_id.send_message(http, call.to_create_message()).await?)
}

/// Edit an existing message through the pipeline's edit chain.
pub async fn edit_message(
    http: &serenity::Http,
    pipeline: &SendPipeline,
    message: &mut serenity::Message,
    call: OutboundCall,
) -> Result<(), Error> {
    let call = prepare(pipeline, PipelineEvent::Edit, message.channel_id, call).await?;
    message.edit(http, call.to_edit_message()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_text_touches_every_text_part() {
        let embed = OutboundEmbed::new()
            .title("t")
            .description("d")
            .field("n", "v", true)
            .footer("f")
            .color(0xff0000)
            .map_text(|s| s.to_uppercase());

        assert_eq!(embed.title.as_deref(), Some("T"));
        assert_eq!(embed.description.as_deref(), Some("D"));
        assert_eq!(
            embed.fields,
            vec![EmbedField {
                name: "N".into(),
                value: "V".into(),
                inline: true
            }]
        );
        assert_eq!(embed.footer.as_deref(), Some("F"));
        assert_eq!(embed.color, Some(0xff0000));
    }

    #[test]
    fn test_map_text_skips_missing_parts() {
        let embed = OutboundEmbed::new().title("only").map_text(|s| format!("<{s}>"));
        assert_eq!(embed.title.as_deref(), Some("<only>"));
        assert!(embed.description.is_none());
        assert!(embed.footer.is_none());
    }

    #[test]
    fn test_create_embed_serializes_rewritten_text() {
        let embed = OutboundEmbed::new().title("Ok").footer("foot").to_create_embed();
        let json = serde_json::to_value(&embed).unwrap();
        assert_eq!(json["title"], "Ok");
        assert_eq!(json["footer"]["text"], "foot");
    }

    #[test]
    fn test_defaults() {
        let call = OutboundCall::text("hi");
        assert!(call.replace_language);
        assert!(call.reply_to.is_none());
        assert!(call.live_view().is_none());
        assert!(call.to_create_reply().content.is_some());
    }
}
