//! Componesy: declarative message components.
//!
//! ```ignore
//! let view = View::new("TestView")
//!     .add_item(ComponentKind::Button, "push", callback(push), ComponentStyle::new().label("Push me!"));
//! outbound::reply(ctx, OutboundCall::text("test").view(view)).await?;
//! ```
//!
//! The descriptor is turned into a `ViewTemplate` once per view name by the `ViewBuilder`
//! interceptor; every later send with the same name reuses that template.

pub mod builder;

use crate::errors::{Result, RtError};
use crate::outbound::{self, OutboundCall, PipelineEvent, SendPipeline};
use crate::Error;
use poise::serenity_prelude as serenity;
use serenity::{
    ButtonStyle, ComponentInteraction, CreateButton, CreateInteractionResponse,
    CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use builder::{RouteOutcome, ViewBuilder, ViewTemplate};

/// Alias kept for callers used to the `View` name.
pub type View = ViewDescriptor;

pub type Callback = Arc<dyn Fn(ViewEvent) -> poise::BoxFuture<'static, std::result::Result<(), Error>> + Send + Sync>;

/// Wrap any async function or closure into a `Callback`.
///
/// Every wrapper owns its own `f`, so callbacks built in a loop never alias each other.
pub fn callback<F, Fut>(f: F) -> Callback
where
    F: Fn(ViewEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), Error>> + Send + 'static,
{
    Arc::new(move |event| -> poise::BoxFuture<'static, std::result::Result<(), Error>> {
        Box::pin(f(event))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Button,
    SelectMenu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    pub description: Option<String>,
}

/// Styling passed through to the built component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentStyle {
    pub label: Option<String>,
    pub style: Option<ButtonStyle>,
    pub emoji: Option<char>,
    pub disabled: bool,
    pub placeholder: Option<String>,
    pub options: Vec<SelectOption>,
    pub min_values: Option<u8>,
    pub max_values: Option<u8>,
}

impl ComponentStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn emoji(mut self, emoji: char) -> Self {
        self.emoji = Some(emoji);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn option(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(SelectOption {
            label: label.into(),
            value: value.into(),
            description: None,
        });
        self
    }

    pub fn described_option(
        mut self,
        label: impl Into<String>,
        value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.options.push(SelectOption {
            label: label.into(),
            value: value.into(),
            description: Some(description.into()),
        });
        self
    }

    pub fn values(mut self, min: u8, max: u8) -> Self {
        self.min_values = Some(min);
        self.max_values = Some(max);
        self
    }
}

/// What to build, before it is bound to a callback.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDescriptor {
    pub kind: ComponentKind,
    pub style: ComponentStyle,
}

impl ComponentDescriptor {
    pub fn bind(self, name: impl Into<String>, callback: Callback) -> BoundComponent {
        BoundComponent {
            name: name.into(),
            descriptor: self,
            callback,
        }
    }
}

pub enum RenderedComponent {
    Button(CreateButton),
    SelectMenu(CreateSelectMenu),
}

/// A component with its callback attached.
#[derive(Clone)]
pub struct BoundComponent {
    pub name: String,
    pub descriptor: ComponentDescriptor,
    callback: Callback,
}

impl BoundComponent {
    pub fn render(&self, custom_id: String, force_disabled: bool) -> RenderedComponent {
        let style = &self.descriptor.style;
        let disabled = style.disabled || force_disabled;
        match self.descriptor.kind {
            ComponentKind::Button => {
                let mut button = CreateButton::new(custom_id)
                    .style(style.style.unwrap_or(ButtonStyle::Secondary))
                    .disabled(disabled);
                if let Some(label) = &style.label {
                    button = button.label(label);
                }
                if let Some(emoji) = style.emoji {
                    button = button.emoji(emoji);
                }
                RenderedComponent::Button(button)
            }
            ComponentKind::SelectMenu => {
                let options = style
                    .options
                    .iter()
                    .map(|option| {
                        let mut built = CreateSelectMenuOption::new(&option.label, &option.value);
                        if let Some(description) = &option.description {
                            built = built.description(description);
                        }
                        built
                    })
                    .collect();
                let mut menu = CreateSelectMenu::new(custom_id, CreateSelectMenuKind::String { options })
                    .disabled(disabled);
                if let Some(placeholder) = &style.placeholder {
                    menu = menu.placeholder(placeholder);
                }
                if let Some(min) = style.min_values {
                    menu = menu.min_values(min);
                }
                if let Some(max) = style.max_values {
                    menu = menu.max_values(max);
                }
                RenderedComponent::SelectMenu(menu)
            }
        }
    }

    pub async fn invoke(&self, event: ViewEvent) -> std::result::Result<(), Error> {
        (self.callback)(event).await
    }
}

/// One declared entry of a view.
#[derive(Clone)]
pub struct ViewItem {
    pub name: String,
    pub component: ComponentDescriptor,
    pub callback: Callback,
}

impl std::fmt::Debug for ViewItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewItem")
            .field("name", &self.name)
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

/// Build a `ViewItem`.
pub fn item(kind: ComponentKind, name: impl Into<String>, callback: Callback, style: ComponentStyle) -> ViewItem {
    ViewItem {
        name: name.into(),
        component: ComponentDescriptor { kind, style },
        callback,
    }
}

/// Per-instance construction arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewArgs {
    /// Only this user may use the components.
    pub owner: Option<u64>,
    /// Render every component disabled.
    pub disabled: bool,
    /// Components stop answering once this much time has passed since the send.
    pub timeout: Option<Duration>,
}

/// A named, declarative list of components. The name is the cache key, so it must not
/// change between calls that should share a template.
#[derive(Debug, Clone)]
pub struct ViewDescriptor {
    pub view_name: String,
    pub items: Vec<ViewItem>,
    pub args: ViewArgs,
}

impl ViewDescriptor {
    pub fn new(view_name: impl Into<String>) -> Self {
        Self {
            view_name: view_name.into(),
            items: Vec::new(),
            args: ViewArgs::default(),
        }
    }

    pub fn args(mut self, args: ViewArgs) -> Self {
        self.args = args;
        self
    }

    pub fn add_item(
        mut self,
        kind: ComponentKind,
        name: impl Into<String>,
        callback: Callback,
        style: ComponentStyle,
    ) -> Self {
        self.items.push(item(kind, name, callback, style));
        self
    }

    /// Remove the first item registered under `name`.
    pub fn remove_item(&mut self, name: &str) -> Result<ViewItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.name == name)
            .ok_or_else(|| RtError::CallbackNotFound(name.to_string()))?;
        Ok(self.items.remove(index))
    }

    pub fn item_names(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.name.as_str()).collect()
    }
}

/// Build a `ViewDescriptor` from already constructed items.
pub fn make_view(view_name: impl Into<String>, items: Vec<ViewItem>) -> ViewDescriptor {
    ViewDescriptor {
        view_name: view_name.into(),
        items,
        args: ViewArgs::default(),
    }
}

/// A template instantiated with its construction args; this is what gets rendered.
#[derive(Clone)]
pub struct LiveView {
    template: Arc<ViewTemplate>,
    args: ViewArgs,
    /// Unix seconds after which the components are dead.
    expires_at: Option<u64>,
}

impl LiveView {
    pub fn new(template: Arc<ViewTemplate>, args: ViewArgs) -> Self {
        let expires_at = args
            .timeout
            .map(|timeout| builder::unix_now().saturating_add(timeout.as_secs()));
        Self {
            template,
            args,
            expires_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn args(&self) -> ViewArgs {
        self.args
    }

    pub fn template(&self) -> &Arc<ViewTemplate> {
        &self.template
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    pub fn custom_id(&self, index: usize) -> String {
        self.template.custom_id(index, self.args.owner, self.expires_at)
    }

    /// Whether every custom id stays within Discord's length limit.
    pub fn custom_ids_fit(&self) -> bool {
        (0..self.template.len()).all(|index| self.custom_id(index).len() <= builder::MAX_CUSTOM_ID_LEN)
    }

    pub fn render(&self) -> Vec<serenity::CreateActionRow> {
        self.template.render(self.args, self.expires_at)
    }
}

/// The `view` argument of an outbound call.
#[derive(Clone)]
pub enum ViewArg {
    Descriptor(ViewDescriptor),
    Live(LiveView),
}

impl ViewArg {
    pub fn name(&self) -> &str {
        match self {
            ViewArg::Descriptor(descriptor) => &descriptor.view_name,
            ViewArg::Live(view) => view.name(),
        }
    }
}

/// Answers the interaction that triggered a callback.
#[derive(Clone)]
pub struct Responder {
    inner: Option<(Arc<serenity::Http>, Arc<SendPipeline>, ComponentInteraction)>,
}

impl Responder {
    pub fn new(http: Arc<serenity::Http>, pipeline: Arc<SendPipeline>, interaction: ComponentInteraction) -> Self {
        Self {
            inner: Some((http, pipeline, interaction)),
        }
    }

    /// A responder with no interaction behind it. Responses are dropped.
    pub fn detached() -> Self {
        Self { inner: None }
    }

    /// Answer the interaction with a new message, translated for whoever pressed the component.
    pub async fn respond(&self, mut call: OutboundCall) -> std::result::Result<(), Error> {
        let Some((http, pipeline, interaction)) = &self.inner else {
            debug!("Componesy: detached responder dropped {:?}", call);
            return Ok(());
        };

        if call.reply_to.is_none() {
            call = call.reply_to(interaction.user.id.get(), None);
        }
        call.channel_id = Some(interaction.channel_id);
        let call = pipeline.run(PipelineEvent::Send, call).await?;

        let response = CreateInteractionResponse::Message(call.to_interaction_message());
        interaction.create_response(http, response).await?;
        Ok(())
    }

    /// Tell Discord the interaction was handled without answering it.
    pub async fn acknowledge(&self) -> std::result::Result<(), Error> {
        if let Some((http, _, interaction)) = &self.inner {
            interaction
                .create_response(http, CreateInteractionResponse::Acknowledge)
                .await?;
        }
        Ok(())
    }

    /// Post a plain message in the interaction's channel.
    pub async fn send(&self, call: OutboundCall) -> std::result::Result<(), Error> {
        let Some((http, pipeline, interaction)) = &self.inner else {
            debug!("Componesy: detached responder dropped {:?}", call);
            return Ok(());
        };
        self.acknowledge().await?;
        outbound::send_message(http, pipeline, interaction.channel_id, call).await?;
        Ok(())
    }

    /// Edit the message the component is attached to.
    pub async fn edit_origin(&self, call: OutboundCall) -> std::result::Result<(), Error> {
        let Some((http, pipeline, interaction)) = &self.inner else {
            debug!("Componesy: detached responder dropped {:?}", call);
            return Ok(());
        };
        self.acknowledge().await?;
        let mut message = (*interaction.message).clone();
        outbound::edit_message(http, pipeline, &mut message, call).await
    }
}

/// Everything a callback gets to know about the interaction.
#[derive(Clone)]
pub struct ViewEvent {
    pub view_name: String,
    pub item_name: String,
    pub custom_id: String,
    pub user_id: u64,
    pub values: Vec<String>,
    pub message_content: String,
    pub responder: Responder,
}

impl ViewEvent {
    pub fn from_interaction(interaction: &ComponentInteraction, responder: Responder) -> Self {
        let values = match &interaction.data.kind {
            serenity::ComponentInteractionDataKind::StringSelect { values } => values.clone(),
            _ => Vec::new(),
        };
        Self {
            view_name: String::new(),
            item_name: String::new(),
            custom_id: interaction.data.custom_id.clone(),
            user_id: interaction.user.id.get(),
            values,
            message_content: interaction.message.content.clone(),
            responder,
        }
    }

    pub fn detached(custom_id: impl Into<String>, user_id: u64) -> Self {
        Self {
            view_name: String::new(),
            item_name: String::new(),
            custom_id: custom_id.into(),
            user_id,
            values: Vec::new(),
            message_content: String::new(),
            responder: Responder::detached(),
        }
    }
}
