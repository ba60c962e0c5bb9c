use crate::componesy::{
    BoundComponent, LiveView, RenderedComponent, Responder, ViewArg, ViewArgs, ViewDescriptor,
    ViewEvent,
};
use crate::errors::Result;
use crate::outbound::{Interceptor, OutboundCall, PipelineEvent, SendPipeline};
use crate::Error;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::{ComponentInteraction, CreateActionRow, CreateButton};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const MAX_BUTTONS_PER_ROW: usize = 5;
const MAX_ROWS: usize = 5;
pub const MAX_CUSTOM_ID_LEN: usize = 100;

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// A view name's components, built once and shared by every instance.
pub struct ViewTemplate {
    pub name: String,
    components: Vec<BoundComponent>,
}

impl ViewTemplate {
    fn from_descriptor(descriptor: &ViewDescriptor) -> Self {
        let components = descriptor
            .items
            .iter()
            .map(|item| item.component.clone().bind(&item.name, item.callback.clone()))
            .collect();
        Self {
            name: descriptor.view_name.clone(),
            components,
        }
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// `name:index:owner:expiry`; owner and expiry are left empty when unset.
    pub fn custom_id(&self, index: usize, owner: Option<u64>, expires_at: Option<u64>) -> String {
        let owner = owner.map(|id| id.to_string()).unwrap_or_default();
        let expiry = expires_at.map(|at| at.to_string()).unwrap_or_default();
        format!("{}:{}:{}:{}", self.name, index, owner, expiry)
    }

    pub fn render(&self, args: ViewArgs, expires_at: Option<u64>) -> Vec<CreateActionRow> {
        let mut rows = Vec::new();
        let mut buttons: Vec<CreateButton> = Vec::new();

        for (index, component) in self.components.iter().enumerate() {
            let custom_id = self.custom_id(index, args.owner, expires_at);
            match component.render(custom_id, args.disabled) {
                RenderedComponent::Button(button) => {
                    if buttons.len() == MAX_BUTTONS_PER_ROW {
                        rows.push(CreateActionRow::Buttons(std::mem::take(&mut buttons)));
                    }
                    buttons.push(button);
                }
                RenderedComponent::SelectMenu(menu) => {
                    if !buttons.is_empty() {
                        rows.push(CreateActionRow::Buttons(std::mem::take(&mut buttons)));
                    }
                    rows.push(CreateActionRow::SelectMenu(menu));
                }
            }
        }
        if !buttons.is_empty() {
            rows.push(CreateActionRow::Buttons(buttons));
        }

        if rows.len() > MAX_ROWS {
            warn!("Componesy: view {} has {} rows, dropping the extra ones", self.name, rows.len());
            rows.truncate(MAX_ROWS);
        }
        rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Handled,
    /// Not one of ours, or built by a previous process.
    Unknown,
    /// Someone other than the view's owner pressed it.
    NotOwner,
    /// The view's timeout has passed.
    Expired,
}

struct ParsedId<'a> {
    view_name: &'a str,
    index: usize,
    owner: Option<u64>,
    expires_at: Option<u64>,
}

fn parse_optional_id(raw: &str) -> Option<Option<u64>> {
    if raw.is_empty() {
        Some(None)
    } else {
        raw.parse().ok().map(Some)
    }
}

fn parse_custom_id(custom_id: &str) -> Option<ParsedId<'_>> {
    let mut parts = custom_id.rsplitn(4, ':');
    let expires_at = parse_optional_id(parts.next()?)?;
    let owner = parse_optional_id(parts.next()?)?;
    let index = parts.next()?.parse().ok()?;
    let view_name = parts.next()?;
    Some(ParsedId {
        view_name,
        index,
        owner,
        expires_at,
    })
}

/// Turns view descriptors into live views and routes component interactions back to them.
#[derive(Default)]
pub struct ViewBuilder {
    templates: RwLock<HashMap<String, Arc<ViewTemplate>>>,
}

impl ViewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.templates.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn template(&self, view_name: &str) -> Option<Arc<ViewTemplate>> {
        self.templates
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(view_name)
            .cloned()
    }

    /// Instantiate `descriptor`. The first descriptor seen for a name defines its template;
    /// later ones only contribute their construction args.
    pub fn build(&self, descriptor: ViewDescriptor) -> LiveView {
        let live = LiveView::new(self.template_for(&descriptor), descriptor.args);
        if !live.custom_ids_fit() {
            warn!(
                "Componesy: custom ids of view {:?} exceed {} characters, Discord will reject them",
                live.name(),
                MAX_CUSTOM_ID_LEN
            );
        }
        live
    }

    fn template_for(&self, descriptor: &ViewDescriptor) -> Arc<ViewTemplate> {
        if let Some(template) = self.template(&descriptor.view_name) {
            if template.component_names() != descriptor.item_names() {
                warn!(
                    "Componesy: view {:?} is already built with {:?}, ignoring {:?}",
                    descriptor.view_name,
                    template.component_names(),
                    descriptor.item_names()
                );
            }
            return template;
        }

        let mut templates = self.templates.write().unwrap_or_else(|e| e.into_inner());
        templates
            .entry(descriptor.view_name.clone())
            .or_insert_with(|| {
                debug!(
                    "Componesy: building view {:?} with {} items",
                    descriptor.view_name,
                    descriptor.items.len()
                );
                Arc::new(ViewTemplate::from_descriptor(descriptor))
            })
            .clone()
    }

    /// Run the callback behind `event.custom_id`.
    pub async fn route(&self, mut event: ViewEvent) -> std::result::Result<RouteOutcome, Error> {
        let Some(parsed) = parse_custom_id(&event.custom_id) else {
            return Ok(RouteOutcome::Unknown);
        };
        let Some(template) = self.template(parsed.view_name) else {
            debug!("Componesy: no template for {:?}", event.custom_id);
            return Ok(RouteOutcome::Unknown);
        };
        let Some(component) = template.components.get(parsed.index) else {
            return Ok(RouteOutcome::Unknown);
        };
        if parsed.expires_at.is_some_and(|at| at <= unix_now()) {
            debug!("Componesy: {:?} has expired", event.custom_id);
            return Ok(RouteOutcome::Expired);
        }
        if parsed.owner.is_some_and(|owner| owner != event.user_id) {
            return Ok(RouteOutcome::NotOwner);
        }

        event.view_name = template.name.clone();
        event.item_name = component.name.clone();
        component.invoke(event).await?;
        Ok(RouteOutcome::Handled)
    }

    pub async fn handle_interaction(
        &self,
        ctx: &serenity::Context,
        interaction: &ComponentInteraction,
        pipeline: Arc<SendPipeline>,
    ) -> std::result::Result<RouteOutcome, Error> {
        let responder = Responder::new(ctx.http.clone(), pipeline, interaction.clone());
        let event = ViewEvent::from_interaction(interaction, responder.clone());
        let outcome = self.route(event).await?;

        let notice = match outcome {
            RouteOutcome::NotOwner => Some("このボタンはあなたのものではありません。"),
            RouteOutcome::Expired => Some("このボタンは期限切れです。"),
            RouteOutcome::Handled | RouteOutcome::Unknown => None,
        };
        if let Some(notice) = notice {
            responder
                .respond(OutboundCall::text(notice).ephemeral(true))
                .await?;
        }
        Ok(outcome)
    }
}

#[async_trait]
impl Interceptor for ViewBuilder {
    fn name(&self) -> &str {
        "componesy"
    }

    async fn intercept(&self, _event: PipelineEvent, mut call: OutboundCall) -> Result<OutboundCall> {
        call.view = match call.view.take() {
            Some(ViewArg::Descriptor(descriptor)) => Some(ViewArg::Live(self.build(descriptor))),
            other => other,
        };
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::componesy::{callback, Callback, ComponentKind, ComponentStyle, View};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting(counter: &Arc<AtomicUsize>) -> Callback {
        let counter = counter.clone();
        callback(move |_event| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), Error>(())
            }
        })
    }

    fn button(view: View, name: &str, cb: Callback) -> View {
        view.add_item(ComponentKind::Button, name, cb, ComponentStyle::new().label(name))
    }

    #[test]
    fn test_parse_custom_id() {
        let parsed = parse_custom_id("a:b:3::").unwrap();
        assert_eq!(parsed.view_name, "a:b");
        assert_eq!(parsed.index, 3);
        assert_eq!(parsed.owner, None);
        assert_eq!(parsed.expires_at, None);

        let parsed = parse_custom_id("View:0:42:1700000000").unwrap();
        assert_eq!(parsed.owner, Some(42));
        assert_eq!(parsed.expires_at, Some(1_700_000_000));

        assert!(parse_custom_id("confirm_tool").is_none());
        assert!(parse_custom_id("View:0:").is_none());
        assert!(parse_custom_id("View:x::").is_none());
        assert!(parse_custom_id("View:0:abc:").is_none());
        assert!(parse_custom_id("View:0::soon").is_none());
    }

    #[tokio::test]
    async fn test_each_callback_keeps_its_own_target() {
        let builder = ViewBuilder::new();
        let counters: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();

        let mut view = View::new("Counters");
        for (i, counter) in counters.iter().enumerate() {
            view = button(view, &format!("b{i}"), counting(counter));
        }
        builder.build(view);

        let outcome = builder.route(ViewEvent::detached("Counters:1::", 9)).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Handled);
        builder.route(ViewEvent::detached("Counters:0::", 9)).await.unwrap();
        builder.route(ViewEvent::detached("Counters:1::", 9)).await.unwrap();

        let counts: Vec<usize> = counters.iter().map(|c| c.load(Ordering::SeqCst)).collect();
        assert_eq!(counts, vec![1, 2, 0]);
    }

    #[tokio::test]
    async fn test_same_name_reuses_first_template() {
        let builder = ViewBuilder::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let a = builder.build(button(View::new("X"), "first", counting(&first)));
        let b = builder.build(
            button(View::new("X"), "second", counting(&second))
                .args(ViewArgs { owner: Some(5), ..Default::default() }),
        );

        assert!(Arc::ptr_eq(a.template(), b.template()));
        assert_eq!(b.template().component_names(), vec!["first"]);
        assert_eq!(b.args().owner, Some(5));
        assert_eq!(builder.len(), 1);

        builder.route(ViewEvent::detached("X:0:5:", 5)).await.unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_owner_restriction_and_unknown_ids() {
        let builder = ViewBuilder::new();
        let counter = Arc::new(AtomicUsize::new(0));
        builder.build(button(View::new("Mine"), "only", counting(&counter)));

        let outcome = builder.route(ViewEvent::detached("Mine:0:1:", 2)).await.unwrap();
        assert_eq!(outcome, RouteOutcome::NotOwner);
        let outcome = builder.route(ViewEvent::detached("Mine:7::", 2)).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Unknown);
        let outcome = builder.route(ViewEvent::detached("Other:0::", 2)).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Unknown);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_callback_sees_item_and_view_names() {
        let builder = ViewBuilder::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb = callback(move |event: ViewEvent| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push((event.view_name, event.item_name, event.user_id));
                Ok::<(), Error>(())
            }
        });
        builder.build(button(View::new("Named"), "push", cb));
        builder.route(ViewEvent::detached("Named:0::", 3)).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("Named".to_string(), "push".to_string(), 3)]
        );
    }

    #[tokio::test]
    async fn test_callback_error_propagates() {
        let builder = ViewBuilder::new();
        let cb = callback(|_event| async { Err::<(), Error>("nope".into()) });
        builder.build(button(View::new("Broken"), "fail", cb));
        assert!(builder.route(ViewEvent::detached("Broken:0::", 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_interceptor_swaps_descriptor_for_live_view() {
        let builder = ViewBuilder::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let call = OutboundCall::text("test").view(button(View::new("TestView"), "push", counting(&counter)));

        let call = builder.intercept(PipelineEvent::Send, call).await.unwrap();
        let live = call.live_view().expect("view should be built");
        assert_eq!(live.name(), "TestView");
        assert_eq!(live.render().len(), 1);

        let call = builder
            .intercept(PipelineEvent::Edit, OutboundCall::text("no view"))
            .await
            .unwrap();
        assert!(call.view.is_none());
    }

    #[test]
    fn test_render_groups_buttons_into_rows() {
        let builder = ViewBuilder::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut view = View::new("Grid");
        for i in 0..7 {
            view = button(view, &format!("b{i}"), counting(&counter));
        }
        view = view.add_item(
            ComponentKind::SelectMenu,
            "pick",
            counting(&counter),
            ComponentStyle::new().option("a", "a"),
        );

        let live = builder.build(view);
        // 5 buttons, 2 buttons, then the select menu on its own row
        assert_eq!(live.render().len(), 3);
        assert_eq!(live.custom_id(2), "Grid:2::");
    }

    #[tokio::test]
    async fn test_expired_view_never_runs_callback() {
        let builder = ViewBuilder::new();
        let counter = Arc::new(AtomicUsize::new(0));
        builder.build(button(View::new("Timed"), "push", counting(&counter)));

        let outcome = builder.route(ViewEvent::detached("Timed:0::1", 1)).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Expired);
        // expiry wins over the owner check
        let outcome = builder.route(ViewEvent::detached("Timed:0:7:1", 1)).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Expired);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let later = unix_now() + 3600;
        let outcome = builder
            .route(ViewEvent::detached(format!("Timed:0::{later}"), 1))
            .await
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Handled);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_timeout_is_written_into_custom_ids() {
        let builder = ViewBuilder::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let before = unix_now();
        let live = builder.build(button(View::new("Timed"), "push", counting(&counter)).args(ViewArgs {
            owner: Some(9),
            timeout: Some(Duration::from_secs(180)),
            ..Default::default()
        }));

        let expires_at = live.expires_at().unwrap();
        assert!(expires_at >= before + 180 && expires_at <= unix_now() + 180);
        let custom_id = live.custom_id(0);
        let parsed = parse_custom_id(&custom_id).unwrap();
        assert_eq!(parsed.owner, Some(9));
        assert_eq!(parsed.expires_at, Some(expires_at));

        let untimed = builder.build(button(View::new("Timed"), "push", counting(&counter)));
        assert_eq!(untimed.expires_at(), None);
    }

    #[test]
    fn test_custom_id_length_limit() {
        let builder = ViewBuilder::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let args = ViewArgs {
            owner: Some(876_543_210_987_654_321),
            timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let short = builder.build(button(View::new("Short"), "push", counting(&counter)).args(args));
        assert!(short.custom_ids_fit());

        let long_name = "V".repeat(70);
        let long = builder.build(button(View::new(long_name), "push", counting(&counter)).args(args));
        assert!(long.custom_id(0).len() > MAX_CUSTOM_ID_LEN);
        assert!(!long.custom_ids_fit());
    }
}
