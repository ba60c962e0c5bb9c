use crate::componesy::{callback, ComponentKind, ComponentStyle, View, ViewArgs, ViewEvent};
use crate::outbound::{self, OutboundCall};
use crate::{Context, Error};
use poise::serenity_prelude::ButtonStyle;
use std::time::Duration;

const VIEW_TIMEOUT: Duration = Duration::from_secs(180);

fn pushed(user_id: u64) -> OutboundCall {
    OutboundCall::text("Pushed button.").target(user_id)
}

async fn push(event: ViewEvent) -> Result<(), Error> {
    event.responder.send(pushed(event.user_id)).await
}

async fn count(event: ViewEvent) -> Result<(), Error> {
    let current: u64 = event
        .message_content
        .rsplit(' ')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);
    event
        .responder
        .edit_origin(OutboundCall::text(format!("カウント: ${}$", current + 1)))
        .await
}

/// Componesy smoke test
#[poise::command(prefix_command, rename = "_componesy_test", hide_in_help)]
pub async fn componesy_test(ctx: Context<'_>) -> Result<(), Error> {
    let view = View::new("TestView")
        .args(ViewArgs {
            owner: Some(ctx.author().id.get()),
            timeout: Some(VIEW_TIMEOUT),
            ..Default::default()
        })
        .add_item(
            ComponentKind::Button,
            "push",
            callback(push),
            ComponentStyle::new().label("Push me!").style(ButtonStyle::Primary),
        )
        .add_item(
            ComponentKind::Button,
            "count",
            callback(count),
            ComponentStyle::new().label("+1"),
        );

    outbound::reply(ctx, OutboundCall::text("カウント: $0$").view(view)).await?;
    Ok(())
}
