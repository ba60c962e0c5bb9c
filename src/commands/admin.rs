use crate::outbound::{self, OutboundCall};
use crate::{Context, Error};
use tracing::info;

/// Shut down the bot (Owner only)
#[poise::command(prefix_command, slash_command, owners_only, hide_in_help)]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    info!("Shutdown command received from owner: {}", ctx.author().name);
    outbound::reply(ctx, OutboundCall::text("シャットダウンします...")).await?;
    ctx.data().shutdown();
    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}
