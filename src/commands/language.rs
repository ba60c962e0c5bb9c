use crate::outbound::{self, OutboundCall, OutboundEmbed};
use crate::{Context, Error};
use tracing::info;

/// Change your RT language setting (`ja` or `en`)
#[poise::command(prefix_command, slash_command, aliases("lang"), category = "RT")]
pub async fn language(
    ctx: Context<'_>,
    #[description = "Language code: ja (日本語) or en (English)"] code: String,
) -> Result<(), Error> {
    ctx.defer_or_broadcast().await?;

    let language = ctx
        .data()
        .language
        .preferences()
        .set(ctx.author().id.get(), &code)
        .await?;
    info!("Language: {} switched to {}", ctx.author().name, language);

    let embed = OutboundEmbed::new()
        .title("Ok")
        .color(ctx.data().config.embed_color);
    outbound::reply(ctx, OutboundCall::new().embed(embed)).await?;
    Ok(())
}

/// Reload the translation table (admins only)
#[poise::command(
    prefix_command,
    slash_command,
    check = "is_admin",
    category = "Admin",
    hide_in_help
)]
pub async fn reload_language(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_or_broadcast().await?;
    ctx.data().language.reload().await?;
    info!("Language: table reloaded by {}", ctx.author().name);
    outbound::reply(ctx, OutboundCall::text("Ok")).await?;
    Ok(())
}

async fn is_admin(ctx: Context<'_>) -> Result<bool, Error> {
    Ok(ctx.data().config.is_admin(ctx.author().id.get()))
}
