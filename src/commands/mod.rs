pub mod admin;
pub mod componesy;
pub mod language;

use crate::errors::RtError;
use crate::outbound::{self, OutboundCall};
use crate::{Data, Error};
use tracing::error;

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        language::language(),
        language::reload_language(),
        componesy::componesy_test(),
        admin::shutdown(),
    ]
}

/// Report user-facing errors back to the invoker; log everything else.
pub async fn on_error(err: poise::FrameworkError<'_, Data, Error>) {
    match err {
        poise::FrameworkError::Command { error, ctx, .. } => {
            let message = match error.downcast_ref::<RtError>() {
                Some(rt) if rt.is_user_facing() => format!("Error: {}", rt),
                _ => {
                    error!("Command {} failed: {:?}", ctx.command().qualified_name, error);
                    "Error: 内部エラーが発生しました。".to_string()
                }
            };
            if let Err(e) = outbound::reply(ctx, OutboundCall::text(message)).await {
                error!("Could not report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}
