// Framework-level error hook.
//
// Command bodies never return domain errors (the router turns those into
// replies), so what reaches this hook is Discord transport failures, panics,
// and interactions for commands we don't know.

use crate::core::commands::{error_reply, ChannelContext, CommandInvocation, Reply};
use crate::discord::commands::replies::{send_reply, to_create_embed};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

const GENERIC_FAILURE: &str = "Something went wrong while running this command.";

pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                kind = "CommandError",
                "Command failed: {}",
                error
            );
            if let Err(e) = send_reply(ctx, error_reply(GENERIC_FAILURE), true).await {
                tracing::warn!("Could not deliver error reply: {}", e);
            }
        }
        poise::FrameworkError::CommandPanic { payload, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                kind = "CommandPanic",
                "Command panicked: {}",
                payload.as_deref().unwrap_or("<no payload>")
            );
            if let Err(e) = send_reply(ctx, error_reply(GENERIC_FAILURE), true).await {
                tracing::warn!("Could not deliver error reply: {}", e);
            }
        }
        poise::FrameworkError::UnknownInteraction {
            ctx,
            framework,
            interaction,
            ..
        } => {
            // Stale registrations can still deliver commands we removed; let the
            // router answer (and log) them like any other unknown command.
            let invocation =
                CommandInvocation::new(interaction.data.name.clone(), interaction_channel(interaction));
            let reply = framework.user_data.router.dispatch(invocation).await;

            if let Reply::Embed {
                embed, ephemeral, ..
            } = reply
            {
                let response = serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(to_create_embed(&embed))
                        .ephemeral(ephemeral),
                );
                if let Err(e) = interaction.create_response(ctx, response).await {
                    tracing::warn!("Could not answer unknown interaction: {}", e);
                }
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

fn interaction_channel(interaction: &serenity::CommandInteraction) -> ChannelContext {
    let channel_id = interaction.channel_id.get();
    match interaction.guild_id {
        Some(guild_id) => ChannelContext::Guild {
            guild_id: guild_id.get(),
            channel_id,
        },
        None => ChannelContext::DirectMessage { channel_id },
    }
}
