use crate::discord::{Context, Error};

/// Register or remove slash commands, globally or in this guild. Owners only.
#[poise::command(prefix_command, owners_only, hide_in_help)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    tracing::info!(user = ctx.author().id.get(), "Command sync requested");
    poise::builtins::register_application_commands_buttons(ctx).await?;
    Ok(())
}
