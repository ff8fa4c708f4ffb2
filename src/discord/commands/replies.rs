// Turns core Replies into Discord messages.
//
// This is the only place that knows how an EmbedPayload maps onto serenity's
// builders, and how the changelog pager is driven with buttons.

use crate::core::commands::{ChannelContext, Reply};
use crate::core::embeds::{EmbedPayload, LinkButton};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;

/// How long the pager keeps listening for button presses.
const PAGE_TIMEOUT: Duration = Duration::from_secs(300);

pub fn channel_context(ctx: Context<'_>) -> ChannelContext {
    let channel_id = ctx.channel_id().get();
    match ctx.guild_id() {
        Some(guild_id) => ChannelContext::Guild {
            guild_id: guild_id.get(),
            channel_id,
        },
        None => ChannelContext::DirectMessage { channel_id },
    }
}

pub fn to_create_embed(payload: &EmbedPayload) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new().color(payload.color);

    if let Some(title) = &payload.title {
        embed = embed.title(title);
    }
    // Discord rejects an empty description outright.
    if let Some(description) = payload.description.as_deref().filter(|d| !d.is_empty()) {
        embed = embed.description(description);
    }
    if let Some(url) = &payload.image_url {
        embed = embed.image(url);
    }
    for field in &payload.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &payload.footer {
        embed = embed.footer(serenity::CreateEmbedFooter::new(footer));
    }

    embed
}

fn link_rows(links: &[LinkButton]) -> Vec<serenity::CreateActionRow> {
    if links.is_empty() {
        return Vec::new();
    }

    vec![serenity::CreateActionRow::Buttons(
        links
            .iter()
            .map(|link| serenity::CreateButton::new_link(&link.url).label(&link.label))
            .collect(),
    )]
}

fn page_buttons(
    prev_id: &str,
    next_id: &str,
    current: usize,
    total: usize,
) -> Vec<serenity::CreateActionRow> {
    if total <= 1 {
        return Vec::new();
    }

    vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(prev_id)
            .label("◀ Previous")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(current == 0),
        serenity::CreateButton::new(next_id)
            .label("Next ▶")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(current + 1 >= total),
    ])]
}

/// Send a reply through the interaction, or straight to the channel when the
/// interaction could not be acknowledged in time.
pub async fn send_reply(ctx: Context<'_>, reply: Reply, interaction_ok: bool) -> Result<(), Error> {
    match reply {
        Reply::Embed {
            embed,
            links,
            ephemeral,
        } => {
            let embed = to_create_embed(&embed);
            let components = link_rows(&links);

            if interaction_ok {
                ctx.send(
                    poise::CreateReply::default()
                        .embed(embed)
                        .components(components)
                        .ephemeral(ephemeral),
                )
                .await?;
            } else {
                ctx.channel_id()
                    .send_message(
                        ctx.http(),
                        serenity::CreateMessage::new()
                            .embed(embed)
                            .components(components),
                    )
                    .await?;
            }
        }
        Reply::Pages { pages, ephemeral } => {
            if interaction_ok {
                paginate(ctx, &pages, ephemeral).await?;
            } else if let Some(first) = pages.first() {
                ctx.channel_id()
                    .send_message(
                        ctx.http(),
                        serenity::CreateMessage::new().embed(to_create_embed(first)),
                    )
                    .await?;
            }
        }
    }

    Ok(())
}

async fn paginate(ctx: Context<'_>, pages: &[EmbedPayload], ephemeral: bool) -> Result<(), Error> {
    let Some(first) = pages.first() else {
        return Ok(());
    };

    // Prefix button ids with the invocation id so parallel pagers don't collide.
    let ctx_id = ctx.id();
    let prev_id = format!("{}prev", ctx_id);
    let next_id = format!("{}next", ctx_id);
    let mut current = 0;

    let handle = ctx
        .send(
            poise::CreateReply::default()
                .embed(to_create_embed(first))
                .components(page_buttons(&prev_id, &next_id, current, pages.len()))
                .ephemeral(ephemeral),
        )
        .await?;

    if pages.len() <= 1 {
        return Ok(());
    }

    while let Some(press) = serenity::ComponentInteractionCollector::new(ctx)
        .filter(move |press| press.data.custom_id.starts_with(&ctx_id.to_string()))
        .timeout(PAGE_TIMEOUT)
        .await
    {
        if press.data.custom_id == next_id {
            current = (current + 1).min(pages.len() - 1);
        } else if press.data.custom_id == prev_id {
            current = current.saturating_sub(1);
        } else {
            continue;
        }

        press
            .create_response(
                ctx.serenity_context(),
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(to_create_embed(&pages[current]))
                        .components(page_buttons(&prev_id, &next_id, current, pages.len())),
                ),
            )
            .await?;
    }

    // Timed out: keep the current page up but drop the dead buttons.
    handle
        .edit(
            ctx,
            poise::CreateReply::default()
                .embed(to_create_embed(&pages[current]))
                .components(Vec::new()),
        )
        .await?;

    Ok(())
}
