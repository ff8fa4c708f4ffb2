//! Platform-agnostic embed payloads and the rules for fitting them into
//! Discord's display limits.
//!
//! The Discord layer converts an [`EmbedPayload`] into a serenity builder at the
//! very last moment, so everything here can be tested without a gateway.

use crate::core::levels::LevelRecord;

pub const TITLE_LIMIT: usize = 256;
pub const DESCRIPTION_LIMIT: usize = 4096;
pub const FIELD_NAME_LIMIT: usize = 256;
pub const FIELD_VALUE_LIMIT: usize = 1024;
pub const FOOTER_LIMIT: usize = 2048;
pub const MAX_FIELDS: usize = 25;
/// Combined limit over title, description, field names/values and footer.
pub const TOTAL_LIMIT: usize = 6000;

pub const TRUNCATION_INDICATOR: &str = "…";

pub const LEVEL_COLOR: u32 = 0x5865F2;
pub const ABOUT_COLOR: u32 = 0xF1C40F;
pub const ERROR_COLOR: u32 = 0xE74C3C;

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A URL button rendered under the embed.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmbedPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: u32,
    pub image_url: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl EmbedPayload {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: Some(title.into()),
            color,
            ..Default::default()
        }
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

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Characters Discord counts against [`TOTAL_LIMIT`].
    pub fn char_count(&self) -> usize {
        let count = |s: &Option<String>| s.as_deref().map_or(0, |s| s.chars().count());
        count(&self.title)
            + count(&self.description)
            + count(&self.footer)
            + self
                .fields
                .iter()
                .map(|f| f.name.chars().count() + f.value.chars().count())
                .sum::<usize>()
    }
}

/// An embed that is guaranteed to fit, plus a note of what had to be cut.
///
/// A non-empty `truncated` list is a notice, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmbed {
    pub embed: EmbedPayload,
    pub truncated: Vec<String>,
}

/// Settings that shape how levels are displayed.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// URL template for the "Open Level" button; `{guid}` and `{region}` are substituted.
    pub share_url_template: Option<String>,
}

/// Shorten `text` to at most `limit` characters, ending with [`TRUNCATION_INDICATOR`].
///
/// Cuts at the last whitespace when that keeps at least three quarters of the
/// budget, otherwise mid-word.
pub fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let indicator_len = TRUNCATION_INDICATOR.chars().count();
    if limit <= indicator_len {
        return TRUNCATION_INDICATOR.chars().take(limit).collect();
    }

    let budget = limit - indicator_len;
    let cut: String = text.chars().take(budget).collect();
    let ends_on_boundary = text.chars().nth(budget).is_some_and(char::is_whitespace);

    let kept = if ends_on_boundary {
        cut.as_str()
    } else {
        let min_keep = budget - budget / 4;
        match cut.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
            Some((idx, _)) if cut[..idx].chars().count() >= min_keep => &cut[..idx],
            _ => cut.as_str(),
        }
    };

    let mut out = kept.trim_end().to_string();
    out.push_str(TRUNCATION_INDICATOR);
    out
}

fn fit(text: String, limit: usize, part: &str, truncated: &mut Vec<String>) -> String {
    if text.chars().count() > limit {
        truncated.push(part.to_string());
        truncate_text(&text, limit)
    } else {
        text
    }
}

/// Bring every part of `embed` within Discord's limits.
pub fn fit_to_limits(mut embed: EmbedPayload) -> RenderedEmbed {
    let mut truncated = Vec::new();

    embed.title = embed
        .title
        .map(|t| fit(t, TITLE_LIMIT, "title", &mut truncated));
    embed.description = embed
        .description
        .map(|d| fit(d, DESCRIPTION_LIMIT, "description", &mut truncated));
    embed.footer = embed
        .footer
        .map(|f| fit(f, FOOTER_LIMIT, "footer", &mut truncated));

    if embed.fields.len() > MAX_FIELDS {
        embed.fields.truncate(MAX_FIELDS);
        truncated.push("fields".to_string());
    }
    for field in &mut embed.fields {
        let label = format!("field:{}", field.name);
        field.name = fit(
            std::mem::take(&mut field.name),
            FIELD_NAME_LIMIT,
            &label,
            &mut truncated,
        );
        field.value = fit(
            std::mem::take(&mut field.value),
            FIELD_VALUE_LIMIT,
            &label,
            &mut truncated,
        );
    }

    // The description is the only free-form part big enough to give way.
    let overflow = embed.char_count().saturating_sub(TOTAL_LIMIT);
    if overflow > 0 {
        if let Some(description) = embed.description.take() {
            let len = description.chars().count();
            let target = len.saturating_sub(overflow);
            embed.description = Some(truncate_text(&description, target));
            truncated.push("total".to_string());
        }
    }
    while embed.char_count() > TOTAL_LIMIT && !embed.fields.is_empty() {
        embed.fields.pop();
        if !truncated.iter().any(|t| t == "fields") {
            truncated.push("fields".to_string());
        }
    }

    RenderedEmbed { embed, truncated }
}

/// Build the reply embed for a level.
pub fn render_level(
    record: &LevelRecord,
    image_url: Option<&str>,
    options: &RenderOptions,
) -> (RenderedEmbed, Vec<LinkButton>) {
    let non_empty = |s: &str| {
        if s.trim().is_empty() {
            "N/A".to_string()
        } else {
            s.to_string()
        }
    };

    let mut embed =
        EmbedPayload::new(non_empty(&record.name), LEVEL_COLOR).description(non_empty(&record.description));
    for (key, value) in &record.attributes {
        embed = embed.field(key.clone(), non_empty(value), true);
    }
    embed.image_url = image_url.map(str::to_string);

    let links = options
        .share_url_template
        .as_deref()
        .map(|template| LinkButton {
            label: "Open Level".to_string(),
            url: template
                .replace("{guid}", record.guid.as_str())
                .replace("{region}", record.region.code()),
        })
        .into_iter()
        .collect();

    (fit_to_limits(embed), links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::levels::{Guid, ServerRegion};

    fn level(description: &str) -> LevelRecord {
        LevelRecord {
            guid: Guid::parse("1234").unwrap(),
            region: ServerRegion::Europe,
            name: "Sky Garden".to_string(),
            description: description.to_string(),
            attributes: vec![
                ("Level ID".to_string(), "1234".to_string()),
                ("Server".to_string(), "Europe".to_string()),
            ],
            cover_image: None,
        }
    }

    #[test]
    fn test_short_text_untouched() {
        assert_eq!(truncate_text("hello world", 20), "hello world");
        assert_eq!(truncate_text("exact", 5), "exact");
    }

    #[test]
    fn test_truncated_text_fits_and_is_marked() {
        let text = "word ".repeat(2000);
        for limit in [2, 10, 57, 256, 1024, 4096] {
            let out = truncate_text(&text, limit);
            assert!(out.chars().count() <= limit, "limit {}", limit);
            assert!(out.ends_with(TRUNCATION_INDICATOR));
        }
    }

    #[test]
    fn test_truncation_prefers_word_boundary() {
        let out = truncate_text("the quick brown fox jumps", 18);
        assert_eq!(out, "the quick brown…");
    }

    #[test]
    fn test_truncation_cuts_mid_word_when_no_boundary_nearby() {
        let out = truncate_text(&"a".repeat(50), 10);
        assert_eq!(out, format!("{}…", "a".repeat(9)));
    }

    #[test]
    fn test_truncation_is_char_safe() {
        let text = "星".repeat(300);
        let out = truncate_text(&text, TITLE_LIMIT);
        assert_eq!(out.chars().count(), TITLE_LIMIT);
        assert!(out.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn test_long_description_is_truncated_with_notice() {
        let (rendered, _) = render_level(&level(&"lorem ipsum ".repeat(600)), None, &RenderOptions::default());

        let description = rendered.embed.description.unwrap();
        assert!(description.chars().count() <= DESCRIPTION_LIMIT);
        assert!(description.ends_with(TRUNCATION_INDICATOR));
        assert!(rendered.truncated.contains(&"description".to_string()));
    }

    #[test]
    fn test_regular_level_renders_without_notice() {
        let (rendered, links) = render_level(
            &level("A calm garden above the clouds."),
            Some("https://cdn.example/1234.png"),
            &RenderOptions::default(),
        );

        assert!(rendered.truncated.is_empty());
        assert!(links.is_empty());
        assert_eq!(rendered.embed.title.as_deref(), Some("Sky Garden"));
        assert_eq!(rendered.embed.image_url.as_deref(), Some("https://cdn.example/1234.png"));
        assert_eq!(rendered.embed.fields.len(), 2);
        assert!(rendered.embed.fields.iter().all(|f| f.inline));
    }

    #[test]
    fn test_empty_values_show_placeholder() {
        let mut record = level("");
        record.name = "  ".to_string();
        let (rendered, _) = render_level(&record, None, &RenderOptions::default());

        assert_eq!(rendered.embed.title.as_deref(), Some("N/A"));
        assert_eq!(rendered.embed.description.as_deref(), Some("N/A"));
        assert_eq!(rendered.embed.image_url, None);
    }

    #[test]
    fn test_total_limit_enforced() {
        let mut embed = EmbedPayload::new("Big", LEVEL_COLOR).description("d".repeat(4000));
        for i in 0..10 {
            embed = embed.field(format!("Field {}", i), "v".repeat(1000), false);
        }

        let rendered = fit_to_limits(embed);

        assert!(rendered.embed.char_count() <= TOTAL_LIMIT);
        assert!(!rendered.truncated.is_empty());
    }

    #[test]
    fn test_field_count_capped() {
        let mut embed = EmbedPayload::new("Many", LEVEL_COLOR);
        for i in 0..30 {
            embed = embed.field(format!("{}", i), "x", true);
        }

        let rendered = fit_to_limits(embed);

        assert_eq!(rendered.embed.fields.len(), MAX_FIELDS);
        assert!(rendered.truncated.contains(&"fields".to_string()));
    }

    #[test]
    fn test_share_button_substitutes_placeholders() {
        let options = RenderOptions {
            share_url_template: Some("https://share.example/?id={guid}&r={region}".to_string()),
        };
        let (_, links) = render_level(&level("desc"), None, &options);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://share.example/?id=1234&r=os_euro");
    }
}
