// Core: the level lookup pipeline and everything it needs, free of Discord types.
// Lookup -> image relay -> embed rendering, tied together by the command router.

#[path = "levels/level_service.rs"]
pub mod levels;

#[path = "images/image_relay.rs"]
pub mod images;

#[path = "embeds/embed_renderer.rs"]
pub mod embeds;

#[path = "changelogs/changelog_service.rs"]
pub mod changelogs;

#[path = "commands/command_router.rs"]
pub mod commands;
