// This is the level lookup module - it owns the domain model for Wonderland levels
// and the rules around looking one up.
// Like the rest of core, there is NO Discord-specific code here. The upstream API
// client lives in infra and plugs in through the LevelSource trait.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Upstream server partition a level lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerRegion {
    Asia,
    Europe,
    America,
    Cht,
}

impl ServerRegion {
    pub const ALL: [ServerRegion; 4] = [
        ServerRegion::Asia,
        ServerRegion::Europe,
        ServerRegion::America,
        ServerRegion::Cht,
    ];

    /// The identifier the upstream API expects in its `region` field.
    pub fn code(&self) -> &'static str {
        match self {
            ServerRegion::Asia => "os_asia",
            ServerRegion::Europe => "os_euro",
            ServerRegion::America => "os_usa",
            ServerRegion::Cht => "os_cht",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServerRegion::Asia => "Asia",
            ServerRegion::Europe => "Europe",
            ServerRegion::America => "America",
            ServerRegion::Cht => "HK/TW/MO",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|region| region.code() == code)
    }
}

impl fmt::Display for ServerRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A level identifier that has passed validation.
///
/// Only numeric GUIDs exist upstream, so anything else is rejected before we
/// spend a network round trip on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Guid(String);

impl Guid {
    pub fn parse(raw: &str) -> Result<Self, LevelError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LevelError::InvalidGuid(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything we know about a level after one upstream lookup.
/// Built fresh for every request and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelRecord {
    pub guid: Guid,
    pub region: ServerRegion,
    pub name: String,
    pub description: String,
    /// Display-ready key/value pairs, in the order they should be shown.
    pub attributes: Vec<(String, String)>,
    /// Source URL of the cover image on the upstream servers.
    pub cover_image: Option<String>,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("Invalid GUID: {0:?}")]
    InvalidGuid(String),

    #[error("Level not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream answered but reported an error of its own. The message is
    /// shown to the user as-is.
    #[error("Upstream rejected the request: {0}")]
    Rejected(String),

    #[error("Could not decode upstream response: {0}")]
    Decode(String),

    #[error("Upstream response has no level information")]
    MissingLevelInfo,
}

impl LevelError {
    /// Stable name used in log entries.
    pub fn kind(&self) -> &'static str {
        match self {
            LevelError::InvalidGuid(_) => "InvalidGuidError",
            LevelError::NotFound(_) => "NotFoundError",
            LevelError::UpstreamUnavailable(_) | LevelError::Rejected(_) => {
                "UpstreamUnavailableError"
            }
            LevelError::Decode(_) | LevelError::MissingLevelInfo => "DecodeError",
        }
    }
}

// ============================================================================
// SOURCE TRAIT (PORT)
// ============================================================================

/// Anything that can resolve a GUID into level metadata.
#[async_trait]
pub trait LevelSource: Send + Sync {
    async fn fetch_level(&self, guid: &Guid, region: ServerRegion)
        -> Result<LevelRecord, LevelError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Validates input and bounds every upstream call with a timeout.
///
/// The service keeps no "current level" around. GUID and region arrive as
/// parameters and the record leaves as a return value, so two invocations can
/// never see each other's data.
pub struct LevelService<S: LevelSource> {
    source: S,
    timeout: Duration,
}

impl<S: LevelSource> LevelService<S> {
    pub fn new(source: S, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub async fn lookup(&self, raw_guid: &str, region: ServerRegion) -> Result<LevelRecord, LevelError> {
        let guid = Guid::parse(raw_guid)?;

        match tokio::time::timeout(self.timeout, self.source.fetch_level(&guid, region)).await {
            Ok(result) => result,
            Err(_) => Err(LevelError::UpstreamUnavailable(format!(
                "level lookup timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source backed by a fixed table of levels.
    struct MockLevelSource {
        levels: DashMap<String, LevelRecord>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl MockLevelSource {
        fn new() -> Self {
            Self {
                levels: DashMap::new(),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn with_level(self, guid: &str, name: &str) -> Self {
            self.levels.insert(
                guid.to_string(),
                LevelRecord {
                    guid: Guid::parse(guid).unwrap(),
                    region: ServerRegion::Asia,
                    name: name.to_string(),
                    description: format!("{} description", name),
                    attributes: Vec::new(),
                    cover_image: None,
                },
            );
            self
        }
    }

    #[async_trait]
    impl LevelSource for MockLevelSource {
        async fn fetch_level(
            &self,
            guid: &Guid,
            region: ServerRegion,
        ) -> Result<LevelRecord, LevelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.levels
                .get(guid.as_str())
                .map(|level| LevelRecord {
                    region,
                    ..level.clone()
                })
                .ok_or_else(|| LevelError::NotFound("Level not found".to_string()))
        }
    }

    #[test]
    fn test_guid_validation() {
        assert!(Guid::parse("1234567890").is_ok());
        assert_eq!(Guid::parse(" 42 ").unwrap().as_str(), "42");
        assert!(matches!(Guid::parse(""), Err(LevelError::InvalidGuid(_))));
        assert!(matches!(Guid::parse("12ab"), Err(LevelError::InvalidGuid(_))));
        assert!(matches!(Guid::parse("-12"), Err(LevelError::InvalidGuid(_))));
    }

    #[test]
    fn test_region_codes_roundtrip() {
        for region in ServerRegion::ALL {
            assert_eq!(ServerRegion::from_code(region.code()), Some(region));
        }
        assert_eq!(ServerRegion::from_code("os_mars"), None);
        assert_eq!(ServerRegion::Cht.display_name(), "HK/TW/MO");
    }

    #[tokio::test]
    async fn test_invalid_guid_never_reaches_upstream() {
        let service = LevelService::new(MockLevelSource::new(), Duration::from_secs(1));

        let result = service.lookup("not-a-guid", ServerRegion::Asia).await;

        assert!(matches!(result, Err(LevelError::InvalidGuid(_))));
        assert_eq!(service.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_consecutive_lookups_do_not_share_state() {
        let source = MockLevelSource::new()
            .with_level("111", "First Level")
            .with_level("222", "Second Level");
        let service = LevelService::new(source, Duration::from_secs(1));

        let first = service.lookup("111", ServerRegion::Asia).await.unwrap();
        let second = service.lookup("222", ServerRegion::Europe).await.unwrap();

        assert_eq!(first.name, "First Level");
        assert_eq!(second.name, "Second Level");
        assert_eq!(second.guid.as_str(), "222");
        assert_eq!(second.region, ServerRegion::Europe);
    }

    #[tokio::test]
    async fn test_unknown_guid_is_not_found() {
        let service = LevelService::new(MockLevelSource::new(), Duration::from_secs(1));

        let result = service.lookup("999", ServerRegion::America).await;

        assert!(matches!(result, Err(LevelError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let mut source = MockLevelSource::new().with_level("111", "Slow Level");
        source.delay = Some(Duration::from_millis(500));
        let service = LevelService::new(source, Duration::from_millis(20));

        let result = service.lookup("111", ServerRegion::Asia).await;

        assert!(matches!(result, Err(LevelError::UpstreamUnavailable(_))));
    }
}
