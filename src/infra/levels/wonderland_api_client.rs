use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::levels::{Guid, LevelError, LevelRecord, LevelSource, ServerRegion};

/// Endpoint and request body the upstream level API expects.
/// `level_id` and `region` are filled in per request.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadTemplate {
    pub url: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl PayloadTemplate {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// HTTP client for the Wonderland level detail API.
pub struct WonderlandApiClient {
    client: Client,
    template: PayloadTemplate,
}

impl WonderlandApiClient {
    pub fn new(template: PayloadTemplate, timeout: Duration) -> Result<Self, LevelError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("WonderlandExplorer/1.0")
            .build()
            .map_err(|e| LevelError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self { client, template })
    }

    fn build_payload(&self, guid: &Guid, region: ServerRegion) -> Value {
        let mut payload = self.template.payload.clone();
        payload.insert("level_id".to_string(), Value::String(guid.to_string()));
        payload.insert("region".to_string(), Value::String(region.code().to_string()));
        Value::Object(payload)
    }
}

#[async_trait]
impl LevelSource for WonderlandApiClient {
    async fn fetch_level(
        &self,
        guid: &Guid,
        region: ServerRegion,
    ) -> Result<LevelRecord, LevelError> {
        let resp = self
            .client
            .post(&self.template.url)
            .json(&self.build_payload(guid, region))
            .send()
            .await
            .map_err(|e| LevelError::UpstreamUnavailable(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            return Err(LevelError::UpstreamUnavailable(format!(
                "level API returned {}",
                resp.status()
            )));
        }

        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| LevelError::Decode(e.to_string()))?;

        parse_level_response(body, guid, region)
    }
}

fn parse_level_response(
    body: ApiResponse,
    guid: &Guid,
    region: ServerRegion,
) -> Result<LevelRecord, LevelError> {
    if body.retcode != Some(0) {
        return Err(LevelError::Rejected(
            body.message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }

    // The outer call can succeed while the nested level lookup fails.
    let detail = body
        .data
        .and_then(|d| d.resp_map)
        .and_then(|m| m.level_detail);
    let detail = match detail {
        Some(detail) if detail.retcode.unwrap_or(0) == 0 && detail.data.is_some() => detail,
        Some(detail) => {
            return Err(LevelError::NotFound(
                detail
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Level not found".to_string()),
            ))
        }
        None => return Err(LevelError::NotFound("Level not found".to_string())),
    };

    let info = detail
        .data
        .and_then(|d| d.level_detail_response)
        .and_then(|r| r.level_info)
        .ok_or(LevelError::MissingLevelInfo)?;

    let level_id = info
        .level_id
        .as_ref()
        .and_then(scalar_to_string)
        .unwrap_or_else(|| guid.to_string());

    let mut attributes = vec![
        ("Level ID".to_string(), level_id),
        ("Server".to_string(), region.display_name().to_string()),
    ];
    let mut extra: Vec<(&String, String)> = info
        .extra
        .iter()
        .filter_map(|(key, value)| {
            scalar_to_string(value)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        })
        .collect();
    extra.sort_by(|a, b| a.0.cmp(b.0));
    // Keys like "__" humanize to nothing, and Discord rejects unnamed fields.
    attributes.extend(extra.into_iter().filter_map(|(key, value)| {
        let name = humanize_key(key);
        (!name.is_empty()).then_some((name, value))
    }));

    Ok(LevelRecord {
        guid: guid.clone(),
        region,
        name: info.level_name.unwrap_or_else(|| "N/A".to_string()),
        description: info.desc.unwrap_or_else(|| "N/A".to_string()),
        attributes,
        cover_image: info
            .cover_img
            .and_then(|img| img.url)
            .filter(|url| !url.is_empty()),
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        _ => None,
    }
}

/// `play_count` -> `Play Count`
fn humanize_key(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// Response structs follow the upstream JSON. Everything is optional because the
// API leaves out whole branches on errors.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    retcode: Option<i64>,
    message: Option<String>,
    data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    resp_map: Option<ApiRespMap>,
}

#[derive(Debug, Deserialize)]
struct ApiRespMap {
    level_detail: Option<ApiLevelDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiLevelDetail {
    retcode: Option<i64>,
    message: Option<String>,
    data: Option<ApiLevelDetailData>,
}

#[derive(Debug, Deserialize)]
struct ApiLevelDetailData {
    level_detail_response: Option<ApiLevelDetailResponse>,
}

#[derive(Debug, Deserialize)]
struct ApiLevelDetailResponse {
    level_info: Option<ApiLevelInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiLevelInfo {
    level_id: Option<Value>,
    level_name: Option<String>,
    desc: Option<String>,
    cover_img: Option<ApiImage>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<LevelRecord, LevelError> {
        let body: ApiResponse = serde_json::from_value(value).unwrap();
        parse_level_response(body, &Guid::parse("1234").unwrap(), ServerRegion::America)
    }

    fn success_body(level_info: Value) -> Value {
        json!({
            "retcode": 0,
            "message": "OK",
            "data": {"resp_map": {"level_detail": {
                "retcode": 0,
                "message": "",
                "data": {"level_detail_response": {"level_info": level_info}}
            }}}
        })
    }

    #[test]
    fn test_parses_level_info() {
        let record = parse(success_body(json!({
            "level_id": 1234,
            "level_name": "Sky Garden",
            "desc": "Float between islands.",
            "cover_img": {"url": "https://upstream/cover.png"},
            "play_count": 42,
            "author_name": "Traveler",
            "tags": ["parkour"]
        })))
        .unwrap();

        assert_eq!(record.name, "Sky Garden");
        assert_eq!(record.description, "Float between islands.");
        assert_eq!(record.cover_image.as_deref(), Some("https://upstream/cover.png"));
        assert_eq!(record.region, ServerRegion::America);
        assert_eq!(
            record.attributes,
            vec![
                ("Level ID".to_string(), "1234".to_string()),
                ("Server".to_string(), "America".to_string()),
                ("Author Name".to_string(), "Traveler".to_string()),
                ("Play Count".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_optional_fields() {
        let record = parse(success_body(json!({"cover_img": {"url": ""}}))).unwrap();

        assert_eq!(record.name, "N/A");
        assert_eq!(record.cover_image, None);
        assert_eq!(record.attributes[0].1, "1234");
    }

    #[test]
    fn test_top_level_error_keeps_upstream_message() {
        let result = parse(json!({"retcode": -1, "message": "system busy"}));

        match result {
            Err(LevelError::Rejected(message)) => assert_eq!(message, "system busy"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_top_level_error_without_message() {
        let result = parse(json!({"retcode": 100, "message": ""}));

        match result {
            Err(LevelError::Rejected(message)) => assert_eq!(message, "Unknown error"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unnamed_extra_fields_are_skipped() {
        let record = parse(success_body(json!({"__": "hidden", "_": 3, "play_count": 12})))
            .unwrap();

        let names: Vec<&str> = record.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert!(names.iter().all(|name| !name.is_empty()));
        assert!(names.contains(&"Play Count"));
    }

    #[test]
    fn test_nested_error_is_not_found() {
        let result = parse(json!({
            "retcode": 0,
            "message": "OK",
            "data": {"resp_map": {"level_detail": {
                "retcode": 3001,
                "message": "level does not exist",
                "data": null
            }}}
        }));

        match result {
            Err(LevelError::NotFound(message)) => assert_eq!(message, "level does not exist"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_detail_is_not_found() {
        let result = parse(json!({"retcode": 0, "data": {"resp_map": {}}}));

        assert!(matches!(result, Err(LevelError::NotFound(_))));
    }

    #[test]
    fn test_missing_level_info() {
        let result = parse(json!({
            "retcode": 0,
            "data": {"resp_map": {"level_detail": {
                "retcode": 0,
                "data": {"level_detail_response": {}}
            }}}
        }));

        assert!(matches!(result, Err(LevelError::MissingLevelInfo)));
    }

    #[test]
    fn test_payload_substitution() {
        let template: PayloadTemplate = serde_json::from_value(json!({
            "url": "https://upstream/api",
            "payload": {"lang": "en", "level_id": "placeholder"}
        }))
        .unwrap();
        let client = WonderlandApiClient::new(template, Duration::from_secs(5)).unwrap();

        let payload = client.build_payload(&Guid::parse("777").unwrap(), ServerRegion::Cht);

        assert_eq!(
            payload,
            json!({"lang": "en", "level_id": "777", "region": "os_cht"})
        );
    }

    #[test]
    fn test_humanize_key() {
        assert_eq!(humanize_key("play_count"), "Play Count");
        assert_eq!(humanize_key("__odd__key"), "Odd Key");
    }
}
