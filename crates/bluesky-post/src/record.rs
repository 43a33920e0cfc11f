//! Post record types and link entity extraction.

use serde::{Deserialize, Serialize};

/// A `{cid, uri}` pair identifying one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub cid: String,
    pub uri: String,
}

/// Thread position of a reply record.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyRef {
    pub root: StrongRef,
    pub parent: StrongRef,
}

/// Byte range of an entity inside the post text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSlice {
    pub start: usize,
    pub end: usize,
}

/// A legacy post entity; only links are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub index: TextSlice,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
}

/// The `app.bsky.feed.post` record body.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPost {
    #[serde(rename = "$type")]
    pub record_type: &'static str,
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
}

impl FeedPost {
    pub fn new(text: impl Into<String>, reply: Option<ReplyRef>) -> Self {
        let text = text.into();
        let entities = extract_link_entities(&text);
        Self {
            record_type: "app.bsky.feed.post",
            text,
            created_at: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
            reply,
            entities,
        }
    }
}

/// Extract URLs with their byte offsets so clients render them as links.
pub fn extract_link_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut offset = 0;

    while offset < text.len() {
        let rest = &text[offset..];
        if rest.starts_with("https://") || rest.starts_with("http://") {
            let end = rest
                .find(char::is_whitespace)
                .unwrap_or(rest.len());
            entities.push(Entity {
                index: TextSlice {
                    start: offset,
                    end: offset + end,
                },
                kind: "link",
                value: rest[..end].to_string(),
            });
            offset += end;
        } else {
            // Advance one character, staying on a UTF-8 boundary.
            offset += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_url_with_byte_offsets() {
        let text = "before https://example.test/a after";
        let entities = extract_link_entities(text);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].value, "https://example.test/a");
        assert_eq!(entities[0].index, TextSlice { start: 7, end: 29 });
        assert_eq!(&text[7..29], "https://example.test/a");
    }

    #[test]
    fn offsets_are_bytes_even_after_multibyte_text() {
        let text = "震度6強\nhttps://example.test/";
        let entities = extract_link_entities(text);
        assert_eq!(entities.len(), 1);
        let slice = &entities[0].index;
        assert_eq!(&text[slice.start..slice.end], "https://example.test/");
    }

    #[test]
    fn text_without_urls_has_no_entities() {
        assert!(extract_link_entities("地震がありました。").is_empty());
    }

    #[test]
    fn multiple_urls_are_all_found() {
        let text = "http://a.test/x https://b.test/y";
        let entities = extract_link_entities(text);
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].value, "http://a.test/x");
        assert_eq!(entities[1].value, "https://b.test/y");
    }

    #[test]
    fn reply_is_omitted_from_json_when_absent() {
        let post = FeedPost::new("hello", None);
        let json = serde_json::to_value(&post).unwrap();
        assert!(json.get("reply").is_none());
        assert_eq!(json["$type"], "app.bsky.feed.post");
    }
}
