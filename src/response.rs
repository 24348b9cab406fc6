use serde::Serialize;

use crate::image_utils;

/// Response body shaped like a Gemini `generateContent` reply, which is what the frontend parses.
#[derive(Serialize)]
pub struct MemeResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Serialize)]
pub struct Candidate {
    pub content: Content,
}

#[derive(Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub inline_data: InlineData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: &'static str,
    pub data: String,
}

impl MemeResponse {
    pub fn png(image: &[u8]) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: image_utils::encode_base64(image),
                        },
                    }],
                },
            }],
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_png_envelope() {
        assert_eq!(
            serde_json::to_value(MemeResponse::png(b"hello")).unwrap(),
            json!({
                "candidates": [{
                    "content": {
                        "parts": [{"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}]
                    }
                }]
            })
        );
    }
}
