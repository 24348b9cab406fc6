use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::error::{ApiError, NO_IMAGE_PROVIDED};
use crate::image_utils::{self, ImageError, MEBIBYTE};

/// Largest request body read, leaving room for a base64 encoded 10 MiB image.
pub const MAX_BODY_SIZE: usize = 64 * MEBIBYTE;

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonBody {
    image_data: Option<String>,
    prompt: Option<String>,
}

#[derive(Default)]
struct FormFields {
    file: Option<Bytes>,
    image_data: Option<String>,
    prompt: Option<String>,
}

pub struct MemeInput {
    pub image: Vec<u8>,
    pub prompt: Option<String>,
}

/// Pulls the image and optional prompt out of a JSON, multipart or urlencoded request.
///
/// JSON is tried first when declared; a body that fails to parse is ignored and the other
/// sources are tried instead.
pub async fn extract(request: Request) -> Result<MemeInput, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|header| header.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let (parts, body) = request.into_parts();
    let body = read_body(body).await?;

    let json = if content_type.contains("application/json") {
        match serde_json::from_slice::<JsonBody>(&body) {
            Ok(json) => Some(json),
            Err(err) => {
                log::debug!("ignoring unparseable JSON body: {err}");
                None
            }
        }
    } else {
        None
    };

    let mut form = if content_type.starts_with("multipart/form-data") {
        parse_multipart(Request::from_parts(parts, Body::from(body))).await?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        parse_urlencoded(&body)
    } else {
        FormFields::default()
    };

    if let Some(json) = json {
        form.image_data = json.image_data;
        form.prompt = json.prompt.or(form.prompt);
        form.file = None;
    }

    let image = if let Some(file) = form.file {
        file.to_vec()
    } else if let Some(image_data) = form.image_data {
        image_utils::decode_base64(&image_data)
            .map_err(|err| ApiError::Unexpected(err.to_string()))?
    } else {
        return Err(ApiError::BadRequest(NO_IMAGE_PROVIDED.into()));
    };

    Ok(MemeInput { image, prompt: form.prompt })
}

/// Collects the body, giving up with [`ImageError::TooLarge`] once it passes [`MAX_BODY_SIZE`].
async fn read_body(body: Body) -> Result<Bytes, ApiError> {
    let mut buffer = Vec::new();
    let mut stream = body.into_data_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|err| ApiError::BadRequest(format!("failed to read request body: {err}")))?;

        if buffer.len() + chunk.len() > MAX_BODY_SIZE {
            return Err(ImageError::TooLarge(buffer.len() + chunk.len()).into());
        }

        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer.into())
}

async fn parse_multipart(request: Request) -> Result<FormFields, ApiError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|err| ApiError::BadRequest(err.body_text()))?;

    let mut form = FormFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        let value = match name.as_str() {
            "file" => {
                let file =
                    field.bytes().await.map_err(|err| ApiError::BadRequest(err.body_text()))?;
                form.file = Some(file);
                continue;
            }
            "imageData" | "prompt" => {
                field.text().await.map_err(|err| ApiError::BadRequest(err.body_text()))?
            }
            _ => continue,
        };

        if name == "prompt" {
            form.prompt = Some(value);
        } else {
            form.image_data = Some(value);
        }
    }

    Ok(form)
}

fn parse_urlencoded(body: &[u8]) -> FormFields {
    let mut form = FormFields::default();

    for (name, value) in url::form_urlencoded::parse(body) {
        match name.as_ref() {
            "imageData" => form.image_data = Some(value.into_owned()),
            "prompt" => form.prompt = Some(value.into_owned()),
            _ => (),
        }
    }

    form
}

#[cfg(test)]
mod test {
    use axum::http;

    use super::*;

    const BOUNDARY: &str = "X-MEME-BOUNDARY";

    fn request(content_type: &str, body: impl Into<Body>) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/api/generate-meme")
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    fn multipart(fields: &[(&str, Option<&str>, &str)]) -> Request {
        let mut body = Vec::new();

        for (name, filename, value) in fields {
            body.extend(format!("--{BOUNDARY}\r\n").bytes());
            match filename {
                Some(filename) => body.extend(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .bytes(),
                ),
                None => body.extend(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").bytes(),
                ),
            }
            body.extend(value.bytes());
            body.extend(b"\r\n");
        }

        body.extend(format!("--{BOUNDARY}--\r\n").bytes());

        request(&format!("multipart/form-data; boundary={BOUNDARY}"), body)
    }

    #[tokio::test]
    async fn test_json_data_uri() {
        let input = extract(request(
            "application/json",
            r#"{"imageData": "data:image/png;base64,aGVsbG8=", "prompt": "make it blue"}"#,
        ))
        .await
        .unwrap();

        assert_eq!(input.image, b"hello");
        assert_eq!(input.prompt.as_deref(), Some("make it blue"));
    }

    #[tokio::test]
    async fn test_json_without_prompt() {
        let input =
            extract(request("application/json; charset=utf-8", r#"{"imageData": "aGVsbG8="}"#))
                .await
                .unwrap();

        assert_eq!(input.image, b"hello");
        assert_eq!(input.prompt, None);
    }

    #[tokio::test]
    async fn test_invalid_json_falls_through() {
        let Err(ApiError::BadRequest(message)) =
            extract(request("application/json", "{not json")).await
        else {
            panic!("expected BadRequest error");
        };
        assert_eq!(message, NO_IMAGE_PROVIDED);
    }

    #[tokio::test]
    async fn test_empty_base64_is_empty_image() {
        let input = extract(request("application/json", r#"{"imageData": ""}"#)).await.unwrap();
        assert!(input.image.is_empty());
    }

    #[tokio::test]
    async fn test_multipart_file() {
        let input = extract(multipart(&[
            ("prompt", None, "wear a hat"),
            ("file", Some("cat.png"), "PNG\r\nnot really"),
        ]))
        .await
        .unwrap();

        assert_eq!(input.image, b"PNG\r\nnot really");
        assert_eq!(input.prompt.as_deref(), Some("wear a hat"));
    }

    #[tokio::test]
    async fn test_multipart_file_wins_over_image_data() {
        let input = extract(multipart(&[
            ("imageData", None, "d29ybGQ="),
            ("file", Some("cat.png"), "hello"),
        ]))
        .await
        .unwrap();

        assert_eq!(input.image, b"hello");
    }

    #[tokio::test]
    async fn test_multipart_image_data() {
        let input = extract(multipart(&[("imageData", None, "data:image/png;base64,aGVsbG8=")]))
            .await
            .unwrap();

        assert_eq!(input.image, b"hello");
        assert_eq!(input.prompt, None);
    }

    #[tokio::test]
    async fn test_urlencoded() {
        let input = extract(request(
            "application/x-www-form-urlencoded",
            "imageData=aGVsbG8%3D&prompt=make+it+blue",
        ))
        .await
        .unwrap();

        assert_eq!(input.image, b"hello");
        assert_eq!(input.prompt.as_deref(), Some("make it blue"));
    }

    #[tokio::test]
    async fn test_no_image() {
        for no_image in [
            request("text/plain", "hello"),
            request("application/json", r#"{"prompt": "make it blue"}"#),
            multipart(&[("prompt", None, "make it blue")]),
        ] {
            let Err(ApiError::BadRequest(message)) = extract(no_image).await else {
                panic!("expected BadRequest error");
            };
            assert_eq!(message, NO_IMAGE_PROVIDED);
        }
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let body = vec![b'a'; MAX_BODY_SIZE + 1];
        let Err(err) = extract(request("application/octet-stream", body)).await else {
            panic!("expected an error");
        };
        assert_eq!(err.to_string(), "File too large. Max size: 10MB");
    }

    #[tokio::test]
    async fn test_invalid_base64() {
        let result = extract(request("application/json", r#"{"imageData": "???"}"#)).await;
        assert!(matches!(result, Err(ApiError::Unexpected(_))));
    }
}
