use serde::Deserialize;
use serde_json::Value;

use crate::client::HttpError;
use crate::domain::{ResponseBody, ResponseSnapshot};

/// RFC 7807 style error document returned by the newer APIs.
#[derive(Debug, Clone, Deserialize)]
struct ProblemDocument {
    title: String,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default, rename = "type")]
    problem_type: Option<String>,
}

impl ProblemDocument {
    fn summary(&self) -> String {
        let mut summary = self.title.clone();
        if let Some(detail) = self.detail.as_deref() {
            summary.push_str(&format!(": {detail}"));
        }
        if let Some(problem_type) = self.problem_type.as_deref() {
            summary.push_str(&format!(" ({problem_type})"));
        }
        summary
    }
}

/// Media type of a `Content-Type` value, without parameters.
pub fn media_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

fn is_json(response: &ResponseSnapshot) -> bool {
    response
        .header("content-type")
        .is_some_and(|value| media_type(value).eq_ignore_ascii_case("application/json"))
}

/// Turn a response into a decoded body or a typed error.
///
/// - `204` and empty 2xx bodies decode to `None`,
/// - 2xx `application/json` bodies are parsed,
/// - other 2xx bodies are returned as raw bytes,
/// - everything else is an [`HttpError`] carrying the response.
pub fn classify_response(response: ResponseSnapshot) -> Result<Option<ResponseBody>, HttpError> {
    match response.status {
        204 => Ok(None),
        200..=299 if response.body.is_empty() => Ok(None),
        200..=299 if is_json(&response) => match serde_json::from_slice(&response.body) {
            Ok(value) => Ok(Some(ResponseBody::Json(value))),
            Err(err) => Err(HttpError::request_failed(
                format!(
                    "{} response from {} is not valid JSON",
                    response.status, response.url
                ),
                Some(response),
                Some(err.into()),
            )),
        },
        200..=299 => Ok(Some(ResponseBody::Bytes(response.body))),
        _ => Err(HttpError::from_response(response)),
    }
}

/// `"{status} response from {url}"`, followed by the problem summary and the
/// (pretty-printed when JSON) body when there is one.
pub fn format_error_message(response: &ResponseSnapshot) -> String {
    let mut message = format!("{} response from {}", response.status, response.url);

    let parsed = serde_json::from_slice::<Value>(&response.body).ok();
    if let Some(problem) = parsed
        .clone()
        .and_then(|value| serde_json::from_value::<ProblemDocument>(value).ok())
    {
        message.push_str(". ");
        message.push_str(&problem.summary());
    }

    let body = match parsed {
        Some(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.text()),
        None => response.text(),
    };
    if !body.trim().is_empty() {
        message.push_str(". Error response body:\n");
        message.push_str(&body);
    }
    message
}
