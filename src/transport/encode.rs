use url::Url;

use crate::domain::{Params, param_text};

/// `https://{host}{path}`, with `params` appended as the query string when given.
pub fn build_url(host: &str, path: &str, query: Option<&Params>) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("https://{host}{path}"))?;
    if let Some(params) = query {
        let mut pairs = params
            .iter()
            .filter_map(|(key, value)| param_text(value).map(|text| (key, text)))
            .peekable();
        if pairs.peek().is_some() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
    }
    Ok(url)
}

/// `application/x-www-form-urlencoded` body; `null` values are left out.
pub fn encode_form(params: &Params) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if let Some(text) = param_text(value) {
            serializer.append_pair(key, &text);
        }
    }
    serializer.finish()
}

pub fn encode_json(params: &Params) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(params)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(pairs: &[(&str, serde_json::Value)]) -> Params {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn build_url_joins_host_and_path() {
        let url = build_url("rest.nexmo.com", "/account/get-balance", None).unwrap();
        assert_eq!(url.as_str(), "https://rest.nexmo.com/account/get-balance");
    }

    #[test]
    fn build_url_appends_query_in_key_order() {
        let query = params(&[("page_size", json!(10)), ("country", json!("GB"))]);
        let url = build_url("rest.nexmo.com", "/number/search", Some(&query)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://rest.nexmo.com/number/search?country=GB&page_size=10"
        );
    }

    #[test]
    fn build_url_skips_empty_query() {
        let query = params(&[("unset", json!(null))]);
        let url = build_url("api.nexmo.com", "/v1/calls", Some(&query)).unwrap();
        assert_eq!(url.as_str(), "https://api.nexmo.com/v1/calls");
    }

    #[test]
    fn form_encoding_escapes_values() {
        let body = encode_form(&params(&[
            ("text", json!("a&b c")),
            ("to", json!("447700900000")),
            ("unicode", json!(true)),
        ]));
        assert_eq!(body, "text=a%26b+c&to=447700900000&unicode=true");
    }

    #[test]
    fn json_encoding_keeps_nested_values() {
        let body = encode_json(&params(&[("ncco", json!([{"action": "talk"}]))])).unwrap();
        assert_eq!(body, br#"{"ncco":[{"action":"talk"}]}"#);
    }
}
