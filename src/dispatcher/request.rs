use super::core::RawRequest;

/// Split a request target into path and query string.
#[must_use]
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (if path.is_empty() { "/" } else { path }, Some(query)),
        None => (if target.is_empty() { "/" } else { target }, None),
    }
}

/// Parse query string parameters
///
/// URL-decodes parameter names and values; duplicate names are kept in order so that
/// later values win when collected.
#[must_use]
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Declared content type of the request, if any
#[must_use]
pub fn content_type_of(req: &RawRequest) -> Option<&str> {
    req.get_header("content-type")
}

/// `application/json` and `application/*+json`, ignoring parameters
#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_target() {
        assert_eq!(split_target("/p?x=1"), ("/p", Some("x=1")));
        assert_eq!(split_target("/p"), ("/p", None));
        assert_eq!(split_target("?x=1"), ("/", Some("x=1")));
        assert_eq!(split_target(""), ("/", None));
    }

    #[test]
    fn test_parse_query() {
        let q = parse_query("x=1&y=hello%20there&x=2");
        assert_eq!(
            q,
            vec![
                ("x".to_string(), "1".to_string()),
                ("y".to_string(), "hello there".to_string()),
                ("x".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON; charset=utf-8"));
        assert!(is_json_content_type("application/problem+json"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("application/x-www-form-urlencoded"));
    }
}
