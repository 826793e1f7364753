use std::collections::HashMap;

/// Parse query parameters from a URI or bare query string.
///
/// Values are URL decoded; for repeated keys the last one wins.
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    let query = match uri.find('?') {
        Some(start) => &uri[start + 1..],
        None if uri.contains('=') => uri,
        None => return params,
    };

    for param in query.split('&').filter(|p| !p.is_empty()) {
        let (key, raw) = param.split_once('=').unwrap_or((param, ""));
        let plus_decoded = raw.replace('+', " ");
        let value = urlencoding::decode(&plus_decoded)
            .map(|v| v.into_owned())
            .unwrap_or(plus_decoded.clone());
        params.insert(key.to_string(), value);
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uri_with_query() {
        let params = parse_query_params("/graphql?operation=getHashtag&hashtag=rust%20lang");
        assert_eq!(params.get("operation").map(String::as_str), Some("getHashtag"));
        assert_eq!(params.get("hashtag").map(String::as_str), Some("rust lang"));
    }

    #[test]
    fn parses_bare_query_and_flags() {
        let params = parse_query_params("operation=getPosts&verbose");
        assert_eq!(params.get("operation").map(String::as_str), Some("getPosts"));
        assert_eq!(params.get("verbose").map(String::as_str), Some(""));
    }

    #[test]
    fn plus_means_space() {
        let params = parse_query_params("?query=hello+world");
        assert_eq!(params.get("query").map(String::as_str), Some("hello world"));
    }

    #[test]
    fn no_query_is_empty() {
        assert!(parse_query_params("/graphql").is_empty());
    }
}
