/// Extracts the `rel="next"` target from an RFC 8288 `Link` header value.
///
/// Handles several comma-separated links, quoted or bare `rel` values, and
/// space-separated relation lists such as `rel="next last"`.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        let is_next = parts.any(|param| {
            let Some((name, value)) = param.split_once('=') else {
                return false;
            };
            name.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|relation| relation.eq_ignore_ascii_case("next"))
        });
        (is_next && !url.is_empty()).then(|| url.to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_next_link() {
        let header = r#"<https://huggingface.co/api/datasets?filter=lerobot&cursor=eyJ9>; rel="next""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://huggingface.co/api/datasets?filter=lerobot&cursor=eyJ9")
        );
    }

    #[test]
    fn test_next_among_several_links() {
        let header = r#"<https://api.test/items?page=1>; rel="prev", <https://api.test/items?page=3>; rel="next", <https://api.test/items?page=9>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.test/items?page=3")
        );
    }

    #[test]
    fn test_unquoted_and_multi_valued_rel() {
        assert_eq!(
            parse_next_link("<https://api.test/a>; rel=next").as_deref(),
            Some("https://api.test/a")
        );
        assert_eq!(
            parse_next_link(r#"<https://api.test/b>; title="x"; rel="next last""#).as_deref(),
            Some("https://api.test/b")
        );
    }

    #[test]
    fn test_no_next_link() {
        assert_eq!(parse_next_link(r#"<https://api.test/items?page=1>; rel="prev""#), None);
        assert_eq!(parse_next_link(""), None);
        assert_eq!(parse_next_link("garbage; rel=next"), None);
    }
}
