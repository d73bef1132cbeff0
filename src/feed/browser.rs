use quick_xml::escape::escape;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Make a serialized feed readable when opened directly in a browser.
///
/// The XML declaration is normalized and followed by a stylesheet processing
/// instruction pointing at `{web_path}styles.css`, and an XHTML `<script>`
/// loading `{web_path}rss.js` is placed first inside the root `<feed>`
/// element. The script swaps the XML view for HTML; feed readers ignore it.
///
/// Applying this to its own output returns the input unchanged.
pub fn add_browser_rendering(xml: &str, web_path: &str) -> String {
    let web_path = escape(web_path);
    let stylesheet = format!(
        r#"<?xml-stylesheet href="{}styles.css" type="text/css"?>"#,
        web_path
    );
    let script = format!(
        r#"<script xmlns="{}" src="{}rss.js" defer=""/>"#,
        XHTML_NS, web_path
    );

    if xml.contains(&stylesheet) && xml.contains(&script) {
        return xml.to_string();
    }

    let body = strip_declaration(xml).trim_start();

    let mut out = String::with_capacity(xml.len() + stylesheet.len() + script.len() + 64);
    out.push_str(XML_DECLARATION);
    out.push('\n');
    out.push_str(&stylesheet);
    out.push('\n');

    match feed_open_tag_end(body) {
        Some(end) => {
            out.push_str(&body[..end]);
            out.push_str("\n  ");
            out.push_str(&script);
            out.push_str(&body[end..]);
        }
        None => {
            tracing::warn!("No <feed> element found, script reference not added");
            out.push_str(body);
        }
    }
    out
}

/// Drop a leading `<?xml ...?>` declaration, if any.
fn strip_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml ") {
        if let Some(end) = trimmed.find("?>") {
            return &trimmed[end + 2..];
        }
    }
    trimmed
}

/// Byte offset just past the `>` closing the opening `<feed ...>` tag.
///
/// Attribute values in serialized output never contain a raw `>`, so the
/// first one after `<feed` ends the tag.
fn feed_open_tag_end(xml: &str) -> Option<usize> {
    let start = xml.find("<feed")?;
    let close = xml[start..].find('>')?;
    Some(start + close + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASE: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom" xml:lang="en"><title>t</title></feed>"#;

    #[test]
    fn test_adds_stylesheet_and_script() {
        let out = add_browser_rendering(BASE, "/links/");
        let expected = concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "\n",
            r#"<?xml-stylesheet href="/links/styles.css" type="text/css"?>"#,
            "\n",
            r#"<feed xmlns="http://www.w3.org/2005/Atom" xml:lang="en">"#,
            "\n  ",
            r#"<script xmlns="http://www.w3.org/1999/xhtml" src="/links/rss.js" defer=""/>"#,
            "<title>t</title></feed>"
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_idempotent() {
        let once = add_browser_rendering(BASE, "/links/");
        let twice = add_browser_rendering(&once, "/links/");
        assert_eq!(once, twice);
        assert_eq!(twice.matches("<script").count(), 1);
        assert_eq!(twice.matches("xml-stylesheet").count(), 1);
    }

    #[test]
    fn test_web_path_is_attribute_escaped() {
        let out = add_browser_rendering(BASE, "/a&b/");
        assert!(out.contains(r#"href="/a&amp;b/styles.css""#));
        assert!(out.contains(r#"src="/a&amp;b/rss.js""#));
    }

    #[test]
    fn test_without_declaration() {
        let out = add_browser_rendering("<feed><title>t</title></feed>", "/");
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(out.contains(r#"<feed>"#));
        assert!(out.contains(r#"src="/rss.js""#));
    }

    #[test]
    fn test_does_not_match_feed_prefix_in_declaration() {
        assert_eq!(feed_open_tag_end("<feed a=\"1\">x"), Some(12));
        assert_eq!(feed_open_tag_end("<rss>"), None);
    }
}
