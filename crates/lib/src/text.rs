//! Plain-text extraction from HTML-bearing answer text.
//!
//! Copy, speech output, and history building all go through [`strip_html`] so
//! the three treat bot answers identically.

/// Strip tags and decode common entities, yielding the rendered text content.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '<' => {
                // Skip to the closing '>'; an unterminated tag swallows the rest.
                for (_, t) in chars.by_ref() {
                    if t == '>' {
                        break;
                    }
                }
            }
            '&' => match decode_entity(&html[i..]) {
                Some((decoded, len)) => {
                    out.push_str(&decoded);
                    // Skip the rest of the entity (the '&' is already consumed).
                    for _ in 0..len - 1 {
                        chars.next();
                    }
                }
                None => out.push('&'),
            },
            _ => out.push(c),
        }
    }
    out
}

/// Decode one entity at the start of `s` (which begins with '&').
/// Returns the replacement text and the entity's byte length, or None when
/// `s` does not start a recognized entity.
fn decode_entity(s: &str) -> Option<(String, usize)> {
    let end = s
        .char_indices()
        .take(12)
        .find(|&(_, c)| c == ';')
        .map(|(i, _)| i)?;
    let name = &s[1..end];
    let len = end + 1;
    let decoded = match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        // Non-breaking space reads as a plain space for copy and speech.
        "nbsp" => " ".to_string(),
        _ => {
            let code = name.strip_prefix('#')?;
            let n = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(n)?.to_string()
        }
    };
    Some((decoded, len))
}

/// True when the text contains any Devanagari codepoint (U+0900..=U+097F).
pub fn has_devanagari(text: &str) -> bool {
    text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags() {
        assert_eq!(strip_html("<b>Vidhwa</b> pension <br/>details"), "Vidhwa pension details");
    }

    #[test]
    fn decodes_named_entities() {
        assert_eq!(strip_html("a &amp; b &lt;c&gt; &quot;d&quot; &apos;e&apos;"), "a & b <c> \"d\" 'e'");
        assert_eq!(strip_html("one&nbsp;two"), "one two");
    }

    #[test]
    fn decodes_numeric_entities() {
        assert_eq!(strip_html("&#2344;&#2350;&#2360;&#2381;&#2340;&#2375;"), "नमस्ते");
        assert_eq!(strip_html("&#x41;&#x42;"), "AB");
    }

    #[test]
    fn bare_ampersand_kept_literal() {
        assert_eq!(strip_html("R&D and &unknown; stay"), "R&D and &unknown; stay");
        assert_eq!(strip_html("trailing &"), "trailing &");
    }

    #[test]
    fn unterminated_tag_is_dropped() {
        assert_eq!(strip_html("ok <b unclosed"), "ok ");
    }

    #[test]
    fn devanagari_detection() {
        assert!(has_devanagari("old age पेंशन"));
        assert!(!has_devanagari("old age pension"));
    }
}
