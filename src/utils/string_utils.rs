/// Helpers for logging secrets and user-supplied text without leaking or
/// splitting UTF-8 sequences.

/// Truncates `s` to at most `max_bytes`, backing off to the previous char boundary.
///
/// # Example
/// ```
/// use zoho_dataswyft_connector::utils::string_utils::truncate_safe;
///
/// assert_eq!(truncate_safe("Olá, mundo", 3), "Ol");
/// ```
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Renders a secret for logs: the first 8 bytes followed by `...`.
///
/// Empty values render as `undefined` so a missing secret is visible in the logs.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "undefined".to_string();
    }
    format!("{}...", truncate_safe(secret, 8))
}

/// Escapes the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_safe_utf8() {
        assert_eq!(truncate_safe("Hello, World!", 5), "Hello");
        assert_eq!(truncate_safe("short", 100), "short");
        // "á" takes two bytes
        assert_eq!(truncate_safe("Olá", 3), "Ol");
        assert_eq!(truncate_safe("Olá", 4), "Olá");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("1000.abcdef123456"), "1000.abc...");
        assert_eq!(mask_secret("abc"), "abc...");
        assert_eq!(mask_secret(""), "undefined");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }
}
