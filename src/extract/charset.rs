//! Character encoding resolution for fetched pages.
//!
//! Order: byte order mark, `Content-Type` charset, `<meta>` declaration in
//! the first kilobyte, then statistical detection.

use std::sync::LazyLock;

use encoding_rs::Encoding;
use regex::Regex;

/// Bytes scanned for a `<meta>` charset declaration.
const PRESCAN_BYTES: usize = 1024;

static CHARSET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).expect("charset pattern")
});

static META_CHARSET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>;]+)"#).expect("meta pattern")
});

/// Resolve the encoding for a body given its `Content-Type` header value.
pub fn resolve(content_type: &str, body: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return encoding;
    }

    if let Some(encoding) = label_in(&CHARSET_REGEX, content_type) {
        return encoding;
    }

    let head = String::from_utf8_lossy(&body[..body.len().min(PRESCAN_BYTES)]);
    if let Some(encoding) = label_in(&META_CHARSET_REGEX, &head) {
        // A meta tag can only be read if the page is ASCII-compatible.
        if encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE {
            return encoding_rs::UTF_8;
        }
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    detector.guess(None, true)
}

/// Decode a body to UTF-8, replacing malformed sequences.
pub fn decode(content_type: &str, body: &[u8]) -> String {
    let encoding = resolve(content_type, body);
    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        log::debug!("Malformed {} sequences replaced while decoding", used.name());
    }
    text.into_owned()
}

fn label_in(pattern: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = pattern.captures(haystack)?.get(1)?.as_str();
    Encoding::for_label(label.trim().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_charset() {
        let encoding = resolve("text/html; charset=Shift_JIS", b"<p>x</p>");
        assert_eq!(encoding, encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn test_meta_charset() {
        let body = b"<html><head><meta charset=\"euc-jp\"></head></html>";
        assert_eq!(resolve("text/html", body), encoding_rs::EUC_JP);
    }

    #[test]
    fn test_meta_http_equiv() {
        let body = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\">";
        assert_eq!(resolve("", body), encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn test_unknown_label_falls_back() {
        let body = "Hello, 世界".as_bytes();
        assert_eq!(resolve("text/html; charset=bogus-9000", body), encoding_rs::UTF_8);
    }

    #[test]
    fn test_bom_wins() {
        let mut body = vec![0xEF, 0xBB, 0xBF];
        body.extend_from_slice(b"hello");
        assert_eq!(resolve("text/html; charset=shift_jis", &body), encoding_rs::UTF_8);
    }

    #[test]
    fn test_decode_shift_jis() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("更新されました");
        let text = decode("text/html; charset=shift_jis", &bytes);
        assert_eq!(text, "更新されました");
    }
}
