//! `Content-Disposition` file name extraction.

/// File name from a `Content-Disposition` value.
///
/// `filename*=charset'lang'pct-encoded` (RFC 5987) wins over `filename=`;
/// the plain form may be quoted with backslash escapes or a bare token.
pub fn disposition_file_name(value: &str) -> Option<String> {
    let mut plain = None;
    for param in value.split(';').skip(1) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                if let Some(name) = extended_value(raw).filter(|n| !n.is_empty()) {
                    return Some(name);
                }
            }
            "filename" => {
                let name = unquote(raw);
                if !name.is_empty() {
                    plain = Some(name);
                }
            }
            _ => {}
        }
    }
    plain
}

/// `UTF-8''caf%C3%A9.txt` -> `café.txt`. Other charsets are decoded lossily.
fn extended_value(raw: &str) -> Option<String> {
    let raw = unquote(raw);
    let mut parts = raw.splitn(3, '\'');
    let _charset = parts.next()?;
    let _lang = parts.next()?;
    let encoded = parts.next()?;
    Some(percent_decode(encoded))
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
    else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped || c != '\\' {
            out.push(c);
            escaped = false;
        } else {
            escaped = true;
        }
    }
    out
}

pub(super) fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(h << 4 | l);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_and_token_forms() {
        assert_eq!(
            disposition_file_name("attachment; filename=\"foo.safetensors\"").as_deref(),
            Some("foo.safetensors")
        );
        assert_eq!(
            disposition_file_name("attachment; filename=foo.pt").as_deref(),
            Some("foo.pt")
        );
        assert_eq!(
            disposition_file_name(r#"attachment; filename="say \"hi\".pt""#).as_deref(),
            Some("say \"hi\".pt")
        );
    }

    #[test]
    fn extended_form_wins() {
        assert_eq!(
            disposition_file_name("attachment; filename=\"fallback.bin\"; filename*=UTF-8''ink%20wash%E2%9C%93.safetensors")
                .as_deref(),
            Some("ink wash\u{2713}.safetensors")
        );
    }

    #[test]
    fn missing_or_empty() {
        assert_eq!(disposition_file_name("inline"), None);
        assert_eq!(disposition_file_name("attachment; filename=\"\""), None);
        assert_eq!(disposition_file_name("attachment; filename*=UTF-8''"), None);
    }

    #[test]
    fn broken_percent_escape_kept() {
        assert_eq!(percent_decode("a%2"), "a%2");
        assert_eq!(percent_decode("a%zzb"), "a%zzb");
        assert_eq!(percent_decode("%41%42"), "AB");
    }
}
