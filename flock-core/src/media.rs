use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::{FlockError, FlockResult};

/// Where a record's media lives: a public object URL, or the file itself
/// inlined as base64.
///
/// The constructors are the only way to build a checked value: `remote`
/// rejects anything that is not an absolute HTTP(S) URL and `inline` rejects
/// malformed mime types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MediaReference {
    RemoteUrl {
        url: String,
    },
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: String,
        base64: String,
    },
}

impl MediaReference {
    pub fn remote<S: Into<String>>(url: S) -> FlockResult<Self> {
        let url = url.into();
        if !is_absolute_http_url(&url) {
            return Err(FlockError::validation(format!(
                "media url must be an absolute http(s) url, got '{url}'"
            )));
        }
        Ok(Self::RemoteUrl { url })
    }

    /// Encode `bytes` as an inline reference.
    pub fn inline<S: Into<String>>(mime_type: S, bytes: &[u8]) -> FlockResult<Self> {
        let mime_type = mime_type.into();
        check_mime_type(&mime_type)?;
        Ok(Self::InlineData {
            mime_type,
            base64: STANDARD.encode(bytes),
        })
    }

    /// Parse a stored column value: either an http(s) URL or a
    /// `data:<mime>[;name=value]*;base64,<payload>` URI.
    pub fn parse(value: &str) -> FlockResult<Self> {
        let value = value.trim();
        let Some(rest) = value.strip_prefix("data:") else {
            return Self::remote(value);
        };

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| FlockError::validation("data uri is missing its payload"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| FlockError::validation("only base64 data uris are supported"))?;
        check_mime_type(mime_type)?;
        STANDARD
            .decode(payload)
            .map_err(|e| FlockError::validation(format!("data uri payload is not base64: {e}")))?;

        Ok(Self::InlineData {
            mime_type: mime_type.to_string(),
            base64: payload.to_string(),
        })
    }

    /// Single column rendering of the reference.
    pub fn to_uri(&self) -> String {
        match self {
            Self::RemoteUrl { url } => url.clone(),
            Self::InlineData { mime_type, base64 } => format!("data:{mime_type};base64,{base64}"),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteUrl { .. })
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::InlineData { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::RemoteUrl { url } => Some(url),
            Self::InlineData { .. } => None,
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::RemoteUrl { .. } => None,
            Self::InlineData { mime_type, .. } => Some(mime_type),
        }
    }

    /// Bytes of an inline reference.
    pub fn decode_inline(&self) -> FlockResult<Vec<u8>> {
        match self {
            Self::InlineData { base64, .. } => STANDARD
                .decode(base64)
                .map_err(|e| FlockError::validation(format!("inline payload is not base64: {e}"))),
            Self::RemoteUrl { .. } => Err(FlockError::validation(
                "remote media has no inline payload",
            )),
        }
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteUrl { url } => f.write_str(url),
            Self::InlineData { mime_type, base64 } => {
                write!(f, "inline {mime_type} ({} base64 chars)", base64.len())
            }
        }
    }
}

pub fn is_absolute_http_url(url: &str) -> bool {
    if url.chars().any(char::is_whitespace) {
        return false;
    }
    let lower = url.to_ascii_lowercase();
    let Some(rest) = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
    else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    !host.is_empty() && !host.starts_with(':')
}

/// `type/subtype` with RFC 6838 token characters on both sides, optionally
/// followed by `; name=value` parameters (`text/csv; charset=utf-8`).
pub fn check_mime_type(mime_type: &str) -> FlockResult<()> {
    fn is_token(part: &str) -> bool {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    }

    fn is_parameter(param: &str) -> bool {
        match param.trim().split_once('=') {
            Some((name, value)) => {
                let value = value.trim();
                // A data URI header ends at the first comma.
                let quoted = value.len() >= 2
                    && value.starts_with('"')
                    && value.ends_with('"')
                    && !value[1..value.len() - 1].contains(['"', ',', ';']);
                is_token(name.trim()) && (quoted || is_token(value))
            }
            None => false,
        }
    }

    let mut parts = mime_type.split(';');
    let essence = parts.next().unwrap_or_default().trim();
    let valid = match essence.split_once('/') {
        Some((kind, subtype)) => is_token(kind) && is_token(subtype) && parts.all(is_parameter),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FlockError::validation(format!(
            "'{mime_type}' is not a valid mime type"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_requires_absolute_http_url() {
        assert!(MediaReference::remote("https://cdn.example.org/a.png").is_ok());
        assert!(MediaReference::remote("HTTP://cdn.example.org").is_ok());
        assert!(MediaReference::remote("/storage/a.png").is_err());
        assert!(MediaReference::remote("ftp://cdn.example.org/a.png").is_err());
        assert!(MediaReference::remote("https://").is_err());
        assert!(MediaReference::remote("https://cdn.example.org/a b.png").is_err());
    }

    #[test]
    fn inline_uri_parses_back_to_the_same_reference() {
        let media = MediaReference::inline("image/png", b"\x89PNG\r\n").unwrap();
        let uri = media.to_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(MediaReference::parse(&uri).unwrap(), media);
        assert_eq!(media.decode_inline().unwrap(), b"\x89PNG\r\n".to_vec());
    }

    #[test]
    fn parse_rejects_non_base64_data_uris() {
        assert!(MediaReference::parse("data:text/plain,hello").is_err());
        assert!(MediaReference::parse("data:image/png;base64").is_err());
        assert!(MediaReference::parse("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn mime_types_must_have_both_halves() {
        assert!(check_mime_type("application/pdf").is_ok());
        assert!(check_mime_type("image/svg+xml").is_ok());
        assert!(check_mime_type("image").is_err());
        assert!(check_mime_type("image/").is_err());
        assert!(check_mime_type("image/png;charset").is_err());
        assert!(check_mime_type("image/png; =x").is_err());
        assert!(check_mime_type("text/plain; title=\"a,b\"").is_err());
    }

    #[test]
    fn mime_parameters_are_accepted() {
        assert!(check_mime_type("text/csv; charset=utf-8").is_ok());
        assert!(check_mime_type("text/plain;charset=\"us-ascii\";format=flowed").is_ok());
    }

    #[test]
    fn inline_with_parameters_parses_back() {
        let media = MediaReference::inline("text/csv; charset=utf-8", b"name,role\n").unwrap();
        let uri = media.to_uri();
        assert!(uri.starts_with("data:text/csv; charset=utf-8;base64,"));
        let parsed = MediaReference::parse(&uri).unwrap();
        assert_eq!(parsed.mime_type(), Some("text/csv; charset=utf-8"));
        assert_eq!(parsed.decode_inline().unwrap(), b"name,role\n".to_vec());
    }

    #[test]
    fn serializes_as_a_tagged_union() {
        let media = MediaReference::remote("https://cdn.example.org/a.png").unwrap();
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["kind"], "remote-url");

        let inline = MediaReference::inline("image/png", b"x").unwrap();
        let json = serde_json::to_value(&inline).unwrap();
        assert_eq!(json["kind"], "inline-data");
        assert_eq!(json["mimeType"], "image/png");
    }
}
