//! The parse pipeline shared by every construction entry point.

use std::sync::OnceLock;

use crate::encoding::{auto_encode, decode, encode, table};
use crate::error::{InvalidUrlError, InvalidUrlErrorKind};
use crate::path;
use crate::registry::PortRegistry;
use crate::RepoUrl;

struct Parts {
    user_info: Option<String>,
    host: Option<String>,
    port: i32,
    is_default_port: bool,
    path: String,
    encoded_path: String,
}

/// Parses a URL string into a [`RepoUrl`].
///
/// `path_encoded` tells whether the path portion of the input is already
/// percent-encoded.
pub(crate) fn parse(
    url: &str,
    path_encoded: bool,
    registry: &PortRegistry,
) -> Result<RepoUrl, InvalidUrlError> {
    let url = url.strip_suffix('/').unwrap_or(url);

    let index = match url.find("://") {
        Some(i) if i > 0 => i,
        _ => return Err(malformed(url)),
    };
    let scheme = url[..index].to_ascii_lowercase();
    if !registry.is_registered(&scheme) && !scheme.starts_with("svn+") {
        return Err(InvalidUrlError::new(
            InvalidUrlErrorKind::UnsupportedScheme,
            url,
        ));
    }

    let rest = &url[index + 3..];
    let mut parts = if scheme == "file" {
        parse_file(url, rest, path_encoded)?
    } else {
        parse_generic(url, rest, path_encoded, &scheme, registry)?
    };

    // A segment may decode to ".."; the normalization pass cannot see it.
    if path::has_dot_dot(&parts.path) {
        return Err(InvalidUrlError::new(InvalidUrlErrorKind::DotDotSegment, url));
    }

    if parts.encoded_path == "/" {
        parts.encoded_path.clear();
        parts.path.clear();
    }

    if let Some(host) = &mut parts.host {
        host.make_ascii_lowercase();
    }

    Ok(RepoUrl {
        scheme,
        user_info: parts.user_info,
        host: parts.host,
        port: parts.port,
        is_default_port: parts.is_default_port,
        path: parts.path,
        encoded_path: parts.encoded_path,
        rendered: OnceLock::new(),
    })
}

/// The `file` branch: the remainder is normalized as a whole, then split
/// at the first `/` into host and path. User info and a port embedded in
/// the host part are recovered through the authority splitter, while the
/// host field keeps the entire pre-slash text.
fn parse_file(url: &str, rest: &str, path_encoded: bool) -> Result<Parts, InvalidUrlError> {
    let normalized = path::normalize(url, rest)?;
    let slash = match normalized.find('/') {
        None if !normalized.is_empty() => {
            return Err(InvalidUrlError::new(InvalidUrlErrorKind::HostnameOnly, url));
        }
        other => other.unwrap_or(0),
    };
    let (host, raw_path) = normalized.split_at(slash);
    let authority = split_authority(url, host)?;

    let raw_path = raw_path.replace('\\', "/");
    let raw_path = if raw_path.starts_with('/') {
        raw_path
    } else {
        format!("/{raw_path}")
    };

    let (path, encoded_path) = derive_paths(raw_path, path_encoded);

    Ok(Parts {
        user_info: authority.user_info,
        host: Some(host.to_owned()),
        port: authority.port.unwrap_or(-1),
        is_default_port: false,
        path,
        encoded_path,
    })
}

/// The generic branch: authority and path split at the first `/`, with
/// the port resolved from the registry when absent.
fn parse_generic(
    url: &str,
    rest: &str,
    path_encoded: bool,
    scheme: &str,
    registry: &PortRegistry,
) -> Result<Parts, InvalidUrlError> {
    let slash = rest.find('/');
    let (authority_text, raw_path) = match slash {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    let authority = split_authority(url, authority_text)?;
    if authority.host.is_empty() {
        return Err(malformed(url));
    }

    let lookup_path = strip_query(raw_path);
    let normalized = path::normalize(url, &lookup_path)?;

    let (path, encoded_path) = if path_encoded {
        derive_paths(normalized, true)
    } else {
        // The raw path is re-derived from the original input, not from
        // the normalized view; the normalization above only validates.
        let original = match slash {
            Some(i) => &rest[i + 1..],
            None => "",
        };
        let raw = if original.starts_with('/') {
            original.to_owned()
        } else {
            format!("/{original}")
        };
        derive_paths(raw, false)
    };

    let (port, is_default_port) = match authority.port {
        Some(port) => (port, false),
        None => (registry.lookup(scheme).unwrap_or(0), true),
    };

    Ok(Parts {
        user_info: authority.user_info,
        host: Some(authority.host.to_owned()),
        port,
        is_default_port,
        path,
        encoded_path,
    })
}

/// Derives the consistent (decoded, encoded) path pair from a raw path,
/// which is taken as already percent-encoded when `path_encoded` holds.
fn derive_paths(raw: String, path_encoded: bool) -> (String, String) {
    if path_encoded {
        let encoded = auto_encode(&raw);
        debug_assert!(table::PATH.validate(encoded.as_bytes()));
        let path = decode(&encoded);
        (path, encoded)
    } else {
        let encoded = encode(&raw);
        (raw, encoded)
    }
}

struct Authority<'a> {
    user_info: Option<String>,
    host: &'a str,
    port: Option<i32>,
}

/// Splits `[userinfo@]host[:port]`. User info ends at the last `@`; the
/// port starts after the last `:`, or after the bracket of an IP literal.
fn split_authority<'a>(url: &str, text: &'a str) -> Result<Authority<'a>, InvalidUrlError> {
    let (user_info, host_port) = match text.rfind('@') {
        Some(i) => (Some(text[..i].to_owned()), &text[i + 1..]),
        None => (None, text),
    };

    let (host, port_text) = if host_port.starts_with('[') {
        let end = host_port.find(']').ok_or_else(|| malformed(url))?;
        let after = &host_port[end + 1..];
        if after.is_empty() {
            (host_port, None)
        } else if let Some(port) = after.strip_prefix(':') {
            (&host_port[..=end], Some(port))
        } else {
            return Err(malformed(url));
        }
    } else {
        match host_port.rfind(':') {
            Some(i) => (&host_port[..i], Some(&host_port[i + 1..])),
            None => (host_port, None),
        }
    };

    let port = match port_text {
        None | Some("") => None,
        Some(text) => {
            let port: i32 = text.parse().map_err(|_| malformed(url))?;
            if port < 0 {
                return Err(malformed(url));
            }
            Some(port)
        }
    };

    Ok(Authority {
        user_info,
        host,
        port,
    })
}

/// Drops the query and folds a fragment back into the path, the way the
/// original generic URL parser reported paths.
fn strip_query(raw: &str) -> String {
    match raw.find('#') {
        Some(hash) => {
            let (before, fragment) = (&raw[..hash], &raw[hash + 1..]);
            let path = before.find('?').map_or(before, |q| &before[..q]);
            format!("{path}#{fragment}")
        }
        None => raw.find('?').map_or(raw, |q| &raw[..q]).to_owned(),
    }
}

fn malformed(url: &str) -> InvalidUrlError {
    InvalidUrlError::new(InvalidUrlErrorKind::Malformed, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_authority() {
        let auth = split_authority("u", "user:pw@host.tld:8080").unwrap();
        assert_eq!(auth.user_info.as_deref(), Some("user:pw"));
        assert_eq!(auth.host, "host.tld");
        assert_eq!(auth.port, Some(8080));

        let auth = split_authority("u", "host.tld").unwrap();
        assert_eq!(auth.user_info, None);
        assert_eq!(auth.port, None);

        // An empty port reads as no port.
        let auth = split_authority("u", "host.tld:").unwrap();
        assert_eq!(auth.port, None);

        assert!(split_authority("u", "host.tld:abc").is_err());
        assert!(split_authority("u", "host.tld:-1").is_err());
    }

    #[test]
    fn splits_ip_literal_authority() {
        let auth = split_authority("u", "[::1]:3690").unwrap();
        assert_eq!(auth.host, "[::1]");
        assert_eq!(auth.port, Some(3690));

        let auth = split_authority("u", "user@[::1]").unwrap();
        assert_eq!(auth.user_info.as_deref(), Some("user"));
        assert_eq!(auth.host, "[::1]");
        assert_eq!(auth.port, None);

        assert!(split_authority("u", "[::1").is_err());
        assert!(split_authority("u", "[::1]x").is_err());
    }

    #[test]
    fn strips_query_and_folds_fragment() {
        assert_eq!(strip_query("/p"), "/p");
        assert_eq!(strip_query("/p?q=1"), "/p");
        assert_eq!(strip_query("/p?q=1#frag"), "/p#frag");
        assert_eq!(strip_query("/p#frag"), "/p#frag");
    }
}
