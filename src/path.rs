//! Pure path string helpers.
//!
//! These never inspect filesystem state; same input, same output.

use crate::error::{InvalidUrlError, InvalidUrlErrorKind};

/// Normalizes a URL path: splits on `/`, drops empty and `.` segments,
/// and rejects `..` segments outright.
///
/// The presence or absence of a leading `/` is preserved. `url` is the
/// full URL the path came from, used only for error reporting.
pub(crate) fn normalize(url: &str, path: &str) -> Result<String, InvalidUrlError> {
    let mut result = String::with_capacity(path.len());
    for token in path.split('/') {
        if token.is_empty() || token == "." {
            continue;
        }
        if token == ".." {
            return Err(InvalidUrlError::new(InvalidUrlErrorKind::DotDotSegment, url));
        }
        result.push('/');
        result.push_str(token);
    }
    if !path.starts_with('/') && !result.is_empty() {
        result.remove(0);
    }
    Ok(result)
}

/// Returns `true` if any `/`-delimited segment of `path` equals `..`.
pub(crate) fn has_dot_dot(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

/// Joins `segment` onto `path` with exactly one `/` between them.
pub(crate) fn append(path: &str, segment: &str) -> String {
    let base = path.strip_suffix('/').unwrap_or(path);
    let segment = segment.strip_prefix('/').unwrap_or(segment);
    format!("{base}/{segment}")
}

/// Strips the final `/`-delimited segment, returning everything before
/// the last `/`, or `""` if there is none.
pub(crate) fn remove_tail(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Splits an absolute filesystem path into an optional UNC host and a
/// `/`-separated path, mirroring how a local repository path becomes a
/// `file` URL.
///
/// `windows` selects the backslash-separator rules; it is a parameter so
/// the split stays testable on every platform.
pub(crate) fn split_file_host(path: &str, windows: bool) -> (Option<String>, String) {
    if (windows && path.starts_with("//")) || path.starts_with("\\\\") {
        let norm = path.replace('\\', "/");
        let rest = &norm[2..];
        let end = match rest.find('/') {
            Some(i) if i > 0 => i,
            _ => rest.len(),
        };
        let host = rest[..end].to_owned();
        (Some(host), rest[end..].to_owned())
    } else if windows {
        (None, path.replace('\\', "/"))
    } else {
        (None, path.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_segments() {
        assert_eq!(normalize("u", "/a/b").unwrap(), "/a/b");
        assert_eq!(normalize("u", "/a//b/").unwrap(), "/a/b");
        assert_eq!(normalize("u", "/a/./b").unwrap(), "/a/b");
        assert_eq!(normalize("u", "a/b").unwrap(), "a/b");
        assert_eq!(normalize("u", "").unwrap(), "");
        assert_eq!(normalize("u", "/").unwrap(), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for path in ["/a/b", "a/b/c", "", "/x"] {
            let once = normalize("u", path).unwrap();
            assert_eq!(normalize("u", &once).unwrap(), once);
        }
    }

    #[test]
    fn normalize_rejects_dot_dot() {
        let err = normalize("u", "/a/../b").unwrap_err();
        assert_eq!(err.kind(), InvalidUrlErrorKind::DotDotSegment);
        assert!(normalize("u", "..").is_err());
    }

    #[test]
    fn appends_with_single_slash() {
        assert_eq!(append("/a", "b"), "/a/b");
        assert_eq!(append("/a/", "/b"), "/a/b");
        assert_eq!(append("", "b"), "/b");
    }

    #[test]
    fn removes_tail_segment() {
        assert_eq!(remove_tail("/a/b"), "/a");
        assert_eq!(remove_tail("/a"), "");
        assert_eq!(remove_tail(""), "");
    }

    #[test]
    fn splits_unc_host() {
        assert_eq!(
            split_file_host(r"\\server\share\repo", true),
            (Some("server".to_owned()), "/share/repo".to_owned())
        );
        assert_eq!(
            split_file_host("//server/share", true),
            (Some("server".to_owned()), "/share".to_owned())
        );
        assert_eq!(
            split_file_host(r"C:\svn\repo", true),
            (None, "C:/svn/repo".to_owned())
        );
        assert_eq!(
            split_file_host("/var/svn/repo", false),
            (None, "/var/svn/repo".to_owned())
        );
    }
}
