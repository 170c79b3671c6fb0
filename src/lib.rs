#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Repository URL parsing, normalization and validation.
//!
//! The central type is [`RepoUrl`], an immutable value representing the
//! location of a version-control repository: the network schemes plus the
//! local `file` pseudo-scheme. Parsing applies strict canonicalization
//! rules (lowercased scheme and host, collapsed path, default-port
//! resolution) and rejects anything it cannot represent losslessly, so a
//! `RepoUrl` round-trips through its string rendering.
//!
//! ```
//! use repo_url::RepoUrl;
//!
//! let url = RepoUrl::parse("svn://user@example.com/repo/trunk/")?;
//! assert_eq!(url.scheme(), "svn");
//! assert_eq!(url.user_info(), Some("user"));
//! assert_eq!(url.port(), 3690);
//! assert!(!url.has_port());
//! assert_eq!(url.path(), "/repo/trunk");
//! assert_eq!(url.as_str(), "svn://user@example.com/repo/trunk");
//! # Ok::<_, repo_url::InvalidUrlError>(())
//! ```
//!
//! Which schemes are accepted, and which port they default to, is decided
//! by a [`PortRegistry`]. A process-wide registry seeded with the well
//! known schemes backs the plain constructors; every constructor also has
//! an `*_in` variant taking an explicit registry. Any scheme starting
//! with `svn+` is accepted without registration.
//!
//! # Feature flags
//!
//! - `serde`: string-form `Serialize` and `Deserialize` impls for
//!   [`RepoUrl`]. The persisted form is the *decoded* rendering.

mod encoding;
mod error;
mod fmt;
mod parser;
mod path;
mod registry;

pub use encoding::EStr;
pub use error::{InvalidUrlError, InvalidUrlErrorKind};
pub use registry::PortRegistry;

use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use encoding::{auto_encode, encode};

type Result<T, E = InvalidUrlError> = core::result::Result<T, E>;

/// A validated repository URL.
///
/// A `RepoUrl` is immutable: the derivation methods ([`append_path`],
/// [`set_path`], [`remove_path_tail`]) return a new value and never touch
/// the original, so values can be shared freely across threads.
///
/// [`append_path`]: Self::append_path
/// [`set_path`]: Self::set_path
/// [`remove_path_tail`]: Self::remove_path_tail
///
/// # Canonical form
///
/// The encoded rendering follows the grammar
///
/// ```text
/// scheme "://" [ userinfo "@" ] [ host ] [ ":" port ] path
/// ```
///
/// with the port omitted when it is the scheme's registered default and
/// was not spelled out in the input.
///
/// # Comparison
///
/// Two values are equal iff their scheme, host, port, decoded path, user
/// info and [`has_port`](Self::has_port) flag all agree. In particular,
/// `svn://example.com/r` and `svn://example.com:3690/r` are *not* equal:
/// one names the default port explicitly and the other does not.
#[derive(Clone)]
pub struct RepoUrl {
    scheme: String,
    user_info: Option<String>,
    host: Option<String>,
    port: i32,
    is_default_port: bool,
    path: String,
    encoded_path: String,
    rendered: OnceLock<String>,
}

impl RepoUrl {
    /// Parses a URL whose path is already percent-encoded.
    ///
    /// The scheme must be registered in the global [`PortRegistry`] or
    /// start with `svn+`.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidUrlError`] if the string has no `scheme://`
    /// prefix, the scheme is unsupported, the authority cannot be split,
    /// the host is empty for a network scheme, or a path segment equals
    /// `..`.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_url::RepoUrl;
    ///
    /// let url = RepoUrl::parse("http://example.com/a%20b/")?;
    /// assert_eq!(url.path(), "/a b");
    /// assert_eq!(url.encoded_path().as_str(), "/a%20b");
    /// # Ok::<_, repo_url::InvalidUrlError>(())
    /// ```
    pub fn parse(url: &str) -> Result<RepoUrl> {
        parser::parse(url, true, PortRegistry::global())
    }

    /// Like [`parse`](Self::parse), against the given registry.
    pub fn parse_in(url: &str, registry: &PortRegistry) -> Result<RepoUrl> {
        parser::parse(url, true, registry)
    }

    /// Parses a URL whose path is raw, percent-encoding it on the way in.
    #[deprecated = "parse the percent-encoded form with `parse` instead"]
    pub fn parse_decoded(url: &str) -> Result<RepoUrl> {
        parser::parse(url, false, PortRegistry::global())
    }

    /// Like [`parse_decoded`](Self::parse_decoded), against the given
    /// registry.
    #[deprecated = "parse the percent-encoded form with `parse_in` instead"]
    pub fn parse_decoded_in(url: &str, registry: &PortRegistry) -> Result<RepoUrl> {
        parser::parse(url, false, registry)
    }

    /// Builds a URL from components.
    ///
    /// A missing scheme defaults to `http` and a missing path to `/`.
    /// `path_encoded` declares the path already percent-encoded; existing
    /// escapes are then preserved instead of being escaped again. The
    /// components are composed into a canonical string and re-parsed, so
    /// this agrees with [`parse`](Self::parse) in every detail.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidUrlError`] if the host is missing for a
    /// non-`file` scheme or contains `@` or `/`, if the user info
    /// contains `/`, or if the composed URL fails to parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_url::RepoUrl;
    ///
    /// let url = RepoUrl::from_parts(
    ///     Some("HTTP"),
    ///     None,
    ///     Some("Example.COM"),
    ///     -1,
    ///     Some("/a/"),
    ///     false,
    /// )?;
    /// assert_eq!(url.scheme(), "http");
    /// assert_eq!(url.host(), Some("example.com"));
    /// assert_eq!(url.as_str(), "http://example.com/a");
    /// # Ok::<_, repo_url::InvalidUrlError>(())
    /// ```
    pub fn from_parts(
        scheme: Option<&str>,
        user_info: Option<&str>,
        host: Option<&str>,
        port: i32,
        path: Option<&str>,
        path_encoded: bool,
    ) -> Result<RepoUrl> {
        Self::from_parts_in(
            scheme,
            user_info,
            host,
            port,
            path,
            path_encoded,
            PortRegistry::global(),
        )
    }

    /// Like [`from_parts`](Self::from_parts), against the given registry.
    pub fn from_parts_in(
        scheme: Option<&str>,
        user_info: Option<&str>,
        host: Option<&str>,
        port: i32,
        path: Option<&str>,
        path_encoded: bool,
        registry: &PortRegistry,
    ) -> Result<RepoUrl> {
        let raw_is_file = scheme.is_some_and(|s| s.eq_ignore_ascii_case("file"));
        if (host.is_none() && !raw_is_file) || host.is_some_and(|h| h.contains('@')) {
            return Err(InvalidUrlError::new(
                InvalidUrlErrorKind::InvalidHost,
                host.unwrap_or_default(),
            ));
        }

        let path = path.unwrap_or("/");
        let mut path = if path_encoded {
            auto_encode(path)
        } else {
            encode(path)
        };
        if !path.is_empty() && !path.starts_with('/') {
            path.insert(0, '/');
        }
        if path.ends_with('/') {
            path.pop();
        }

        let scheme = match scheme {
            Some(scheme) => scheme.to_ascii_lowercase(),
            None => "http".to_owned(),
        };

        if let Some(user_info) = user_info {
            if user_info.contains('/') {
                return Err(InvalidUrlError::new(
                    InvalidUrlErrorKind::InvalidUserInfo,
                    user_info,
                ));
            }
        }
        if scheme != "file" {
            match host {
                None => {
                    return Err(InvalidUrlError::new(InvalidUrlErrorKind::InvalidHost, ""));
                }
                Some(host) if host.contains('/') => {
                    return Err(InvalidUrlError::new(InvalidUrlErrorKind::InvalidHost, host));
                }
                _ => {}
            }
        }

        let url = compose(&scheme, user_info, host, port, &path);
        parser::parse(&url, true, registry)
    }

    /// Builds a `file` URL from a local filesystem path.
    ///
    /// A relative path is made absolute against the current directory;
    /// nothing else on the filesystem is consulted. On backslash
    /// platforms a UNC path contributes its first element as the host,
    /// and separators become `/`.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidUrlError`] if the current directory is needed
    /// but unavailable, or if the resulting URL fails to parse (for
    /// instance when the path contains a `..` element).
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_url::RepoUrl;
    ///
    /// let url = RepoUrl::from_file_path("/var/svn/repo")?;
    /// assert_eq!(url.scheme(), "file");
    /// assert_eq!(url.host(), Some(""));
    /// assert_eq!(url.path(), "/var/svn/repo");
    /// assert_eq!(url.as_str(), "file:///var/svn/repo");
    /// # Ok::<_, repo_url::InvalidUrlError>(())
    /// ```
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> Result<RepoUrl> {
        Self::from_file_path_in(path, PortRegistry::global())
    }

    /// Like [`from_file_path`](Self::from_file_path), against the given
    /// registry.
    pub fn from_file_path_in<P: AsRef<Path>>(path: P, registry: &PortRegistry) -> Result<RepoUrl> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let cwd = std::env::current_dir().map_err(|_| {
                InvalidUrlError::new(
                    InvalidUrlErrorKind::Malformed,
                    path.display().to_string(),
                )
            })?;
            cwd.join(path)
        };

        let text = absolute.to_string_lossy();
        let (host, mut file_path) = path::split_file_host(&text, cfg!(windows));
        if !file_path.starts_with('/') {
            file_path.insert(0, '/');
        }
        Self::from_parts_in(
            Some("file"),
            None,
            host.as_deref(),
            -1,
            Some(&file_path),
            false,
            registry,
        )
    }

    /// Returns the scheme, always lowercase.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the user info part of the authority, raw and undecoded.
    #[must_use]
    pub fn user_info(&self) -> Option<&str> {
        self.user_info.as_deref()
    }

    /// Returns the host, always lowercase.
    ///
    /// A `file` URL without an explicit host reports `Some("")`.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns the resolved port.
    ///
    /// When the input spelled no port, this is the scheme's registered
    /// default, or `0` for an unregistered `svn+` scheme. A `file` URL
    /// without a port reports `-1`.
    #[must_use]
    pub fn port(&self) -> i32 {
        self.port
    }

    /// Whether the port was spelled out rather than resolved from the
    /// registry.
    #[must_use]
    pub fn has_port(&self) -> bool {
        !self.is_default_port
    }

    /// Returns the decoded path: leading `/`, no trailing `/`, the root
    /// collapsed to `""`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the percent-encoded counterpart of [`path`](Self::path).
    #[must_use]
    pub fn encoded_path(&self) -> &EStr {
        EStr::new_validated(&self.encoded_path)
    }

    /// Returns the canonical encoded rendering.
    ///
    /// The rendering is composed once and memoized; `Display` shows the
    /// same string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.rendered.get_or_init(|| {
            compose(
                &self.scheme,
                self.user_info.as_deref(),
                self.host.as_deref(),
                self.explicit_port(),
                &self.encoded_path,
            )
        })
    }

    /// Composes the rendering over the decoded path.
    ///
    /// This is the form persisted by the serde impls.
    #[must_use]
    pub fn to_decoded_string(&self) -> String {
        compose(
            &self.scheme,
            self.user_info.as_deref(),
            self.host.as_deref(),
            self.explicit_port(),
            &self.path,
        )
    }

    /// Returns a new URL with `segment` joined onto the path.
    ///
    /// An empty segment yields a clone of `self`. The segment may span
    /// several `/`-separated elements; `path_encoded` declares it already
    /// percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidUrlError`] if the segment introduces a `..`
    /// element.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_url::RepoUrl;
    ///
    /// let url = RepoUrl::parse("http://example.com/repo")?;
    /// let tagged = url.append_path("tags/1.0", false)?;
    /// assert_eq!(tagged.as_str(), "http://example.com/repo/tags/1.0");
    ///
    /// let spaced = url.append_path("a b", false)?;
    /// assert_eq!(spaced.encoded_path().as_str(), "/repo/a%20b");
    /// # Ok::<_, repo_url::InvalidUrlError>(())
    /// ```
    pub fn append_path(&self, segment: &str, path_encoded: bool) -> Result<RepoUrl> {
        self.append_path_in(segment, path_encoded, PortRegistry::global())
    }

    /// Like [`append_path`](Self::append_path), against the given
    /// registry.
    pub fn append_path_in(
        &self,
        segment: &str,
        path_encoded: bool,
        registry: &PortRegistry,
    ) -> Result<RepoUrl> {
        if segment.is_empty() {
            return Ok(self.clone());
        }
        let segment = if path_encoded {
            auto_encode(segment)
        } else {
            encode(segment)
        };
        let path = if self.encoded_path.is_empty() {
            format!("/{segment}")
        } else {
            path::append(&self.encoded_path, &segment)
        };
        self.recompose(&path, true, registry)
    }

    /// Returns a new URL with the path replaced.
    ///
    /// An empty path means the root. `path_encoded` declares the path
    /// already percent-encoded.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidUrlError`] if the path contains a `..`
    /// element.
    pub fn set_path(&self, path: &str, path_encoded: bool) -> Result<RepoUrl> {
        self.set_path_in(path, path_encoded, PortRegistry::global())
    }

    /// Like [`set_path`](Self::set_path), against the given registry.
    pub fn set_path_in(
        &self,
        path: &str,
        path_encoded: bool,
        registry: &PortRegistry,
    ) -> Result<RepoUrl> {
        let path = if path.is_empty() { "/" } else { path };
        let path = if path_encoded {
            auto_encode(path)
        } else {
            encode(path)
        };
        self.recompose(&path, true, registry)
    }

    /// Returns a new URL with the last path segment removed.
    ///
    /// ```
    /// use repo_url::RepoUrl;
    ///
    /// let url = RepoUrl::parse("svn://example.com/repo/trunk")?;
    /// let parent = url.remove_path_tail()?;
    /// assert_eq!(parent.as_str(), "svn://example.com/repo");
    /// assert_eq!(parent.remove_path_tail()?.path(), "");
    /// # Ok::<_, repo_url::InvalidUrlError>(())
    /// ```
    pub fn remove_path_tail(&self) -> Result<RepoUrl> {
        self.remove_path_tail_in(PortRegistry::global())
    }

    /// Like [`remove_path_tail`](Self::remove_path_tail), against the
    /// given registry.
    pub fn remove_path_tail_in(&self, registry: &PortRegistry) -> Result<RepoUrl> {
        let path = path::remove_tail(&self.path).to_owned();
        self.recompose(&path, false, registry)
    }

    /// Composes a sibling URL around the given path and re-parses it.
    fn recompose(&self, path: &str, path_encoded: bool, registry: &PortRegistry) -> Result<RepoUrl> {
        let url = compose(
            &self.scheme,
            self.user_info.as_deref(),
            self.host.as_deref(),
            self.explicit_port(),
            path,
        );
        parser::parse(&url, path_encoded, registry)
    }

    /// The port as spelled in the rendering: `-1` when it is implied.
    fn explicit_port(&self) -> i32 {
        if self.is_default_port {
            -1
        } else {
            self.port
        }
    }
}

/// Composes `scheme "://" [userinfo "@"] [host] [":" port] path`.
///
/// A negative port is omitted. The path gains a leading `/` if it lacks
/// one, and a bare `/` renders as nothing unless the scheme is `file`.
fn compose(
    scheme: &str,
    user_info: Option<&str>,
    host: Option<&str>,
    port: i32,
    path: &str,
) -> String {
    let mut url = String::with_capacity(scheme.len() + path.len() + 16);
    url.push_str(scheme);
    url.push_str("://");
    if let Some(user_info) = user_info {
        url.push_str(user_info);
        url.push('@');
    }
    if let Some(host) = host {
        url.push_str(host);
    }
    if port >= 0 {
        url.push(':');
        url.push_str(&port.to_string());
    }
    if path.is_empty() || path == "/" {
        // The bare root renders as nothing, except under file.
        if scheme == "file" {
            url.push('/');
        }
    } else {
        if !path.starts_with('/') {
            url.push('/');
        }
        url.push_str(path);
    }
    url
}

impl PartialEq for RepoUrl {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme
            && self.port == other.port
            && self.host == other.host
            && self.path == other.path
            && self.is_default_port == other.is_default_port
            && self.user_info == other.user_info
    }
}

impl Eq for RepoUrl {}

impl core::hash::Hash for RepoUrl {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.scheme.hash(state);
        self.host.hash(state);
        self.path.hash(state);
        self.port.hash(state);
        self.user_info.hash(state);
    }
}

impl FromStr for RepoUrl {
    type Err = InvalidUrlError;

    /// Equivalent to [`RepoUrl::parse`].
    fn from_str(s: &str) -> Result<RepoUrl> {
        RepoUrl::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RepoUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_decoded_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RepoUrl {
    fn deserialize<D>(deserializer: D) -> Result<RepoUrl, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        use serde::Deserialize;

        let s = String::deserialize(deserializer)?;
        parser::parse(&s, false, PortRegistry::global()).map_err(|e| {
            D::Error::custom(format_args!("corrupted repository URL {s:?}: {e}"))
        })
    }
}
