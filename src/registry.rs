//! The default-port registry.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// A mapping from scheme name to default port number.
///
/// A process-wide instance seeded with the well-known repository schemes
/// is available through [`global`](PortRegistry::global); the `*_in`
/// constructors on [`RepoUrl`] accept any other instance, so tests can
/// work against an isolated registry.
///
/// All reads and writes go through a single lock and are safe to issue
/// from any thread.
///
/// [`RepoUrl`]: crate::RepoUrl
///
/// # Examples
///
/// ```
/// use repo_url::{PortRegistry, RepoUrl};
///
/// let registry = PortRegistry::new();
/// registry.register("git", 9418);
///
/// let url = RepoUrl::parse_in("git://example.com/repo.git", &registry)?;
/// assert_eq!(url.port(), 9418);
/// assert!(!url.has_port());
/// # Ok::<_, repo_url::InvalidUrlError>(())
/// ```
#[derive(Debug)]
pub struct PortRegistry {
    ports: Mutex<HashMap<String, i32>>,
}

impl PortRegistry {
    /// Creates a registry pre-seeded with the well-known schemes:
    /// `svn` (3690), `svn+ssh` (22), `http` (80), `https` (443) and
    /// `file` (0).
    #[must_use]
    pub fn new() -> PortRegistry {
        let mut ports = HashMap::new();
        ports.insert("svn".to_owned(), 3690);
        ports.insert("svn+ssh".to_owned(), 22);
        ports.insert("http".to_owned(), 80);
        ports.insert("https".to_owned(), 443);
        ports.insert("file".to_owned(), 0);
        PortRegistry {
            ports: Mutex::new(ports),
        }
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn global() -> &'static PortRegistry {
        static GLOBAL: OnceLock<PortRegistry> = OnceLock::new();
        GLOBAL.get_or_init(PortRegistry::new)
    }

    /// Returns the default port for a scheme, or `-1` if the scheme is
    /// unknown or is `file`.
    ///
    /// The scheme is lowercased before lookup. Note that `file` maps to
    /// `0` in the registry itself, yet this method reports `-1` for it;
    /// `file` URLs never take their port from the registry.
    #[must_use]
    pub fn default_port(&self, scheme: &str) -> i32 {
        let scheme = scheme.to_ascii_lowercase();
        if scheme == "file" {
            return -1;
        }
        self.lock().get(&scheme).copied().unwrap_or(-1)
    }

    /// Registers a default port for a scheme, or removes the scheme if
    /// `port` is negative.
    ///
    /// The scheme is stored lowercase, matching the lookup side.
    ///
    /// ```
    /// use repo_url::PortRegistry;
    ///
    /// let registry = PortRegistry::new();
    /// assert_eq!(registry.default_port("svn"), 3690);
    ///
    /// registry.register("svn", -1);
    /// assert_eq!(registry.default_port("svn"), -1);
    ///
    /// registry.register("svn", 3690);
    /// assert_eq!(registry.default_port("svn"), 3690);
    /// ```
    pub fn register(&self, scheme: &str, port: i32) {
        let scheme = scheme.to_ascii_lowercase();
        let mut ports = self.lock();
        if port >= 0 {
            ports.insert(scheme, port);
        } else {
            ports.remove(&scheme);
        }
    }

    /// Whether the scheme has an entry, `file` included.
    pub(crate) fn is_registered(&self, scheme: &str) -> bool {
        self.lock().contains_key(scheme)
    }

    /// The raw registry entry, with no `file` special case.
    pub(crate) fn lookup(&self, scheme: &str) -> Option<i32> {
        self.lock().get(scheme).copied()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, i32>> {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PortRegistry {
    fn default() -> Self {
        PortRegistry::new()
    }
}
