use core::fmt;

use crate::RepoUrl;

impl fmt::Debug for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoUrl")
            .field("scheme", &self.scheme())
            .field("user_info", &self.user_info())
            .field("host", &self.host())
            .field("port", &self.port())
            .field("path", &self.path())
            .finish()
    }
}

impl fmt::Display for RepoUrl {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_str(), f)
    }
}
