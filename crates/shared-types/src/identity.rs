//! # Application Identity Rules
//!
//! An application registers under an `app_id` such as `konsole-4711`. The
//! part before the first `-` is its plain name (`konsole`) and is used for
//! fallback lookup when a caller addresses an application without a suffix.

/// Identity serviced by the router itself (registration, discovery, signals).
pub const SERVER_APP_ID: &str = "DeskRelay";

/// Truncate an application id at its first `-`.
#[must_use]
pub fn plain_app_id(app_id: &str) -> &str {
    match app_id.split_once('-') {
        Some((plain, _)) => plain,
        None => app_id,
    }
}

/// True when `app_id` would shadow the server identity.
#[must_use]
pub fn is_reserved_app_id(app_id: &str) -> bool {
    plain_app_id(app_id) == SERVER_APP_ID
}

/// A `prefix*` multicast target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastPattern<'a> {
    prefix: &'a str,
}

impl<'a> MulticastPattern<'a> {
    /// Parse a target identity; `None` unless it ends with `*`.
    #[must_use]
    pub fn parse(target: &'a str) -> Option<Self> {
        target
            .strip_suffix('*')
            .map(|prefix| Self { prefix })
    }

    /// Pattern matching every id that starts with `prefix`.
    #[must_use]
    pub const fn from_prefix(prefix: &'a str) -> Self {
        Self { prefix }
    }

    /// The literal prefix preceding `*` (may be empty).
    #[must_use]
    pub fn prefix(&self) -> &'a str {
        self.prefix
    }

    /// True when `app_id` starts with the prefix.
    #[must_use]
    pub fn matches(&self, app_id: &str) -> bool {
        app_id.starts_with(self.prefix)
    }
}
