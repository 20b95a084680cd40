use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "stock_history.view"). The wildcard
/// `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// View stock history records and the history panel.
    pub const VIEW_HISTORY: Permission = Permission(Cow::Borrowed("stock_history.view"));

    /// Change plugin settings.
    pub const CHANGE_SETTINGS: Permission =
        Permission(Cow::Borrowed("stock_history.settings.change"));

    /// Trigger a snapshot run by hand.
    pub const RUN_SNAPSHOT: Permission = Permission(Cow::Borrowed("stock_history.snapshot.run"));

    /// Forward host events (part created/deleted) to the service.
    pub const POST_EVENTS: Permission = Permission(Cow::Borrowed("stock_history.events.post"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
