use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a registered function, formatted `<namespace>-<index>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionId(Cow<'static, str>);

impl FunctionId {
    pub fn new(namespace: &str, index: u32) -> Self {
        Self(Cow::Owned(format!("{namespace}-{index}")))
    }

    /// Used for the built-in ids, which are known at compile time.
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace part, i.e. everything before the last `-`.
    pub fn namespace(&self) -> &str {
        self.0.rsplit_once('-').map(|(ns, _)| ns).unwrap_or(&self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
