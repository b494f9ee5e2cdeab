//! Tagging convention used to discover load-balancing groups
//!
//! Group declarations live inside the proxy engine's own document and are
//! recognised purely by their tags:
//!
//! ```text
//! outbound  <prefix><group><out_suffix>        -> group listen port
//! inbound   <prefix><group><in_mark><index>    -> group backend port
//! ```

use serde::{Deserialize, Serialize};

/// Default tag prefix
pub const DEFAULT_PREFIX: &str = "sys-rr-";
/// Default suffix of a group-listen tag
pub const DEFAULT_OUT_SUFFIX: &str = "-lb";
/// Default marker separating group id and index in a backend tag
pub const DEFAULT_IN_MARK: &str = "-in-";
/// Default declaration kind for both collections
pub const DEFAULT_KIND: &str = "socks";
/// Default loopback host a listen declaration must target
pub const DEFAULT_LOOPBACK: &str = "127.0.0.1";

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_out_suffix() -> String {
    DEFAULT_OUT_SUFFIX.to_string()
}

fn default_in_mark() -> String {
    DEFAULT_IN_MARK.to_string()
}

fn default_kind() -> String {
    DEFAULT_KIND.to_string()
}

fn default_loopback() -> String {
    DEFAULT_LOOPBACK.to_string()
}

/// Private tagging convention shared with whoever writes the document
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TagConvention {
    /// Prefix common to every relay-owned tag
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Suffix of a group-listen (outbound) tag
    #[serde(default = "default_out_suffix")]
    pub out_suffix: String,

    /// Marker between group id and index in a group-backend (inbound) tag
    #[serde(default = "default_in_mark")]
    pub in_mark: String,

    /// Declaration `type` both collections must carry
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Host a group-listen declaration must point at
    #[serde(default = "default_loopback")]
    pub loopback: String,
}

impl Default for TagConvention {
    fn default() -> Self {
        TagConvention {
            prefix: default_prefix(),
            out_suffix: default_out_suffix(),
            in_mark: default_in_mark(),
            kind: default_kind(),
            loopback: default_loopback(),
        }
    }
}

impl TagConvention {
    /// Group id of a group-listen tag, if the tag is one
    pub fn listen_group<'a>(&self, tag: &'a str) -> Option<&'a str> {
        tag.strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.out_suffix.as_str())
    }

    /// Group id and index of a group-backend tag, if the tag is one
    ///
    /// The split happens at the last occurrence of the marker, so a group id
    /// may itself contain the marker.
    pub fn backend_member<'a>(&self, tag: &'a str) -> Option<(&'a str, i64)> {
        let rest = tag.strip_prefix(self.prefix.as_str())?;
        let (group, index) = rest.rsplit_once(self.in_mark.as_str())?;
        let index = index.trim().parse::<i64>().ok()?;
        Some((group, index))
    }

    /// Build the group-listen tag for a group id
    pub fn listen_tag(&self, group: &str) -> String {
        format!("{}{}{}", self.prefix, group, self.out_suffix)
    }

    /// Build the group-backend tag for a group id and index
    pub fn backend_tag(&self, group: &str, index: i64) -> String {
        format!("{}{}{}{}", self.prefix, group, self.in_mark, index)
    }

    /// Validate the convention
    pub fn validate(&self) -> Result<(), String> {
        if self.prefix.is_empty() || self.out_suffix.is_empty() || self.in_mark.is_empty() {
            return Err("Tag prefix, suffix and marker must not be empty".to_string());
        }
        if self.kind.is_empty() {
            return Err("Declaration kind must not be empty".to_string());
        }
        Ok(())
    }
}
