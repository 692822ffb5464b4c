//! Notification stream targets.
//!
//! The backend exposes one independent, independently-authenticated
//! event stream per staff role. A [`Target`] names one of those streams;
//! an [`Audience`] is the addressee written inside an event by the server.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One of the two logical notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Kitchen,
    Service,
}

impl Target {
    /// Every target, in a stable order.
    pub const ALL: [Target; 2] = [Target::Kitchen, Target::Service];

    pub fn as_str(self) -> &'static str {
        match self {
            Target::Kitchen => "kitchen",
            Target::Service => "service",
        }
    }

    /// Path of this target's event stream relative to the API base URL.
    pub fn stream_path(self) -> String {
        format!("/notifications/{}/stream", self.as_str())
    }

    /// Join the stream path onto `base_url`, tolerating a trailing slash.
    pub fn stream_url(self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.stream_path())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kitchen" => Ok(Target::Kitchen),
            "service" => Ok(Target::Service),
            other => Err(CoreError::UnknownTarget(other.to_string())),
        }
    }
}

/// Addressee of a domain event as written by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Kitchen,
    Service,
    All,
}

impl Audience {
    /// Whether an event with this audience concerns `target`.
    pub fn includes(self, target: Target) -> bool {
        matches!(
            (self, target),
            (Audience::All, _)
                | (Audience::Kitchen, Target::Kitchen)
                | (Audience::Service, Target::Service)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_joins_base_without_double_slash() {
        assert_eq!(
            Target::Kitchen.stream_url("http://api.local/"),
            "http://api.local/notifications/kitchen/stream"
        );
        assert_eq!(
            Target::Service.stream_url("http://api.local/v1"),
            "http://api.local/v1/notifications/service/stream"
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(" Kitchen ".parse::<Target>(), Ok(Target::Kitchen));
        assert_eq!("SERVICE".parse::<Target>(), Ok(Target::Service));
        assert_eq!(
            "bar".parse::<Target>(),
            Err(CoreError::UnknownTarget("bar".into()))
        );
    }

    #[test]
    fn audience_all_includes_every_target() {
        for target in Target::ALL {
            assert!(Audience::All.includes(target));
        }
        assert!(Audience::Kitchen.includes(Target::Kitchen));
        assert!(!Audience::Kitchen.includes(Target::Service));
    }
}
