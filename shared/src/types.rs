//! Core shared types and identifiers

use crate::errors::SharedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a managed component, used for log file names and as the
/// `component` field of every harness trace event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// The harness itself (scope management, CLI)
    Harness,
    /// Primary service under test
    Router,
    /// Dependent worker process registered with the router
    Capability,
    /// Identity / auth provider
    Auth,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Harness => "harness",
            Component::Router => "router",
            Component::Capability => "http-capability",
            Component::Auth => "auth",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "harness" => Ok(Component::Harness),
            "router" => Ok(Component::Router),
            "http-capability" | "capability" => Ok(Component::Capability),
            "auth" => Ok(Component::Auth),
            other => Err(SharedError::UnknownComponent {
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_display_round_trips() {
        for component in [
            Component::Harness,
            Component::Router,
            Component::Capability,
            Component::Auth,
        ] {
            assert_eq!(component.to_string().parse::<Component>().unwrap(), component);
        }
    }

    #[test]
    fn test_capability_alias() {
        assert_eq!("capability".parse::<Component>().unwrap(), Component::Capability);
        assert!("orchestrator".parse::<Component>().is_err());
    }
}
