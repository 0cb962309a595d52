//! Identity of the test a [`TestScope`](super::TestScope) belongs to

use crate::runtime::LogNaming;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    /// Log profile; the harness configuration's profile when unset
    pub profile: Option<String>,
    pub test_class: String,
    pub test_method: Option<String>,
    pub display_name: String,
}

impl TestContext {
    /// Context for a named test method of a suite
    pub fn new<C: Into<String>, M: Into<String>>(test_class: C, test_method: M) -> Self {
        let test_class = test_class.into();
        let test_method = test_method.into();
        Self {
            profile: None,
            display_name: format!("{test_class}::{test_method}"),
            test_class,
            test_method: Some(test_method),
        }
    }

    /// Context without method information; logs fall back to flat naming
    pub fn named<S: Into<String>>(display_name: S) -> Self {
        let display_name = display_name.into();
        Self {
            profile: None,
            test_class: display_name.clone(),
            test_method: None,
            display_name,
        }
    }

    pub fn with_profile<S: Into<String>>(mut self, profile: S) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn log_naming(&self, default_profile: &str) -> LogNaming {
        match &self.test_method {
            Some(method) => LogNaming::Hierarchical {
                profile: self.profile.clone().unwrap_or_else(|| default_profile.to_string()),
                test_class: self.test_class.clone(),
                test_method: method.clone(),
            },
            None => LogNaming::flat(&self.display_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_context_is_hierarchical() {
        let ctx = TestContext::new("HttpToolCliSuite", "registers_tool");
        assert_eq!(ctx.display_name, "HttpToolCliSuite::registers_tool");
        assert_eq!(
            ctx.log_naming("default"),
            LogNaming::Hierarchical {
                profile: "default".to_string(),
                test_class: "HttpToolCliSuite".to_string(),
                test_method: "registers_tool".to_string(),
            }
        );

        let ctx = ctx.with_profile("http-capability");
        assert!(matches!(
            ctx.log_naming("default"),
            LogNaming::Hierarchical { profile, .. } if profile == "http-capability"
        ));
    }

    #[test]
    fn test_named_context_is_flat() {
        assert_eq!(TestContext::named("adhoc").log_naming("default"), LogNaming::flat("adhoc"));
    }
}
