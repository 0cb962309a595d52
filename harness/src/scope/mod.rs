//! Resource scopes
//!
//! [`SuiteScope`] owns what a whole suite shares; [`TestScope`] owns what a
//! single test needs and borrows the suite for its lifetime. Teardown of
//! either scope never fails: every step runs and problems are reported in a
//! [`TeardownReport`].

pub mod context;
pub mod suite;
pub mod teardown;
pub mod test_scope;

pub use context::TestContext;
pub use suite::SuiteScope;
pub use teardown::{Teardown, TeardownFailure, TeardownReport};
pub use test_scope::TestScope;
