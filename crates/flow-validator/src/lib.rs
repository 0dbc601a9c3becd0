//! Money Flow Validator
//!
//! Cross-checks lifecycle phases and rebound candidates against net capital
//! flow. A phase that claims accumulation while money leaves is flagged; a
//! rebound with no confirming inflow is dropped.

pub mod validator;

pub use validator::{FlowRules, MoneyFlowValidator};
