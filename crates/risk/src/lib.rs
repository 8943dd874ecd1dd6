//! Risk policy for proposed tool invocations.
//!
//! The engine is the policy half of the zero-trust chokepoint: the risk
//! gate recomputes canonical arguments, then asks this crate whether the
//! call may proceed, needs a human, or is blocked outright.

mod engine;
mod sandbox;

pub use engine::{
    RiskDecision, RiskEngine, REASON_HONEYTOKEN, REASON_MALFORMED_ARGS, REASON_PATH_ESCAPE,
    REASON_SECRET_IN_ARGS, REASON_TOOL_TIER, REASON_UNKNOWN_TOOL,
};
pub use sandbox::resolve_within;
