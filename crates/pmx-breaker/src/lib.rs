//! Predictive circuit breaker for pmx.
//!
//! A stateless evaluator that, given live context (regime, forecast
//! breach probability, volatility percentile, unrealized/realized P&L),
//! computes a breaker status and a list of recommended actions. It vetoes
//! new entries independently of the admission gate: the risk manager
//! reacts to realized damage, the breaker reacts to forecast damage.

pub mod evaluator;

pub use evaluator::{
    BreakerAction, BreakerContext, BreakerEvaluation, BreakerMetrics, BreakerStatus,
    PredictiveBreaker, RecommendedAction, Severity, Trigger, TriggerKind,
};
