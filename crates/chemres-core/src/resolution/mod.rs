//! Identifier resolution: strategies, the fallback chain and aggregation

pub mod aggregator;
pub mod chain;
pub mod strategy;

pub use aggregator::{aggregate, ResultAggregator};
pub use chain::ResolutionStrategyChain;
pub use strategy::{
    run_strategy, strategy_for, strategy_order, CasNumberStrategy, InChIKeyStrategy,
    NameStrategy, ResolutionStrategy, SmilesStrategy, DISPATCH_TABLE,
};
