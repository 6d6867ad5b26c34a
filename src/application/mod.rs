pub mod orchestrator;
pub mod executor;
pub mod decision;
pub mod pipeline;
pub mod evolver;
pub mod bot;

pub use orchestrator::{AnalysisOptions, AnalysisOrchestrator, ANALYST_SYSTEM_PROMPT};
pub use executor::{buy_command, TradeExecutionError, TradeExecutor};
pub use decision::{DecisionEngine, DecisionOutcome};
pub use pipeline::{SignalOutcome, SignalPipeline};
pub use evolver::{
    EvolutionCadence, EvolutionError, EvolutionOutcome, StrategyEvolver, META_SYSTEM_PROMPT,
};
pub use bot::{BotError, BotSettings, SignalBot};
