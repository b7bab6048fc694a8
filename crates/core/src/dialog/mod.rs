pub mod directive;
pub mod engine;
pub mod intent;
pub mod prompts;

pub use directive::{CardAction, ProductCard, ResponseDirective};
pub use engine::{DialogEngine, TurnOutcome};
pub use intent::{Entities, Intent, RecognizedTurn};
