pub mod audit;
pub mod config;
pub mod dialog;
pub mod domain;
pub mod errors;
pub mod preferences;
pub mod query;
pub mod router;
pub mod search;
pub mod selection;
pub mod session;

pub use audit::{AuditContext, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use dialog::{DialogEngine, Entities, Intent, RecognizedTurn, ResponseDirective, TurnOutcome};
pub use domain::product::{Product, ProductId, SearchResults};
pub use domain::slot::{Gender, Slot};
pub use errors::{ApplicationError, DialogError, InterfaceError};
pub use preferences::{PreferenceStore, PreferenceUpdate};
pub use query::{CompiledQuery, FilterExpression, QueryCompiler};
pub use router::{ResultRouter, RouterDecision};
pub use search::{CatalogEntry, CatalogSearch, InMemoryCatalog, SearchError};
pub use selection::{ReservationEntry, ReservationId, ReservationRecord, SelectionFlow};
pub use session::{ConversationId, ConversationPhase, ConversationSession};
