use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::dialog::directive::ResponseDirective;
use crate::dialog::intent::{Intent, RecognizedTurn, PRODUCT_NAME_ENTITY};
use crate::dialog::prompts;
use crate::errors::DialogError;
use crate::preferences::PreferenceUpdate;
use crate::query::QueryCompiler;
use crate::router::{ResultRouter, RouterDecision};
use crate::search::CatalogSearch;
use crate::selection::{ReservationRecord, ReserveOutcome, SelectionFlow};
use crate::session::ConversationSession;

/// Result of one handled turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub directives: Vec<ResponseDirective>,
    pub decision: Option<RouterDecision>,
    pub reservation: Option<ReservationRecord>,
}

impl TurnOutcome {
    fn say(text: impl Into<String>) -> Self {
        Self { directives: vec![ResponseDirective::text(text)], ..Self::default() }
    }
}

pub struct DialogEngine<S> {
    search: S,
    compiler: QueryCompiler,
    router: ResultRouter,
    selection: SelectionFlow,
}

impl<S> DialogEngine<S>
where
    S: CatalogSearch,
{
    pub fn new(search: S, origin: Url) -> Self {
        Self {
            search,
            compiler: QueryCompiler::new(),
            router: ResultRouter::default(),
            selection: SelectionFlow::new(origin),
        }
    }

    #[cfg(test)]
    fn search(&self) -> &S {
        &self.search
    }

    /// Directives sent when a member joins the conversation.
    pub fn welcome(&self) -> Vec<ResponseDirective> {
        vec![
            ResponseDirective::text(prompts::WELCOME),
            ResponseDirective::text_with_suggestions(prompts::WELCOME_HINT, &[prompts::WELCOME_ACK]),
        ]
    }

    /// Runs one turn against the session. On error the session is left exactly
    /// as it was passed in.
    pub async fn handle_turn(
        &self,
        session: &mut ConversationSession,
        turn: &RecognizedTurn,
    ) -> Result<TurnOutcome, DialogError> {
        if !session.started {
            session.started = true;
            session.touch();
            return Ok(TurnOutcome::say(prompts::OPENING_PROMPT));
        }

        let outcome = match &turn.intent {
            Intent::Greeting => TurnOutcome::say(prompts::GREETING),
            Intent::Help => TurnOutcome {
                directives: vec![
                    ResponseDirective::text(prompts::HELP_MENU),
                    ResponseDirective::text(prompts::HELP_RESET_HINT),
                ],
                ..TurnOutcome::default()
            },
            Intent::Reset => {
                session.reset();
                TurnOutcome::say(prompts::RESET_CONFIRMATION)
            }
            Intent::Find => self.find(session, turn).await?,
            Intent::Select => self.select(session, turn).await?,
            Intent::Reserve => self.reserve(session, turn),
            Intent::Unrecognized(_) => TurnOutcome::say(prompts::FALLBACK),
        };

        session.touch();
        Ok(outcome)
    }

    /// Like [`Self::handle_turn`], but recoverable errors become a text reply.
    pub async fn respond(
        &self,
        session: &mut ConversationSession,
        turn: &RecognizedTurn,
    ) -> TurnOutcome {
        match self.handle_turn(session, turn).await {
            Ok(outcome) => outcome,
            Err(error) => TurnOutcome::say(error.user_message()),
        }
    }

    pub async fn handle_turn_with_audit<A>(
        &self,
        session: &mut ConversationSession,
        turn: &RecognizedTurn,
        sink: &A,
        audit: &AuditContext,
    ) -> Result<TurnOutcome, DialogError>
    where
        A: AuditSink + ?Sized,
    {
        let result = self.handle_turn(session, turn).await;
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "dialog.turn_handled",
                        AuditCategory::Dialog,
                        AuditOutcome::Success,
                    )
                    .with_metadata("intent", turn.intent.as_str())
                    .with_metadata(
                        "decision",
                        outcome.decision.as_ref().map_or("none", RouterDecision::label),
                    )
                    .with_metadata("phase", format!("{:?}", session.phase())),
                );
                if let Some(record) = &outcome.reservation {
                    sink.emit(
                        AuditEvent::new(
                            audit,
                            "reservation.created",
                            AuditCategory::Reservation,
                            AuditOutcome::Success,
                        )
                        .with_metadata("product_name", record.product_name.clone()),
                    );
                }
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "dialog.turn_failed",
                        AuditCategory::Dialog,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("intent", turn.intent.as_str())
                    .with_metadata("error_kind", error.kind())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    async fn find(
        &self,
        session: &mut ConversationSession,
        turn: &RecognizedTurn,
    ) -> Result<TurnOutcome, DialogError> {
        let mut preferences = session.preferences.clone().unwrap_or_default();
        preferences.merge(PreferenceUpdate::from_entities(&turn.entities));

        let query = self.compiler.compile(&preferences);
        let results = self.search.search(&query).await?;
        let decision = self.router.route(results, &preferences);
        session.preferences = Some(preferences);

        let directives = match &decision {
            RouterDecision::NoMatches => vec![ResponseDirective::text(prompts::NO_MATCHES)],
            RouterDecision::ShowSingle { product } => vec![ResponseDirective::card(product)],
            RouterDecision::ShowShortlist { products } => {
                vec![ResponseDirective::carousel(products)]
            }
            RouterDecision::AskNarrowing { count, next_slot } => vec![
                ResponseDirective::text(prompts::narrowing_count(*count)),
                ResponseDirective::text(prompts::slot_question(*next_slot)),
            ],
            RouterDecision::Exhausted { count } => {
                vec![ResponseDirective::text(prompts::narrowing_count(*count))]
            }
        };

        Ok(TurnOutcome { directives, decision: Some(decision), reservation: None })
    }

    async fn select(
        &self,
        session: &mut ConversationSession,
        turn: &RecognizedTurn,
    ) -> Result<TurnOutcome, DialogError> {
        let Some(raw_name) = turn.entities.first(PRODUCT_NAME_ENTITY) else {
            return Ok(TurnOutcome::say(prompts::SELECT_WHICH_PRODUCT));
        };
        let product_name = raw_name.replace('_', " ");

        let results = self.search.find_by_name(&product_name).await?;
        let Some(product) = results.first() else {
            return Err(DialogError::ProductNotFound { product_name });
        };

        session.selection = Some(self.selection.select(product));
        Ok(TurnOutcome::say(prompts::SELECT_CONFIRMATION))
    }

    fn reserve(&self, session: &mut ConversationSession, turn: &RecognizedTurn) -> TurnOutcome {
        match self.selection.reserve(session.selection.as_ref(), &turn.text) {
            ReserveOutcome::Reserved { record, link } => {
                session.reset();
                TurnOutcome {
                    directives: vec![
                        ResponseDirective::text(prompts::RESERVE_CONFIRMATION),
                        ResponseDirective::ActionLink {
                            title: prompts::RESERVATION_SLIP_TITLE.to_string(),
                            url: link.to_string(),
                        },
                    ],
                    decision: None,
                    reservation: Some(record),
                }
            }
            ReserveOutcome::NothingSelected => TurnOutcome::say(prompts::RESERVE_NOTHING_SELECTED),
            ReserveOutcome::MissingPhoneNumber => TurnOutcome::say(prompts::RESERVE_ASK_PHONE),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::Url;

    use super::{DialogEngine, TurnOutcome};
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::dialog::directive::ResponseDirective;
    use crate::dialog::intent::{Entities, Intent, RecognizedTurn};
    use crate::dialog::prompts;
    use crate::domain::product::{Product, ProductId, SearchResults};
    use crate::domain::slot::Slot;
    use crate::errors::DialogError;
    use crate::query::CompiledQuery;
    use crate::router::RouterDecision;
    use crate::search::{CatalogSearch, SearchError};
    use crate::session::{ConversationId, ConversationPhase, ConversationSession};

    /// Replays queued responses and records every query it receives.
    #[derive(Default)]
    struct ScriptedSearch {
        responses: Mutex<VecDeque<Result<SearchResults, SearchError>>>,
        queries: Mutex<Vec<CompiledQuery>>,
    }

    impl ScriptedSearch {
        fn with(responses: Vec<Result<SearchResults, SearchError>>) -> Self {
            Self { responses: Mutex::new(responses.into()), queries: Mutex::new(Vec::new()) }
        }

        fn queries(&self) -> Vec<CompiledQuery> {
            self.queries.lock().expect("queries lock").clone()
        }
    }

    #[async_trait]
    impl CatalogSearch for ScriptedSearch {
        async fn search(&self, query: &CompiledQuery) -> Result<SearchResults, SearchError> {
            self.queries.lock().expect("queries lock").push(query.clone());
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or_else(|| Ok(SearchResults::default()))
        }
    }

    fn product(name: &str) -> Product {
        Product {
            id: ProductId(name.to_lowercase().replace(' ', "-")),
            name: name.to_string(),
            image_url: format!("https://img.example/{}.png", name.replace(' ', "")),
            detail_url: format!("https://shop.example/{}", name.replace(' ', "")),
            score: 1.0,
        }
    }

    fn results(names: &[&str]) -> SearchResults {
        SearchResults::new(names.iter().map(|name| product(name)).collect())
    }

    fn engine(search: ScriptedSearch) -> DialogEngine<ScriptedSearch> {
        DialogEngine::new(search, Url::parse("https://bot.example.com").expect("origin"))
    }

    fn started_session() -> ConversationSession {
        let mut session = ConversationSession::new(ConversationId("conv-1".to_string()));
        session.started = true;
        session
    }

    fn find(entities: Entities) -> RecognizedTurn {
        RecognizedTurn::new(Intent::Find).with_entities(entities)
    }

    fn texts(outcome: &TurnOutcome) -> Vec<&str> {
        outcome.directives.iter().filter_map(ResponseDirective::as_text).collect()
    }

    #[tokio::test]
    async fn first_turn_only_emits_opening_prompt() {
        let search = ScriptedSearch::default();
        let engine = engine(search);
        let mut session = ConversationSession::new(ConversationId("conv-1".to_string()));

        let outcome = engine
            .handle_turn(&mut session, &find(Entities::new().with("gender", &["Mens"])))
            .await
            .expect("first turn");

        assert_eq!(texts(&outcome), vec![prompts::OPENING_PROMPT]);
        assert!(session.started);
        assert_eq!(session.preferences, None);
        assert!(engine.search().queries().is_empty());
    }

    #[tokio::test]
    async fn welcome_offers_help_hint_with_ok_action() {
        let engine = engine(ScriptedSearch::default());

        let welcome = engine.welcome();

        assert_eq!(welcome.len(), 2);
        assert_eq!(
            welcome[1],
            ResponseDirective::text_with_suggestions(prompts::WELCOME_HINT, &["OK"])
        );
    }

    #[tokio::test]
    async fn fixed_text_intents_leave_state_untouched() {
        let engine = engine(ScriptedSearch::default());
        let mut session = started_session();

        let greeting =
            engine.handle_turn(&mut session, &RecognizedTurn::new(Intent::Greeting)).await;
        let help = engine.handle_turn(&mut session, &RecognizedTurn::new(Intent::Help)).await;
        let unknown = engine
            .handle_turn(&mut session, &RecognizedTurn::new(Intent::parse("None")))
            .await;

        assert_eq!(texts(&greeting.expect("greeting")), vec![prompts::GREETING]);
        assert_eq!(
            texts(&help.expect("help")),
            vec![prompts::HELP_MENU, prompts::HELP_RESET_HINT]
        );
        assert_eq!(texts(&unknown.expect("fallback")), vec![prompts::FALLBACK]);
        assert_eq!(session.phase(), ConversationPhase::Greeting);
    }

    #[tokio::test]
    async fn end_to_end_find_select_reserve() {
        let search = ScriptedSearch::with(vec![
            Ok(SearchResults::new(vec![product("Filler")]).with_total_count(40)),
            Ok(results(&["Irony Big Chief", "Irony Chrono", "Irony Stainless"])),
            Ok(results(&["Irony Big Chief"])),
        ]);
        let engine = engine(search);
        let mut session = started_session();

        let turn1 = engine
            .handle_turn(&mut session, &find(Entities::new().with("gender", &["Mens"])))
            .await
            .expect("turn 1");
        assert_eq!(
            turn1.decision,
            Some(RouterDecision::AskNarrowing { count: 40, next_slot: Slot::Colors })
        );
        assert_eq!(texts(&turn1)[0], "40 watches match. Please add a condition to narrow them down:");

        let turn2 = engine
            .handle_turn(&mut session, &find(Entities::new().with("colors", &["Black"])))
            .await
            .expect("turn 2");
        let Some(RouterDecision::ShowShortlist { products }) = &turn2.decision else {
            panic!("expected shortlist, got {:?}", turn2.decision);
        };
        assert_eq!(products.len(), 3);
        assert!(matches!(&turn2.directives[0], ResponseDirective::Carousel { cards } if cards.len() == 3));

        let select = RecognizedTurn::new(Intent::Select)
            .with_entities(Entities::new().with("productName", &["Irony_Big_Chief"]));
        let turn3 = engine.handle_turn(&mut session, &select).await.expect("turn 3");
        assert_eq!(texts(&turn3), vec![prompts::SELECT_CONFIRMATION]);
        assert_eq!(session.phase(), ConversationPhase::Selected);
        assert_eq!(
            session.selection.as_ref().map(|s| s.selected_product_name.as_str()),
            Some("Irony Big Chief")
        );

        let reserve = RecognizedTurn::new(Intent::Reserve).with_text("080-1234-5678");
        let turn4 = engine.handle_turn(&mut session, &reserve).await.expect("turn 4");
        let record = turn4.reservation.clone().expect("reservation record");
        assert_eq!(record.product_name, "Irony Big Chief");
        assert_eq!(record.phone_number, "080-1234-5678");
        assert!(matches!(
            &turn4.directives[1],
            ResponseDirective::ActionLink { url, .. }
                if url.starts_with("https://bot.example.com/reservation.html?productName=Irony+Big+Chief")
        ));
        assert_eq!(session.preferences, None);
        assert_eq!(session.selection, None);
        assert!(session.started);

        let queries = engine.search().queries();
        assert_eq!(queries[0].filter.render(), "(CaseDimensions/width ge 34)");
        assert_eq!(
            queries[1].filter.render(),
            "(CaseDimensions/width ge 34) and (Color eq 'Black')"
        );
        assert_eq!(queries[2].filter.render(), "(ProductName eq 'Irony Big Chief')");
    }

    #[tokio::test]
    async fn reset_makes_next_find_behave_like_a_fresh_conversation() {
        let search = ScriptedSearch::with(vec![
            Ok(results(&["A", "B"])),
            Ok(results(&["A", "B"])),
        ]);
        let engine = engine(search);
        let mut session = started_session();

        engine
            .handle_turn(&mut session, &find(Entities::new().with("colors", &["Red"])))
            .await
            .expect("find");
        let reset = engine
            .handle_turn(&mut session, &RecognizedTurn::new(Intent::Reset))
            .await
            .expect("reset");
        assert_eq!(texts(&reset), vec![prompts::RESET_CONFIRMATION]);
        assert_eq!(session.phase(), ConversationPhase::Greeting);

        engine.handle_turn(&mut session, &find(Entities::new())).await.expect("find again");

        let queries = engine.search().queries();
        assert!(queries[1].filter.is_universal());
        assert!(queries[1].is_match_all_text());
    }

    #[tokio::test]
    async fn select_unknown_product_is_product_not_found() {
        let engine = engine(ScriptedSearch::with(vec![Ok(SearchResults::default())]));
        let mut session = started_session();
        let before = session.clone();

        let select = RecognizedTurn::new(Intent::Select)
            .with_entities(Entities::new().with("productName", &["Ghost_Watch"]));
        let error = engine.handle_turn(&mut session, &select).await.expect_err("must fail");

        assert_eq!(error, DialogError::ProductNotFound { product_name: "Ghost Watch".to_string() });
        assert_eq!(session, before);

        let recovered = engine.respond(&mut session, &select).await;
        assert_eq!(texts(&recovered), vec![error.user_message()]);
    }

    #[tokio::test]
    async fn search_failure_leaves_preferences_unchanged() {
        let engine = engine(ScriptedSearch::with(vec![
            Ok(results(&["A", "B"])),
            Err(SearchError::Timeout(10)),
        ]));
        let mut session = started_session();
        engine
            .handle_turn(&mut session, &find(Entities::new().with("colors", &["Red"])))
            .await
            .expect("first find");
        let before = session.clone();

        let error = engine
            .handle_turn(&mut session, &find(Entities::new().with("colors", &["Blue"])))
            .await
            .expect_err("search unavailable");

        assert!(matches!(error, DialogError::SearchUnavailable(_)));
        assert_eq!(session, before);
        assert_eq!(session.preferences.as_ref().map(|p| p.colors.clone()), Some(vec!["Red".to_string()]));
    }

    #[tokio::test]
    async fn reserve_without_selection_or_phone_guides_the_user() {
        let engine = engine(ScriptedSearch::with(vec![Ok(results(&["Irony Big Chief"]))]));
        let mut session = started_session();

        let nothing = engine
            .handle_turn(&mut session, &RecognizedTurn::new(Intent::Reserve).with_text("0801234"))
            .await
            .expect("reserve");
        assert_eq!(texts(&nothing), vec![prompts::RESERVE_NOTHING_SELECTED]);

        let select = RecognizedTurn::new(Intent::Select)
            .with_entities(Entities::new().with("productName", &["Irony_Big_Chief"]));
        engine.handle_turn(&mut session, &select).await.expect("select");
        let blank = engine
            .handle_turn(&mut session, &RecognizedTurn::new(Intent::Reserve).with_text("   "))
            .await
            .expect("reserve");
        assert_eq!(texts(&blank), vec![prompts::RESERVE_ASK_PHONE]);
        assert_eq!(session.phase(), ConversationPhase::Selected);
    }

    #[tokio::test]
    async fn select_without_product_entity_asks_which_one() {
        let engine = engine(ScriptedSearch::default());
        let mut session = started_session();

        let outcome = engine
            .handle_turn(&mut session, &RecognizedTurn::new(Intent::Select))
            .await
            .expect("select");

        assert_eq!(texts(&outcome), vec![prompts::SELECT_WHICH_PRODUCT]);
        assert!(engine.search().queries().is_empty());
    }

    #[tokio::test]
    async fn exhausted_router_reports_count_only() {
        let engine = engine(ScriptedSearch::with(vec![Ok(
            SearchResults::new(vec![product("Filler")]).with_total_count(12),
        )]));
        let mut session = started_session();
        let entities = Entities::new()
            .with("gender", &["Womens"])
            .with("colors", &["Gold"])
            .with("bands", &["Metal"])
            .with("impressions", &["Elegant"]);

        let outcome = engine.handle_turn(&mut session, &find(entities)).await.expect("find");

        assert_eq!(outcome.decision, Some(RouterDecision::Exhausted { count: 12 }));
        assert_eq!(texts(&outcome), vec![prompts::narrowing_count(12).as_str()]);
    }

    #[tokio::test]
    async fn audited_turns_record_success_failure_and_reservation() {
        let engine = engine(ScriptedSearch::with(vec![
            Err(SearchError::Request("connection refused".to_string())),
            Ok(results(&["Irony Big Chief"])),
        ]));
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(Some(ConversationId("conv-1".to_string())), "req-1", "test");
        let mut session = started_session();

        let _ = engine
            .handle_turn_with_audit(&mut session, &find(Entities::new()), &sink, &audit)
            .await;
        let select = RecognizedTurn::new(Intent::Select)
            .with_entities(Entities::new().with("productName", &["Irony_Big_Chief"]));
        engine
            .handle_turn_with_audit(&mut session, &select, &sink, &audit)
            .await
            .expect("select");
        engine
            .handle_turn_with_audit(
                &mut session,
                &RecognizedTurn::new(Intent::Reserve).with_text("080-1234-5678"),
                &sink,
                &audit,
            )
            .await
            .expect("reserve");

        let kinds: Vec<String> = sink.events().into_iter().map(|event| event.event_type).collect();
        assert_eq!(
            kinds,
            vec![
                "dialog.turn_failed",
                "dialog.turn_handled",
                "dialog.turn_handled",
                "reservation.created"
            ]
        );
        assert_eq!(sink.events()[0].metadata.get("error_kind").map(String::as_str), Some("search_unavailable"));
    }
}
