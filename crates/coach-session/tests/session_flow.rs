//! Chat-turn behaviour of `ConversationSession` with paused time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use coach_core::{CoachConfig, CompletionError, LearningMode, MessageRole};
use coach_session::{ConversationSession, SessionError, SessionEvent};
use common::{ScriptedCompletion, Step, advance, deps, drain};

fn in_flight_changes(events: &[SessionEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::RequestInFlight(v) => Some(*v),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn opening_message_appears_once_after_the_delay() {
    let completion = Arc::new(ScriptedCompletion::new());
    let (session, _events) = ConversationSession::open(LearningMode::Build, deps(&completion));

    advance(Duration::from_millis(2900)).await;
    assert!(session.messages().is_empty());
    assert!(session.is_opening_pending());

    advance(Duration::from_millis(200)).await;
    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "assistant-initial-build");
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert_eq!(messages[0].content, LearningMode::Build.opening_message());
    assert!(session.opening_message_sent());

    advance(Duration::from_secs(30)).await;
    assert_eq!(session.messages().len(), 1);
    assert!(completion.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn submitting_first_cancels_the_opening_message() {
    let completion = Arc::new(ScriptedCompletion::new().reply(vec![Step::Delta("Welcome!")]));
    let (session, _events) = ConversationSession::open(LearningMode::Review, deps(&completion));

    advance(Duration::from_secs(1)).await;
    session.submit("begin").unwrap();

    advance(Duration::from_secs(10)).await;
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "begin");
    assert_eq!(messages[1].content, "Welcome!");
    assert!(!session.opening_message_sent());
    assert!(messages.iter().all(|m| m.id != "assistant-initial-review"));
}

#[tokio::test(start_paused = true)]
async fn deltas_stream_into_one_assistant_message() {
    let completion = Arc::new(ScriptedCompletion::new().reply(vec![
        Step::Delta("Hel"),
        Step::Wait(Duration::from_millis(50)),
        Step::Delta("lo"),
    ]));
    let (session, mut events) = ConversationSession::open(LearningMode::Build, deps(&completion));
    advance(Duration::from_secs(4)).await;

    session.set_input("begin");
    session.submit_input().unwrap();
    assert!(session.is_request_in_flight());
    assert_eq!(session.input(), "");

    advance(Duration::from_secs(1)).await;
    assert!(!session.is_request_in_flight());

    let messages = session.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].role, MessageRole::Assistant);
    assert_eq!(messages[2].content, "Hello");

    let request = &completion.requests()[0];
    assert_eq!(request.mode, Some(LearningMode::Build));
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[1].content, "begin");
    assert_eq!(
        request.system_message,
        LearningMode::Build.default_system_message()
    );

    let events = drain(&mut events);
    assert_eq!(in_flight_changes(&events), vec![true, false]);
    assert!(events.contains(&SessionEvent::MessageDelta {
        message_id: messages[2].id.clone(),
        delta: "lo".into()
    }));
}

#[tokio::test(start_paused = true)]
async fn stored_instruction_overrides_the_default() {
    let completion = Arc::new(ScriptedCompletion::new());
    let mut deps = deps(&completion);
    deps.config = Some(CoachConfig {
        heading: "H".into(),
        description: "D".into(),
        readymade_system_message: "R".into(),
        build_system_message: "Stored build instruction".into(),
        review_system_message: "V".into(),
    });
    let (session, _events) = ConversationSession::open(LearningMode::Build, deps);

    session.submit("hi").unwrap();
    advance(Duration::from_secs(1)).await;

    assert_eq!(
        completion.requests()[0].system_message,
        "Stored build instruction"
    );
}

#[tokio::test(start_paused = true)]
async fn second_submit_while_in_flight_is_rejected() {
    let completion = Arc::new(ScriptedCompletion::new().reply(vec![
        Step::Wait(Duration::from_secs(1)),
        Step::Delta("done"),
    ]));
    let (session, _events) = ConversationSession::open(LearningMode::Readymade, deps(&completion));

    session.submit("first").unwrap();
    assert_eq!(session.submit("second"), Err(SessionError::RequestInFlight));

    advance(Duration::from_secs(5)).await;
    assert_eq!(completion.requests().len(), 1);
    let contents: Vec<String> = session.messages().into_iter().map(|m| m.content).collect();
    assert_eq!(contents, vec!["first", "done"]);
}

#[tokio::test(start_paused = true)]
async fn blank_input_is_rejected_with_a_dismissible_error() {
    let completion = Arc::new(ScriptedCompletion::new());
    let (session, mut events) = ConversationSession::open(LearningMode::Build, deps(&completion));

    assert!(matches!(
        session.submit("   \n"),
        Err(SessionError::Validation(_))
    ));
    assert!(session.last_error().is_some());
    assert!(completion.requests().is_empty());

    session.dismiss_error();
    assert_eq!(session.last_error(), None);
    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(e, SessionEvent::Error(_))));
    assert!(events.contains(&SessionEvent::ErrorDismissed));
}

#[tokio::test(start_paused = true)]
async fn stream_failure_keeps_partial_text_and_clears_the_flag() {
    let completion = Arc::new(ScriptedCompletion::new().reply(vec![
        Step::Delta("Part"),
        Step::Fail(CompletionError::Network("connection reset".into())),
    ]));
    let (session, mut events) = ConversationSession::open(LearningMode::Build, deps(&completion));

    session.submit("hi").unwrap();
    advance(Duration::from_secs(1)).await;

    assert!(!session.is_request_in_flight());
    assert_eq!(session.messages()[1].content, "Part");
    assert!(session.last_error().unwrap().contains("connection reset"));
    assert_eq!(in_flight_changes(&drain(&mut events)), vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn refused_request_reports_missing_credential() {
    let completion = Arc::new(
        ScriptedCompletion::new().refuse(CompletionError::MissingCredential(
            "OpenAI API key is not configured".into(),
        )),
    );
    let (session, _events) = ConversationSession::open(LearningMode::Build, deps(&completion));

    session.submit("hi").unwrap();
    advance(Duration::from_secs(1)).await;

    assert!(!session.is_request_in_flight());
    assert_eq!(session.messages().len(), 1);
    assert!(
        session
            .last_error()
            .unwrap()
            .contains("OpenAI API key is not configured")
    );
}

#[tokio::test(start_paused = true)]
async fn retry_replaces_the_trailing_reply() {
    let completion = Arc::new(
        ScriptedCompletion::new()
            .reply(vec![Step::Delta("first answer")])
            .reply(vec![Step::Delta("second answer")]),
    );
    let (session, _events) = ConversationSession::open(LearningMode::Build, deps(&completion));

    session.submit("question").unwrap();
    advance(Duration::from_secs(1)).await;
    session.retry().unwrap();
    advance(Duration::from_secs(1)).await;

    let contents: Vec<String> = session.messages().into_iter().map(|m| m.content).collect();
    assert_eq!(contents, vec!["question", "second answer"]);

    let requests = completion.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 1);
    assert_eq!(requests[1].messages[0].content, "question");
}

#[tokio::test(start_paused = true)]
async fn retry_needs_a_user_message_and_an_idle_session() {
    let completion = Arc::new(ScriptedCompletion::new().reply(vec![
        Step::Wait(Duration::from_secs(2)),
        Step::Delta("slow"),
    ]));
    let (session, _events) = ConversationSession::open(LearningMode::Build, deps(&completion));

    advance(Duration::from_secs(4)).await;
    assert_eq!(session.retry(), Err(SessionError::NothingToRetry));

    session.submit("hi").unwrap();
    assert_eq!(session.retry(), Err(SessionError::RequestInFlight));
}

#[tokio::test(start_paused = true)]
async fn abort_keeps_what_already_streamed() {
    let completion = Arc::new(ScriptedCompletion::new().reply(vec![
        Step::Delta("Par"),
        Step::Wait(Duration::from_secs(10)),
        Step::Delta("tial"),
    ]));
    let (session, mut events) = ConversationSession::open(LearningMode::Build, deps(&completion));

    session.submit("hi").unwrap();
    advance(Duration::from_secs(1)).await;
    assert!(session.abort());
    assert!(!session.is_request_in_flight());
    assert!(!session.abort());

    advance(Duration::from_secs(20)).await;
    assert_eq!(session.messages()[1].content, "Par");
    assert_eq!(in_flight_changes(&drain(&mut events)), vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn close_discards_late_results() {
    let completion = Arc::new(ScriptedCompletion::new().reply(vec![
        Step::Wait(Duration::from_secs(5)),
        Step::Delta("too late"),
    ]));
    let (session, mut events) = ConversationSession::open(LearningMode::Build, deps(&completion));

    session.submit("hi").unwrap();
    session.close();
    advance(Duration::from_secs(10)).await;

    assert!(session.is_closed());
    assert!(session.messages().is_empty());
    assert!(!session.is_request_in_flight());
    assert_eq!(session.submit("again"), Err(SessionError::Closed));

    let events = drain(&mut events);
    assert_eq!(events.last(), Some(&SessionEvent::Closed));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, SessionEvent::MessageAdded(m) if m.content == "too late"))
    );
}
