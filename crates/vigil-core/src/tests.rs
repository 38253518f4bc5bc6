//! Engine, windowing and turn-processing tests against `MemoryStore`.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::Duration,
};

use chrono::{Days, NaiveDate};
use thiserror::Error;

use crate::{
  Error,
  assistant::{Assistant, AssistantConfig, Session},
  clock::FixedClock,
  collab::{ChatMessage, Extractor, Responder},
  engine::{UpsertEngine, UpsertOutcome},
  extraction::{Extraction, RawExtraction},
  memory::MemoryStore,
  store::FactStore,
  subject::SubjectName,
  window::{NO_HISTORY, window},
};

fn day1() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 5, 10).unwrap() }

fn name(s: &str) -> SubjectName { SubjectName::parse(s).unwrap() }

fn facts(symptoms: &[&str], vitals: &[(&str, &str)]) -> Extraction {
  RawExtraction::new(symptoms.iter().copied(), vitals.iter().copied())
    .normalize()
}

fn engine() -> (Arc<MemoryStore>, UpsertEngine<MemoryStore>) {
  let store = Arc::new(MemoryStore::new());
  (store.clone(), UpsertEngine::new(store))
}

// ─── Upsert engine ───────────────────────────────────────────────────────────

#[tokio::test]
async fn first_message_creates_subject_and_one_day() {
  let (store, engine) = engine();
  let alice = name("alice");

  let outcome = engine
    .apply(&alice, &facts(&["headache"], &[]), day1())
    .await
    .unwrap();
  assert_eq!(outcome, UpsertOutcome::CreatedSubject);

  assert_eq!(store.list_subjects().await.unwrap().len(), 1);
  let records = store.records(&alice);
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].date, day1());
}

#[tokio::test]
async fn empty_first_message_still_registers_the_day() {
  let (store, engine) = engine();
  let alice = name("alice");

  let outcome = engine
    .apply(&alice, &Extraction::default(), day1())
    .await
    .unwrap();
  assert_eq!(outcome, UpsertOutcome::CreatedSubject);

  let day = store.find_day_record(&alice, day1()).await.unwrap().unwrap();
  assert!(day.symptoms.is_empty());
  assert!(day.vitals.is_empty());
}

#[tokio::test]
async fn new_date_creates_a_second_day() {
  let (store, engine) = engine();
  let alice = name("alice");
  let day2 = day1() + Days::new(1);

  engine.apply(&alice, &facts(&["cough"], &[]), day1()).await.unwrap();
  let outcome = engine
    .apply(&alice, &facts(&["sore throat"], &[]), day2)
    .await
    .unwrap();
  assert_eq!(outcome, UpsertOutcome::CreatedDay);

  let records = store.records(&alice);
  assert_eq!(records.len(), 2);
  assert_eq!(records[1].symptoms, vec!["sore throat"]);
  // Yesterday's record is untouched.
  assert_eq!(records[0].symptoms, vec!["cough"]);
}

#[tokio::test]
async fn symptoms_are_appended_not_replaced() {
  let (store, engine) = engine();
  let alice = name("alice");

  engine
    .apply(&alice, &facts(&["headache"], &[]), day1())
    .await
    .unwrap();
  let outcome = engine
    .apply(&alice, &facts(&["cough"], &[]), day1())
    .await
    .unwrap();
  assert_eq!(outcome, UpsertOutcome::Merged {
    symptoms_appended: 1,
    vitals_merged:     0,
  });

  let day = store.find_day_record(&alice, day1()).await.unwrap().unwrap();
  assert_eq!(day.symptoms, vec!["headache", "cough"]);
}

#[tokio::test]
async fn repeated_symptoms_across_turns_accumulate() {
  let (store, engine) = engine();
  let alice = name("alice");

  engine.apply(&alice, &facts(&["cough"], &[]), day1()).await.unwrap();
  engine.apply(&alice, &facts(&["cough"], &[]), day1()).await.unwrap();

  let day = store.find_day_record(&alice, day1()).await.unwrap().unwrap();
  assert_eq!(day.symptoms, vec!["cough", "cough"]);
}

#[tokio::test]
async fn vitals_are_last_write_wins_per_key() {
  let (store, engine) = engine();
  let alice = name("alice");

  engine
    .apply(&alice, &facts(&[], &[("heart_rate", "80"), ("bp", "120/80")]), day1())
    .await
    .unwrap();
  engine
    .apply(&alice, &facts(&[], &[("Heart Rate", "85")]), day1())
    .await
    .unwrap();

  let day = store.find_day_record(&alice, day1()).await.unwrap().unwrap();
  assert_eq!(day.vitals["heart_rate"], "85");
  assert_eq!(day.vitals["bp"], "120/80");
  assert_eq!(day.vitals.len(), 2);
}

#[tokio::test]
async fn empty_extraction_on_existing_day_is_idempotent() {
  let (store, engine) = engine();
  let alice = name("alice");

  engine
    .apply(&alice, &facts(&["fever"], &[("temp", "38.2")]), day1())
    .await
    .unwrap();
  let before = store.find_day_record(&alice, day1()).await.unwrap().unwrap();

  for _ in 0..2 {
    let outcome = engine
      .apply(&alice, &Extraction::default(), day1())
      .await
      .unwrap();
    assert_eq!(outcome, UpsertOutcome::Unchanged);
  }

  let after = store.find_day_record(&alice, day1()).await.unwrap().unwrap();
  assert_eq!(before, after);
}

#[tokio::test]
async fn alice_scenario() {
  let (store, engine) = engine();
  let alice = name("Alice");

  // "I have a headache and fever, BP 120/80"
  let first = RawExtraction::new(["headache", "fever"], [("bp", "120/80")]);
  engine.apply(&alice, &first.normalize(), day1()).await.unwrap();

  // "also nauseous"
  let second = RawExtraction::new(["nauseous"], Vec::<(&str, &str)>::new());
  engine.apply(&alice, &second.normalize(), day1()).await.unwrap();

  let subject = store.find_subject(&alice).await.unwrap().unwrap();
  assert_eq!(subject.name.as_str(), "alice");

  let day = store.find_day_record(&alice, day1()).await.unwrap().unwrap();
  assert_eq!(day.symptoms, vec!["headache", "fever", "nauseous"]);
  assert_eq!(day.vitals.len(), 1);
  assert_eq!(day.vitals["bp"], "120/80");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_turns_create_one_subject_and_one_day() {
  let (store, engine) = engine();
  let engine = Arc::new(engine);

  let tasks: Vec<_> = (0..16)
    .map(|i| {
      let engine = engine.clone();
      tokio::spawn(async move {
        let symptom = format!("symptom-{i}");
        engine
          .apply(&name("newcomer"), &facts(&[symptom.as_str()], &[]), day1())
          .await
      })
    })
    .collect();

  let mut created = 0;
  for task in tasks {
    match task.await.unwrap().unwrap() {
      UpsertOutcome::CreatedSubject => created += 1,
      UpsertOutcome::Merged { .. } => {}
      other => panic!("unexpected outcome {other:?}"),
    }
  }
  assert_eq!(created, 1);

  assert_eq!(store.list_subjects().await.unwrap().len(), 1);
  let records = store.records(&name("newcomer"));
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].symptoms.len(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn separate_engines_over_one_store_share_subject_locks() {
  let yesterday = day1() - Days::new(1);

  for _ in 0..25 {
    let store = Arc::new(MemoryStore::new());
    let a = Arc::new(UpsertEngine::new(store.clone()));
    let b = Arc::new(UpsertEngine::new(store.clone()));
    a.apply(&name("alice"), &facts(&["old"], &[]), yesterday)
      .await
      .unwrap();

    let first = tokio::spawn({
      let a = a.clone();
      async move { a.apply(&name("alice"), &facts(&["x"], &[]), day1()).await }
    });
    let second = tokio::spawn({
      let b = b.clone();
      async move { b.apply(&name("alice"), &facts(&["y"], &[]), day1()).await }
    });
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let today: Vec<_> = store
      .records(&name("alice"))
      .into_iter()
      .filter(|r| r.date == day1())
      .collect();
    assert_eq!(today.len(), 1, "one record per date across engines");
    let mut symptoms = today[0].symptoms.clone();
    symptoms.sort();
    assert_eq!(symptoms, vec!["x", "y"]);
  }
}

#[tokio::test]
async fn store_outage_surfaces_as_unavailable() {
  let (store, engine) = engine();
  store.set_online(false);

  let err = engine
    .apply(&name("alice"), &facts(&["cough"], &[]), day1())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::StoreUnavailable(_)));
  assert!(err.is_retryable());
}

// ─── History window ──────────────────────────────────────────────────────────

#[tokio::test]
async fn window_is_newest_first_and_bounded() {
  let (store, engine) = engine();
  let alice = name("alice");
  let d = day1();
  let dates = [d - Days::new(5), d - Days::new(3), d - Days::new(1), d];

  for (i, date) in dates.iter().enumerate() {
    let symptom = format!("s{i}");
    engine.apply(&alice, &facts(&[symptom.as_str()], &[]), *date).await.unwrap();
  }

  let four = window(store.as_ref(), &alice, 4).await.unwrap();
  let got: Vec<_> = four.iter().map(|s| s.date).collect();
  assert_eq!(got, vec![dates[3], dates[2], dates[1], dates[0]]);

  let two = window(store.as_ref(), &alice, 2).await.unwrap();
  let got: Vec<_> = two.iter().map(|s| s.date).collect();
  assert_eq!(got, vec![dates[3], dates[2]]);
}

#[tokio::test]
async fn window_for_unknown_subject_is_empty_and_creates_nothing() {
  let (store, _engine) = engine();
  let days = window(store.as_ref(), &name("ghost"), 4).await.unwrap();
  assert!(days.is_empty());
  assert!(store.find_subject(&name("ghost")).await.unwrap().is_none());
}

// ─── Assistant ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("fake collaborator failure")]
struct FakeError;

#[derive(Clone)]
enum Script {
  Facts(RawExtraction),
  Fail,
  Hang,
}

/// Returns a scripted extraction per input; unknown inputs yield nothing.
#[derive(Default)]
struct FakeExtractor {
  scripts: HashMap<String, Script>,
}

impl FakeExtractor {
  fn on(mut self, input: &str, script: Script) -> Self {
    self.scripts.insert(input.to_owned(), script);
    self
  }
}

impl Extractor for FakeExtractor {
  type Error = FakeError;

  async fn extract(&self, text: &str) -> Result<RawExtraction, FakeError> {
    match self.scripts.get(text).cloned() {
      Some(Script::Facts(raw)) => Ok(raw),
      Some(Script::Fail) => Err(FakeError),
      Some(Script::Hang) => std::future::pending().await,
      None => Ok(RawExtraction::default()),
    }
  }
}

type Calls = Arc<Mutex<Vec<(String, usize, String)>>>;

/// Records what it was asked and replies with a fixed string.
#[derive(Default)]
struct FakeResponder {
  hang:  bool,
  calls: Calls,
}

impl Responder for FakeResponder {
  type Error = FakeError;

  async fn respond(
    &self,
    system_context: &str,
    history: &[ChatMessage],
    input: &str,
  ) -> Result<String, FakeError> {
    if self.hang {
      std::future::pending::<()>().await;
    }
    self.calls.lock().unwrap().push((
      system_context.to_owned(),
      history.len(),
      input.to_owned(),
    ));
    Ok(format!("noted: {input}"))
  }
}

fn assistant_with(
  extractor: FakeExtractor,
  responder: FakeResponder,
  window_limit: usize,
) -> (
  Arc<MemoryStore>,
  Calls,
  Assistant<MemoryStore, FakeExtractor, FakeResponder>,
) {
  let (store, engine) = engine();
  let calls = responder.calls.clone();
  let assistant = Assistant::new(
    Arc::new(engine),
    extractor,
    responder,
    Arc::new(FixedClock(day1())),
    AssistantConfig { window_limit, timeout: Duration::from_millis(100) },
  );
  (store, calls, assistant)
}

fn assistant(
  extractor: FakeExtractor,
  responder: FakeResponder,
) -> (
  Arc<MemoryStore>,
  Calls,
  Assistant<MemoryStore, FakeExtractor, FakeResponder>,
) {
  assistant_with(extractor, responder, 4)
}

#[tokio::test]
async fn turn_files_facts_and_passes_history_to_responder() {
  let extractor = FakeExtractor::default().on(
    "I have a headache, BP 120/80",
    Script::Facts(RawExtraction::new(["headache"], [("BP", "120/80")])),
  );
  let (store, calls, assistant) = assistant(extractor, FakeResponder::default());
  let mut session = Session::new(name("alice"));

  let turn = assistant
    .process_turn(&mut session, "I have a headache, BP 120/80")
    .await
    .unwrap();
  assert_eq!(turn.outcome, UpsertOutcome::CreatedSubject);
  assert_eq!(turn.reply, "noted: I have a headache, BP 120/80");
  assert_eq!(turn.extraction.vitals["bp"], "120/80");

  let turn = assistant.process_turn(&mut session, "thanks").await.unwrap();
  assert_eq!(turn.outcome, UpsertOutcome::Unchanged);
  assert_eq!(session.history().len(), 4);

  let calls = calls.lock().unwrap().clone();
  assert_eq!(calls.len(), 2);
  assert!(calls[0].0.contains("headache"));
  assert!(calls[0].0.contains("bp=120/80"));
  // The second call sees the first exchange.
  assert_eq!(calls[1].1, 2);

  assert_eq!(store.records(&name("alice")).len(), 1);
}

#[tokio::test]
async fn failed_extraction_degrades_to_plain_reply() {
  let extractor = FakeExtractor::default().on("???", Script::Fail);
  let (store, _calls, assistant) = assistant(extractor, FakeResponder::default());
  let mut session = Session::new(name("bob"));

  let turn = assistant.process_turn(&mut session, "???").await.unwrap();
  assert!(turn.extraction.is_empty());
  assert_eq!(turn.reply, "noted: ???");
  // The day is still registered.
  assert_eq!(store.records(&name("bob")).len(), 1);
}

#[tokio::test]
async fn context_without_history_is_explicit() {
  // A zero-length window renders the explicit placeholder.
  let (_store, calls, assistant) =
    assistant_with(FakeExtractor::default(), FakeResponder::default(), 0);
  let mut session = Session::new(name("carol"));

  assistant.process_turn(&mut session, "hi").await.unwrap();
  assert_eq!(calls.lock().unwrap()[0].0, NO_HISTORY);
}

#[tokio::test]
async fn extractor_timeout_fails_the_turn() {
  let extractor = FakeExtractor::default().on("slow", Script::Hang);
  let (store, _calls, assistant) = assistant(extractor, FakeResponder::default());
  let mut session = Session::new(name("dave"));

  let err = assistant.process_turn(&mut session, "slow").await.unwrap_err();
  assert!(matches!(err, Error::Timeout { operation: "extraction", .. }));
  assert!(err.is_retryable());
  assert!(session.history().is_empty());
  assert!(store.find_subject(&name("dave")).await.unwrap().is_none());
}

#[tokio::test]
async fn responder_timeout_keeps_committed_writes() {
  let extractor = FakeExtractor::default().on(
    "fever",
    Script::Facts(RawExtraction::new(["fever"], Vec::<(&str, &str)>::new())),
  );
  let responder = FakeResponder { hang: true, ..Default::default() };
  let (store, _calls, assistant) = assistant(extractor, responder);
  let mut session = Session::new(name("erin"));

  let err = assistant.process_turn(&mut session, "fever").await.unwrap_err();
  assert!(matches!(err, Error::Timeout { operation: "response generation", .. }));
  assert!(session.history().is_empty());

  let records = store.records(&name("erin"));
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].symptoms, vec!["fever"]);
}

#[tokio::test]
async fn store_outage_fails_the_turn() {
  let (store, calls, assistant) =
    assistant(FakeExtractor::default(), FakeResponder::default());
  store.set_online(false);
  let mut session = Session::new(name("frank"));

  let err = assistant.process_turn(&mut session, "hello").await.unwrap_err();
  assert!(matches!(err, Error::StoreUnavailable(_)));
  assert!(calls.lock().unwrap().is_empty());
}
