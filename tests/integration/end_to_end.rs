use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use angler::config::CatalogConfig;
use angler::engine::{AccountWorker, DecisionPolicy, LaunchDelay, Orchestrator};
use angler::session::{ConnectorLauncher, SessionEngine};
use angler::types::*;

use crate::mock_game::MockGame;
use crate::scripted_session::{command_names, Script, ScriptedConnector};

fn policy(intensity: Intensity) -> DecisionPolicy {
    DecisionPolicy::new(intensity, CatalogConfig::default())
}

fn ready_to_fish(id: &str) -> Profile {
    Profile {
        id: id.to_string(),
        level: 7,
        exp: 120.0,
        gold: 300.0,
        energy: 5.0,
        completed_tutorial: true,
        claimed_daily_reward: true,
    }
}

fn launcher(connector: ScriptedConnector) -> ConnectorLauncher<ScriptedConnector> {
    ConnectorLauncher::new(SessionEngine::new("theme-e2e"), connector)
}

// ---------------------------------------------------------------------------
// Policy + session engine
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_fishing_session_finished_by_simulator() {
    let game = MockGame::with_profile(ready_to_fish("user-000001"));
    let sessions = launcher(ScriptedConnector::new(Script::Quiet));

    let outcome = policy(Intensity::Short).run_cycle(&game, &sessions).await.unwrap();

    match outcome {
        ActionOutcome::Fished { game_won, frames } => {
            assert_eq!(game_won, None);
            assert!(frames > 0 && frames % 4 == 0, "frames = {frames}");
        }
        other => panic!("expected a fishing session, got {other:?}"),
    }
    assert_eq!(sessions.connector().command_names(), vec!["prepare", "start", "end"]);
}

#[tokio::test(start_paused = true)]
async fn test_service_game_over_cancels_simulator() {
    let game = MockGame::with_profile(ready_to_fish("user-000002"));
    let sessions = launcher(ScriptedConnector::new(Script::GameOver {
        after: Duration::from_secs(1),
        success: true,
    }));

    let outcome = policy(Intensity::Long).run_cycle(&game, &sessions).await.unwrap();

    assert!(matches!(outcome, ActionOutcome::Fished { game_won: Some(true), .. }));
    // The simulator lost the race and never sent `end`.
    assert_eq!(sessions.connector().command_names(), vec!["prepare", "start"]);
}

#[tokio::test(start_paused = true)]
async fn test_prepare_carries_range_and_theme() {
    let game = MockGame::with_profile(ready_to_fish("user-000003"));
    let connects = Arc::new(AtomicUsize::new(0));
    let commands = Arc::new(Mutex::new(Vec::<Value>::new()));
    let sessions = launcher(ScriptedConnector::shared(
        Script::Quiet,
        Arc::clone(&connects),
        Arc::clone(&commands),
    ));

    policy(Intensity::Mid).run_cycle(&game, &sessions).await.unwrap();

    let sent = commands.lock().unwrap().clone();
    assert_eq!(sent[0]["range"], "mid_range");
    assert_eq!(sent[0]["themeId"], "theme-e2e");
    assert_eq!(sent[0]["xDeviceFingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(sent[2]["transactionId"], "tx-e2e");
    assert_eq!(sent[2]["rep"]["fs"], 100);
    assert_eq!(sent[2]["rep"]["ns"], 200);
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hang_up_before_init_is_a_session_error() {
    let game = MockGame::with_profile(ready_to_fish("user-000004"));
    let sessions = launcher(ScriptedConnector::new(Script::HangUpBeforeInit));

    let err = policy(Intensity::Short)
        .run_cycle(&game, &sessions)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<FrenzyError>(),
        Some(FrenzyError::SessionAborted { .. })
    ));
    assert_eq!(sessions.connector().command_names(), vec!["prepare"]);
}

// ---------------------------------------------------------------------------
// Orchestrator end to end
// ---------------------------------------------------------------------------

/// Worker backed by one `MockGame` per token and a scripted session server.
struct MockWorker {
    games: HashMap<String, MockGame>,
    policy: DecisionPolicy,
    script: Script,
    refuse_first: usize,
    connects: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<Value>>>,
}

impl MockWorker {
    fn new(games: HashMap<String, MockGame>, script: Script) -> Self {
        Self {
            games,
            policy: policy(Intensity::Short),
            script,
            refuse_first: 0,
            connects: Arc::new(AtomicUsize::new(0)),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AccountWorker for MockWorker {
    async fn work(&self, account: &Account, _proxy: Option<&str>) -> Result<ActionOutcome> {
        let game = self
            .games
            .get(account.token())
            .ok_or_else(|| anyhow!("unknown account"))?;
        let connector = ScriptedConnector::shared(
            self.script,
            Arc::clone(&self.connects),
            Arc::clone(&self.commands),
        )
        .refusing_first(self.refuse_first);
        self.policy.run_cycle(game, &launcher(connector)).await
    }
}

fn orchestrate(worker: MockWorker, tokens: &[&str]) -> Orchestrator<MockWorker> {
    let accounts = tokens.iter().map(|t| Account::new(*t)).collect();
    Orchestrator::new(worker, accounts, vec![]).with_launch_delay(LaunchDelay::Fixed(Duration::ZERO))
}

fn detail<'a>(report: &'a RoundReport, account: &str) -> &'a TaskOutcome {
    report
        .outcomes
        .iter()
        .find(|o| o.account == account)
        .unwrap_or_else(|| panic!("no outcome for {account}"))
}

#[tokio::test(start_paused = true)]
async fn test_accounts_walk_the_decision_tree_over_rounds() {
    let newcomer = MockGame::fresh("user-aaaaaa");
    let tired = MockGame::with_profile(Profile {
        gold: 0.0,
        energy: 0.0,
        ..ready_to_fish("user-bbbbbb")
    });
    tired.add_item("sushi", "Sushi Roll");

    let games = HashMap::from([
        ("token-aaaa".to_string(), newcomer.clone()),
        ("token-bbbb".to_string(), tired.clone()),
    ]);
    let mut orch = orchestrate(MockWorker::new(games, Script::Quiet), &["token-aaaa", "token-bbbb"]);

    let round1 = orch.run_round().await;
    assert_eq!(detail(&round1, "aaaa").detail, "tutorial completed");
    assert_eq!(detail(&round1, "bbbb").detail, "used recovery item 'Sushi Roll'");

    let round2 = orch.run_round().await;
    assert_eq!(detail(&round2, "aaaa").detail, "daily reward claimed, 1 quests verified");
    assert!(detail(&round2, "bbbb").detail.starts_with("fished"));
    assert_eq!(newcomer.count("verify_quest"), 1);
    assert!(newcomer.calls().contains(&"verify_quest:q-follow".to_string()));

    let round3 = orch.run_round().await;
    assert_eq!(detail(&round3, "aaaa").detail, "exp scroll bought and used");
    assert_eq!(newcomer.profile().gold, 1500.0);

    // Gold now sits exactly at the threshold, so the account goes fishing.
    let round4 = orch.run_round().await;
    assert!(detail(&round4, "aaaa").detail.starts_with("fished"));

    for report in [&round1, &round2, &round3, &round4] {
        assert_eq!(report.succeeded(), 2);
        assert!(report.outcomes.iter().all(|o| o.attempts == 1));
    }
    assert_eq!(orch.rounds_completed(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_failures_are_retried_and_isolated() {
    let flaky = MockGame::with_profile(ready_to_fish("user-cccccc"));
    flaky.fail_profile(2);
    let broken = MockGame::with_profile(ready_to_fish("user-dddddd"));
    broken.set_error("HTTP 500");
    let healthy = MockGame::fresh("user-eeeeee");

    let games = HashMap::from([
        ("token-cccc".to_string(), flaky.clone()),
        ("token-dddd".to_string(), broken.clone()),
        ("token-eeee".to_string(), healthy.clone()),
    ]);
    let mut orch = orchestrate(
        MockWorker::new(games, Script::Quiet),
        &["token-cccc", "token-dddd", "token-eeee"],
    );

    let report = orch.run_round().await;

    let recovered = detail(&report, "cccc");
    assert!(recovered.succeeded);
    assert_eq!(recovered.attempts, 3);
    assert_eq!(flaky.count("fetch_profile"), 3);

    let failed = detail(&report, "dddd");
    assert!(!failed.succeeded);
    assert_eq!(failed.attempts, 3);
    assert!(failed.detail.contains("HTTP 500"));
    assert_eq!(broken.count("fetch_profile"), 3);

    let fine = detail(&report, "eeee");
    assert!(fine.succeeded);
    assert_eq!(fine.attempts, 1);
    assert_eq!(healthy.count("complete_tutorial"), 1);

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refused_session_is_retried_on_next_attempt() {
    let game = MockGame::with_profile(ready_to_fish("user-ffffff"));
    let games = HashMap::from([("token-ffff".to_string(), game.clone())]);
    let mut worker = MockWorker::new(games, Script::Quiet);
    worker.refuse_first = 1;
    let connects = Arc::clone(&worker.connects);
    let commands = Arc::clone(&worker.commands);

    let mut orch = orchestrate(worker, &["token-ffff"]);
    let report = orch.run_round().await;

    let outcome = detail(&report, "ffff");
    assert!(outcome.succeeded);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(connects.load(Ordering::SeqCst), 2);
    // The profile is fetched again on the retry.
    assert_eq!(game.count("fetch_profile"), 2);
    assert_eq!(command_names(&commands), vec!["prepare", "start", "end"]);
}
