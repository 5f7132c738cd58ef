//! Round lifecycle guarantees, exercised against the in-memory program

use crash_operator::{
    chain::memory::{ChainCall, ChainOp, InMemoryChain},
    config::{GameDefaults, RoundTiming},
    coordinator::{Coordinator, RoundLoop},
    errors::{ChainError, ControlError},
    games::{
        outcome::{OutcomeSource, UniformCrashPoints},
        types::{MAX_CRASH_POINT, MIN_CRASH_POINT},
        ConfigUpdate, CrashPoint, GameConfig,
    },
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(5);

fn defaults() -> GameDefaults {
    GameDefaults {
        house_edge: 5,
        min_bet: 1_000_000,
        max_bet: 100_000_000,
    }
}

fn chain_with_completed(total: u64) -> Arc<InMemoryChain> {
    Arc::new(InMemoryChain::with_config(GameConfig {
        house_edge_percent: 5,
        min_bet: 1_000_000,
        max_bet: 100_000_000,
        total_games_completed: total,
    }))
}

async fn ready_coordinator(chain: Arc<InMemoryChain>) -> Arc<Coordinator> {
    let coordinator = Coordinator::new(chain, TIMEOUT);
    coordinator.ensure_initialized(&defaults()).await.unwrap();
    Arc::new(coordinator)
}

#[tokio::test]
async fn test_bootstrap_scenario_writes_defaults() {
    let chain = Arc::new(InMemoryChain::new());
    let coordinator = Coordinator::new(chain.clone(), TIMEOUT);

    let config = coordinator.ensure_initialized(&defaults()).await.unwrap();

    assert_eq!(
        chain.calls(),
        vec![
            ChainCall::Initialize(5),
            ChainCall::UpdateConfig(ConfigUpdate::all(1_000_000, 100_000_000, 5)),
        ]
    );
    let on_chain = chain.config().unwrap();
    assert_eq!(on_chain.house_edge_percent, 5);
    assert_eq!(on_chain.min_bet, 1_000_000);
    assert_eq!(on_chain.max_bet, 100_000_000);
    assert_eq!(config, on_chain);
}

#[tokio::test]
async fn test_second_bootstrap_is_a_no_op() {
    let chain = Arc::new(InMemoryChain::new());
    let coordinator = Coordinator::new(chain.clone(), TIMEOUT);

    let first = coordinator.ensure_initialized(&defaults()).await.unwrap();
    let calls_after_first = chain.calls().len();
    let second = coordinator.ensure_initialized(&defaults()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(chain.calls().len(), calls_after_first);
}

#[tokio::test]
async fn test_begin_twice_rejected_without_submission() {
    let chain = chain_with_completed(0);
    let coordinator = ready_coordinator(chain.clone()).await;

    let round_id = coordinator.begin_next_round().await.unwrap();
    let submitted = chain.calls().len();

    assert!(matches!(
        coordinator.begin_next_round().await,
        Err(ControlError::RoundInProgress(id)) if id == round_id
    ));
    assert_eq!(chain.calls().len(), submitted);
}

#[tokio::test]
async fn test_failed_start_reuses_round_id() {
    let chain = chain_with_completed(6);
    chain.fail_next(ChainOp::StartRound, ChainError::Rpc("connection reset".to_string()));
    let coordinator = ready_coordinator(chain.clone()).await;

    assert!(coordinator.begin_next_round().await.is_err());
    assert_eq!(coordinator.next_round_id().await, 7);

    assert_eq!(coordinator.begin_next_round().await.unwrap(), 7);
    assert!(chain.round(7).unwrap().active);
}

#[tokio::test]
async fn test_manual_round_jumps_counter_forward() {
    let chain = chain_with_completed(9);
    let coordinator = ready_coordinator(chain.clone()).await;
    assert_eq!(coordinator.next_round_id().await, 10);

    coordinator
        .begin_round(50, CrashPoint::new(250).unwrap())
        .await
        .unwrap();

    assert_eq!(chain.round(50).unwrap().crash_point, 250);
    assert_eq!(coordinator.next_round_id().await, 51);
}

#[tokio::test]
async fn test_partial_update_leaves_bounds() {
    let chain = chain_with_completed(0);
    let coordinator = ready_coordinator(chain.clone()).await;

    coordinator
        .update_config(ConfigUpdate {
            house_edge: Some(7),
            ..Default::default()
        })
        .await
        .unwrap();

    let config = chain.config().unwrap();
    assert_eq!(config.house_edge_percent, 7);
    assert_eq!(config.min_bet, 1_000_000);
    assert_eq!(config.max_bet, 100_000_000);
}

#[test]
fn test_generated_crash_points_in_range() {
    let source = UniformCrashPoints;
    for _ in 0..10_000 {
        let cp = source.next_crash_point().hundredths();
        assert!((MIN_CRASH_POINT..=MAX_CRASH_POINT).contains(&cp));
    }
}

#[tokio::test]
async fn test_loop_crash_points_in_range() {
    let chain = Arc::new(InMemoryChain::new());
    let coordinator = ready_coordinator(chain.clone()).await;
    let shutdown = CancellationToken::new();
    let timing = RoundTiming {
        active_duration_ms: 2,
        gap_duration_ms: 1,
        retry_backoff_ms: 5,
        finish_on_shutdown: true,
    };

    let handle = RoundLoop::new(coordinator, timing, shutdown.clone()).spawn();
    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown.cancel();
    handle.await.unwrap();

    let crash_points: Vec<u16> = chain
        .calls()
        .iter()
        .filter_map(|call| match call {
            ChainCall::StartRound(_, cp) => Some(*cp),
            _ => None,
        })
        .collect();
    assert!(!crash_points.is_empty());
    assert!(crash_points
        .iter()
        .all(|cp| (MIN_CRASH_POINT..=MAX_CRASH_POINT).contains(cp)));
}

#[tokio::test]
async fn test_concurrent_transitions_never_overlap() {
    let chain = Arc::new(InMemoryChain::new());
    chain.set_latency(Some(Duration::from_millis(2)));
    let coordinator = ready_coordinator(chain.clone()).await;
    let shutdown = CancellationToken::new();
    let timing = RoundTiming {
        active_duration_ms: 5,
        gap_duration_ms: 1,
        retry_backoff_ms: 2,
        finish_on_shutdown: true,
    };

    let round_loop = RoundLoop::new(coordinator.clone(), timing, shutdown.clone()).spawn();

    let mut operators = Vec::new();
    for worker in 0..4u64 {
        let coordinator = coordinator.clone();
        operators.push(tokio::spawn(async move {
            for i in 0..25u64 {
                let id = 1_000 + worker * 100 + i;
                let _ = coordinator.begin_round(id, CrashPoint::new(300).unwrap()).await;
                let _ = coordinator.begin_next_round().await;
                if let Some(current) = coordinator.current_round().await {
                    let _ = coordinator.end_round(current.round_id).await;
                }
                let _ = coordinator.finish_current_round().await;
                tokio::task::yield_now().await;
            }
        }));
    }

    for operator in operators {
        operator.await.unwrap();
    }
    shutdown.cancel();
    round_loop.await.unwrap();

    assert_eq!(chain.peak_active_rounds(), 1);
    assert!(chain.active_rounds() <= 1);
}

#[tokio::test]
async fn test_bootstrap_after_initialize_timeout_writes_defaults() {
    let chain = Arc::new(InMemoryChain::new());
    chain.stall_next(ChainOp::Initialize);
    let coordinator = Coordinator::new(chain.clone(), Duration::from_millis(50));

    assert!(coordinator.ensure_initialized(&defaults()).await.is_err());
    coordinator.ensure_initialized(&defaults()).await.unwrap();

    let on_chain = chain.config().unwrap();
    assert_eq!(on_chain.house_edge_percent, 5);
    assert_eq!(on_chain.min_bet, 1_000_000);
    assert_eq!(on_chain.max_bet, 100_000_000);
}

#[tokio::test]
async fn test_loop_recovers_from_end_timeout() {
    let chain = chain_with_completed(0);
    let coordinator = Arc::new(Coordinator::new(chain.clone(), Duration::from_millis(20)));
    coordinator.ensure_initialized(&defaults()).await.unwrap();
    chain.stall_next(ChainOp::EndRound);
    let shutdown = CancellationToken::new();
    let timing = RoundTiming {
        active_duration_ms: 2,
        gap_duration_ms: 1,
        retry_backoff_ms: 5,
        finish_on_shutdown: true,
    };

    let handle = RoundLoop::new(coordinator.clone(), timing, shutdown.clone()).spawn();
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.cancel();
    handle.await.unwrap();

    let starts = chain
        .calls()
        .iter()
        .filter(|call| matches!(call, ChainCall::StartRound(..)))
        .count();
    assert!(starts > 1);
    assert_eq!(chain.active_rounds(), 0);
    assert!(coordinator.current_round().await.is_none());
}
