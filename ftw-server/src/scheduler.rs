//! Drop scheduler
//!
//! Executes due drops into the vault. Runs on demand through
//! `POST /api/run-drop-scheduler`, and optionally on an interval inside the
//! server process.

use std::time::Duration;

use ftw_common::db::drops;
use ftw_common::ledger::NotaryEvent;
use ftw_common::time;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::AppState;

/// Execute every drop due now; returns how many were executed by this run
pub async fn run_once(state: &AppState) -> ftw_common::Result<usize> {
    let executed = drops::run_due_drops(&state.db, time::now()).await?;

    for drop_id in &executed {
        state
            .notarize(NotaryEvent::new("drop_executed").key(format!("drops/{}", drop_id)))
            .await;
    }

    Ok(executed.len())
}

/// Run the scheduler every `period` until the task is aborted
pub fn spawn_drop_scheduler(state: AppState, period: Duration) -> JoinHandle<()> {
    info!("Drop scheduler running every {:?}", period);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = run_once(&state).await {
                error!("Drop scheduler run failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StaticClassifier;
    use chrono::Duration as ChronoDuration;
    use ftw_common::db::init_database;
    use ftw_common::ledger::{GovernanceLedger, NotaryFilter};
    use ftw_common::payments::SafeSearch;
    use ftw_common::vault::TierFilter;
    use serde_json::json;
    use std::sync::Arc;

    async fn state(dir: &tempfile::TempDir) -> AppState {
        let db = init_database(&dir.path().join("ftw.db")).await.unwrap();
        AppState::new(
            db,
            GovernanceLedger::in_memory(),
            Arc::new(StaticClassifier::returning(SafeSearch::default())),
            0,
        )
    }

    fn due_drop(title: &str) -> drops::NewDrop {
        drops::NewDrop {
            title: title.to_string(),
            tier_gate: "general".to_string(),
            unlock_at: time::now() - ChronoDuration::seconds(5),
            content: json!({"title": title}),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_run_once_notarizes_each_drop() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir).await;
        drops::schedule_drop(&state.db, due_drop("a")).await.unwrap();
        drops::schedule_drop(&state.db, due_drop("b")).await.unwrap();

        assert_eq!(run_once(&state).await.unwrap(), 2);
        assert_eq!(run_once(&state).await.unwrap(), 0);

        let filter = NotaryFilter {
            command: Some("drop_executed".into()),
            ..Default::default()
        };
        assert_eq!(state.notary.read().await.query(&filter).len(), 2);
    }

    #[tokio::test]
    async fn test_interval_scheduler_executes_due_drops() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir).await;
        drops::schedule_drop(&state.db, due_drop("tick")).await.unwrap();

        let handle = spawn_drop_scheduler(state.clone(), Duration::from_millis(20));

        let filter = TierFilter::parse("general");
        let mut vault = Vec::new();
        for _ in 0..100 {
            vault = drops::list_vault(&state.db, "anyone", &filter).await.unwrap();
            if !vault.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        assert_eq!(vault.len(), 1);
        assert_eq!(vault[0].title, "tick");
    }
}
