//! Transaction sequencing against a recording API.
//!
//! Run with: cargo test --test test_transaction

use std::sync::Mutex;

use async_trait::async_trait;
use cinchy_rs::{
    Error, Outcome, QueryResult, Result, Statement, TransactionApi, TransactionSequencer,
    TransactionState,
};
use tokio_test::{assert_err, assert_ok};

#[derive(Default)]
struct RecordingApi {
    calls: Mutex<Vec<String>>,
    failing: Vec<&'static str>,
}

impl RecordingApi {
    fn failing(steps: &[&'static str]) -> Self {
        Self {
            failing: steps.to_vec(),
            ..Default::default()
        }
    }

    fn step(&self, name: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(name.to_string());
        if self.failing.contains(&name) {
            return Err(Error::remote(format!("{} rejected", name)));
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| *c == name).count()
    }
}

#[async_trait]
impl TransactionApi for RecordingApi {
    async fn open_connection(&self) -> Result<String> {
        self.step("open")?;
        Ok("conn-1".to_string())
    }

    async fn begin_transaction(&self, connection_id: &str) -> Result<Option<String>> {
        assert_eq!(connection_id, "conn-1");
        self.step("begin")?;
        Ok(Some("tx-1".to_string()))
    }

    async fn execute(
        &self,
        connection_id: &str,
        transaction_id: &str,
        _: &Statement,
    ) -> Result<QueryResult> {
        assert_eq!((connection_id, transaction_id), ("conn-1", "tx-1"));
        self.step("execute")?;
        QueryResult::from_json(r#"{"schema":[{"columnName":"n","type":"Int32"}],"data":[[1]]}"#)
    }

    async fn commit_transaction(&self, _: &str, _: &str) -> Result<bool> {
        self.step("commit")?;
        Ok(true)
    }

    async fn rollback_transaction(&self, _: &str, _: &str) -> Result<bool> {
        self.step("rollback")?;
        Ok(true)
    }

    async fn close_connection(&self, _: &str) -> Result<bool> {
        self.step("close")?;
        Ok(true)
    }
}

fn statement() -> Statement {
    Statement::csql("INSERT INTO [SDK].[Answers] ([Answer]) VALUES ('yes')")
}

#[tokio::test]
async fn test_step_by_step_commit() {
    let api = RecordingApi::default();
    let mut seq = TransactionSequencer::new(&api);

    assert_eq!(seq.open().await.unwrap(), "conn-1");
    assert_eq!(seq.state(), TransactionState::ConnectionOpen);
    assert_eq!(seq.begin().await.unwrap(), Some("tx-1"));
    assert_eq!(seq.state(), TransactionState::TransactionActive);

    let result = seq.execute(&statement()).await.unwrap();
    assert_eq!(result.row_count(), 1);
    seq.execute(&statement()).await.unwrap();
    assert_eq!(seq.state(), TransactionState::Executed);

    seq.commit().await.unwrap();
    assert_eq!(seq.state(), TransactionState::Committed);
    seq.close().await.unwrap();
    assert_eq!(seq.state(), TransactionState::Closed);

    assert_eq!(
        api.calls(),
        vec!["open", "begin", "execute", "execute", "commit", "close"]
    );
}

#[tokio::test]
async fn test_commit_and_rollback_are_exclusive() {
    let api = RecordingApi::default();
    let mut seq = TransactionSequencer::new(&api);
    seq.open().await.unwrap();
    seq.begin().await.unwrap();
    seq.execute(&statement()).await.unwrap();
    seq.commit().await.unwrap();

    assert!(matches!(
        seq.rollback().await,
        Err(Error::InvalidTransactionState {
            state: TransactionState::Committed,
            ..
        })
    ));
    assert_err!(seq.commit().await);
    assert_ok!(seq.close().await);

    assert_eq!(api.count("commit"), 1);
    assert_eq!(api.count("rollback"), 0);
}

#[tokio::test]
async fn test_close_happens_once() {
    let api = RecordingApi::default();
    let mut seq = TransactionSequencer::new(&api);
    assert_ok!(seq.open().await);
    assert_ok!(seq.close().await);

    for _ in 0..3 {
        assert_err!(seq.close().await);
    }
    assert_err!(seq.open().await);
    assert_eq!(api.count("close"), 1);
    assert_eq!(api.count("open"), 1);
}

#[tokio::test]
async fn test_failed_execute_leaves_cleanup_to_caller() {
    let api = RecordingApi::failing(&["execute"]);
    let mut seq = TransactionSequencer::new(&api);
    seq.open().await.unwrap();
    seq.begin().await.unwrap();

    assert!(seq.execute(&statement()).await.is_err());
    assert_eq!(seq.state(), TransactionState::TransactionActive);
    assert_eq!(api.count("rollback"), 0);
    assert_eq!(api.count("close"), 0);

    seq.rollback().await.unwrap();
    seq.close().await.unwrap();
    assert_eq!(api.calls(), vec!["open", "begin", "execute", "rollback", "close"]);
}

#[tokio::test]
async fn test_run_commits_and_closes() {
    let api = RecordingApi::default();
    let result = TransactionSequencer::new(&api)
        .run(&statement(), Outcome::Commit)
        .await
        .unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(api.calls(), vec!["open", "begin", "execute", "commit", "close"]);
}

#[tokio::test]
async fn test_run_rolls_back_failed_execute() {
    let api = RecordingApi::failing(&["execute"]);
    let mut seq = TransactionSequencer::new(&api);
    let err = seq.run(&statement(), Outcome::Commit).await.unwrap_err();

    assert!(err.to_string().contains("execute rejected"));
    assert_eq!(seq.state(), TransactionState::Closed);
    assert_eq!(api.calls(), vec!["open", "begin", "execute", "rollback", "close"]);
}

#[tokio::test]
async fn test_run_closes_after_failed_commit() {
    let api = RecordingApi::failing(&["commit"]);
    let mut seq = TransactionSequencer::new(&api);
    let err = seq.run(&statement(), Outcome::Commit).await.unwrap_err();

    assert!(err.to_string().contains("commit rejected"));
    assert_eq!(seq.state(), TransactionState::Closed);
    assert_eq!(api.count("rollback"), 0);
    assert_eq!(api.count("close"), 1);
}

#[tokio::test]
async fn test_run_closes_after_failed_begin() {
    let api = RecordingApi::failing(&["begin"]);
    let mut seq = TransactionSequencer::new(&api);
    assert!(seq.run(&statement(), Outcome::Rollback).await.is_err());
    assert_eq!(api.calls(), vec!["open", "begin", "close"]);
}

#[tokio::test]
async fn test_run_stops_if_open_fails() {
    let api = RecordingApi::failing(&["open"]);
    let mut seq = TransactionSequencer::new(&api);
    assert!(seq.run(&statement(), Outcome::Commit).await.is_err());
    assert_eq!(seq.state(), TransactionState::Idle);
    assert_eq!(api.calls(), vec!["open"]);
}
