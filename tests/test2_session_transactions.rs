use sql_entity::prelude::*;
use tempfile::TempDir;

async fn setup() -> Result<(TempDir, Database), SqlEntityError> {
    let dir = tempfile::tempdir().map_err(|e| SqlEntityError::ConfigError(e.to_string()))?;
    let path = dir.path().join("tx.db");
    let db = Database::new(
        ConnectionConfig::builder()
            .profile("main", ProfileConfig::new(path.to_string_lossy()))
            .finish(),
    );
    db.session()
        .execute(
            "main",
            "CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount REAL NOT NULL);",
        )
        .await?;
    Ok((dir, db))
}

async fn count_rows(session: &Session) -> Result<i64, SqlEntityError> {
    let value = session.execute("main", "SELECT COUNT(*) FROM ledger").await?;
    value
        .as_int()
        .copied()
        .ok_or_else(|| SqlEntityError::ExecutionError("missing count".into()))
}

#[tokio::test]
async fn commit_persists_and_closes() -> Result<(), SqlEntityError> {
    let (_dir, db) = setup().await?;
    let session = db.session();

    session
        .begin_transaction("main", IsolationLevel::ReadCommitted)
        .await?;
    assert!(session.is_transaction_started("main"));
    session
        .begin_transaction("main", IsolationLevel::Serializable)
        .await?;
    session
        .execute("main", "INSERT INTO ledger(amount) VALUES (10.5)")
        .await?;
    session
        .execute("main", "INSERT INTO ledger(amount) VALUES (4.5)")
        .await?;
    assert_eq!(db.open_connections(), 1);

    assert!(session.commit("main").await?);
    assert!(!session.is_transaction_started("main"));
    assert_eq!(db.open_connections(), 0);
    assert_eq!(count_rows(&session).await?, 2);
    Ok(())
}

#[tokio::test]
async fn rollback_discards_work() -> Result<(), SqlEntityError> {
    let (_dir, db) = setup().await?;
    let session = db.session();

    session.begin_default(IsolationLevel::default()).await?;
    session
        .execute_default("INSERT INTO ledger(amount) VALUES (1)")
        .await?;
    assert!(session.rollback_default().await?);
    assert_eq!(db.open_connections(), 0);
    assert_eq!(count_rows(&session).await?, 0);
    Ok(())
}

#[tokio::test]
async fn commit_and_rollback_without_transaction_report_false() -> Result<(), SqlEntityError> {
    let (_dir, db) = setup().await?;
    let session = db.session();
    assert!(!session.commit("main").await?);
    assert!(!session.rollback("main").await?);
    session.end_transaction("main").await?;
    Ok(())
}

#[tokio::test]
async fn failure_inside_transaction_rolls_back_and_closes() -> Result<(), SqlEntityError> {
    let (_dir, db) = setup().await?;
    let session = db.session();

    session
        .begin_transaction("main", IsolationLevel::Serializable)
        .await?;
    session
        .execute("main", "INSERT INTO ledger(amount) VALUES (99)")
        .await?;
    let err = session
        .execute("main", "INSERT INTO ledger(amount) VALUES (NULL)")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationFailed);
    assert!(!session.is_transaction_started("main"));
    assert_eq!(db.open_connections(), 0);

    // nothing to finish; the earlier insert is gone
    assert!(!session.commit("main").await?);
    assert_eq!(count_rows(&session).await?, 0);
    Ok(())
}

#[tokio::test]
async fn end_transaction_commits() -> Result<(), SqlEntityError> {
    let (_dir, db) = setup().await?;
    let session = db.session();

    session
        .begin_transaction("main", IsolationLevel::RepeatableRead)
        .await?;
    session
        .execute("main", "INSERT INTO ledger(amount) VALUES (3)")
        .await?;
    session.end_default().await?;
    assert_eq!(db.open_connections(), 0);
    assert_eq!(count_rows(&session).await?, 1);
    Ok(())
}

#[tokio::test]
async fn sessions_do_not_share_transactions() -> Result<(), SqlEntityError> {
    let (_dir, db) = setup().await?;
    let writer = db.session();
    let reader = db.session();
    assert_ne!(writer.id(), reader.id());

    writer
        .begin_transaction("main", IsolationLevel::ReadCommitted)
        .await?;
    writer
        .execute("main", "INSERT INTO ledger(amount) VALUES (7)")
        .await?;
    assert!(!reader.is_transaction_started("main"));
    assert_eq!(count_rows(&reader).await?, 0);
    assert_eq!(count_rows(&writer).await?, 1);

    assert!(writer.commit("main").await?);
    assert_eq!(count_rows(&reader).await?, 1);
    Ok(())
}

#[tokio::test]
async fn dropping_a_session_releases_its_connection() -> Result<(), SqlEntityError> {
    let (_dir, db) = setup().await?;
    {
        let session = db.session();
        session
            .begin_transaction("main", IsolationLevel::Serializable)
            .await?;
        session
            .execute("main", "INSERT INTO ledger(amount) VALUES (1)")
            .await?;
        assert_eq!(db.open_connections(), 1);
    }
    assert_eq!(db.open_connections(), 0);
    assert_eq!(count_rows(&db.session()).await?, 0);
    Ok(())
}
