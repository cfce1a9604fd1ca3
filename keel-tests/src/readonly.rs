use keel::{DataError, Driver, ErrorExt, Executor, Group, Scope, TxOptions};

pub async fn readonly<D: Driver>(group: &Group<D>) {
    if group.readonly_dbs().is_empty() {
        log::warn!("The group has no replica, skipping the readonly tests");
        return;
    }
    let replica = group.readonly_db();
    assert!(replica.is_readonly());
    assert!(!group.db().is_readonly());

    let error = replica
        .begin_tx(TxOptions::default())
        .await
        .expect_err("A replica must reject a writable transaction");
    assert!(error.is_readonly());

    let tx = replica
        .begin_tx(TxOptions::read_only())
        .await
        .expect("A replica accepts a read-only transaction");
    assert!(tx.is_read_only());
    let count: i64 = tx
        .fetch_one("SELECT COUNT(*) FROM keel_ledger", &())
        .await
        .expect("Could not read from the replica");
    assert!(count >= 0);
    let error = tx
        .begin_tx(TxOptions::default())
        .await
        .expect_err("A read-only transaction cannot nest");
    assert_eq!(error.data_error(), Some(&DataError::Readonly));
    tx.rollback().await.expect("Could not roll back");

    // Read-only transactions go to a replica unless the scope says otherwise
    let (_, tx) = group
        .begin(&Scope::new(), TxOptions::read_only())
        .await
        .expect("Could not begin a read-only transaction");
    assert!(tx.db().is_readonly());
    tx.rollback().await.expect("Could not roll back");

    let scope = group.writable_only(&Scope::new());
    assert!(scope.is_writable_only());
    let (_, tx) = group
        .begin(&scope, TxOptions::read_only())
        .await
        .expect("Could not begin a read-only transaction");
    assert!(!tx.db().is_readonly());
    tx.rollback().await.expect("Could not roll back");

    let (picked, handle) = group.pick_executor(&scope);
    assert!(handle.as_tx().is_none());
    assert!(picked.handle().is_some());
    let (_, again) = group.pick_executor(&picked);
    assert!(matches!(again, keel::Handle::Db(db) if !db.is_readonly()));
}
