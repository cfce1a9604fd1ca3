use keel::{DataError, Driver, ErrorExt, Executor, Group, Record, Scope, TxOptions, params};

#[derive(Default, Debug, Clone, PartialEq, Record)]
#[keel(table = "keel_ledger")]
pub struct Entry {
    #[keel("id;primary")]
    pub id: i64,
    #[keel("memo")]
    pub memo: String,
}

const INSERT: &str = "INSERT INTO keel_ledger (id, memo) VALUES (${id}, ${memo})";

fn entry(id: i64, memo: &str) -> Entry {
    Entry {
        id,
        memo: memo.into(),
    }
}

async fn reset<D: Driver>(group: &Group<D>) {
    group
        .drop_table::<Entry>()
        .await
        .expect("Failed to drop the ledger");
    group
        .create_table::<Entry>()
        .await
        .expect("Failed to create the ledger");
}

async fn ids<D: Driver>(group: &Group<D>) -> Vec<i64> {
    let mut result = Vec::with_capacity(4);
    group
        .fetch_many("SELECT id FROM keel_ledger ORDER BY id", &(), &mut result)
        .await
        .expect("Could not read the ledger");
    result
}

pub async fn savepoints<D: Driver>(group: &Group<D>) {
    reset(group).await;
    let scope = Scope::new();

    let (outer_scope, outer) = group
        .begin(&scope, TxOptions::default())
        .await
        .expect("Could not begin the outer transaction");
    assert!(outer.savepoint().is_none());
    outer
        .execute(INSERT, &entry(1, "outer"))
        .await
        .expect("Could not insert from the outer transaction");

    // Rolled back nested work does not touch the outer transaction
    let (inner_scope, inner) = group
        .begin(&outer_scope, TxOptions::default())
        .await
        .expect("Could not begin the nested transaction");
    assert!(inner.savepoint().is_some());
    let (_, handle) = group.pick_executor(&inner_scope);
    assert!(handle.as_tx().is_some());
    handle
        .execute(INSERT, &entry(2, "nested"))
        .await
        .expect("Could not insert from the nested transaction");
    inner
        .rollback()
        .await
        .expect("Could not roll back the nested transaction");
    assert!(inner.is_finished());
    let error = inner
        .execute(INSERT, &entry(3, "late"))
        .await
        .expect_err("A finished transaction cannot be used");
    assert_eq!(error.data_error(), Some(&DataError::TxDone));

    // Committed nested work stays
    let (_, named) = group
        .begin(&outer_scope, TxOptions::default().savepoint("second"))
        .await
        .expect("Could not begin the named nested transaction");
    assert_eq!(named.savepoint(), Some("second"));
    named
        .execute(INSERT, &entry(4, "second"))
        .await
        .expect("Could not insert from the named nested transaction");
    named
        .commit()
        .await
        .expect("Could not commit the nested transaction");

    // Only the work after the savepoint is discarded
    outer
        .execute(INSERT, &entry(5, "discarded"))
        .await
        .expect("Could not insert from the outer transaction");
    outer
        .rollback_to("second")
        .await
        .expect("Could not roll back to the savepoint");
    outer
        .commit()
        .await
        .expect("Could not commit the outer transaction");
    assert_eq!(ids(group).await, [1, 4]);

    // Statements prepared outside are rebound into the transaction
    let stmt = group
        .prepare("DELETE FROM keel_ledger WHERE id = ${id}")
        .await
        .expect("Could not prepare the delete");
    let (_, tx) = group
        .begin(&scope, TxOptions::default())
        .await
        .expect("Could not begin the transaction");
    let bound = tx.stmt(&stmt).await.expect("Could not rebind the statement");
    drop(stmt);
    let result = bound
        .execute(&params!("id" => 4i64))
        .await
        .expect("Could not delete from the transaction");
    assert_eq!(result.rows_affected, 1);
    tx.rollback().await.expect("Could not roll back");
    drop(bound);
    assert_eq!(ids(group).await, [1, 4]);
}

pub async fn auto_commit<D: Driver>(group: &Group<D>) {
    reset(group).await;
    let scope = Scope::new();

    let (_, tx) = group
        .begin(&scope, TxOptions::default())
        .await
        .expect("Could not begin");
    let value = tx
        .auto_commit(|tx| async move {
            tx.execute(INSERT, &entry(1, "committed")).await?;
            Ok::<_, keel::Error>(7)
        })
        .await
        .expect("The transaction should commit");
    assert_eq!(value, 7);
    assert_eq!(ids(group).await, [1]);

    let (_, tx) = group
        .begin(&scope, TxOptions::default())
        .await
        .expect("Could not begin");
    let error = tx
        .auto_commit(|tx| async move {
            tx.execute(INSERT, &entry(2, "rolled back")).await?;
            tx.fetch_one::<i64, _>("SELECT id FROM keel_ledger WHERE id < 0", &())
                .await
        })
        .await
        .expect_err("The closure fails");
    assert!(error.is_no_rows());
    assert_eq!(ids(group).await, [1]);

    let (_, tx) = group
        .begin(&scope, TxOptions::default())
        .await
        .expect("Could not begin");
    tx.auto_commit(|tx| async move {
        tx.execute(INSERT, &entry(3, "canceled")).await?;
        tx.cancel();
        Ok::<_, keel::Error>(())
    })
    .await
    .expect("A canceled transaction is not an error");
    assert_eq!(ids(group).await, [1]);

    // Nested scopes commit into their parent
    let (outer_scope, outer) = group
        .begin(&scope, TxOptions::default())
        .await
        .expect("Could not begin");
    let result = outer
        .auto_commit(|_| async move {
            let (_, inner) = group.begin(&outer_scope, TxOptions::default()).await?;
            inner
                .auto_commit(|tx| async move {
                    tx.execute(INSERT, &entry(4, "nested")).await?;
                    Ok::<_, keel::Error>(())
                })
                .await
        })
        .await;
    result.expect("The nested transactions should commit");
    assert_eq!(ids(group).await, [1, 4]);
}
