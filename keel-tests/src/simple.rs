use keel::{
    DataError, Driver, ErrorExt, Executor, Group, Hstore, Record, Value, params,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use time::{OffsetDateTime, macros::datetime};
use uuid::Uuid;

#[derive(Default, Debug, Clone, PartialEq, Record)]
#[keel(table = "keel_account")]
pub struct Account {
    #[keel("id;primary")]
    pub id: i64,
    #[keel("email;unique;length=~120")]
    pub email: String,
    #[keel("nickname")]
    pub nickname: Option<String>,
    #[keel("credits;default=0")]
    pub credits: u16,
    #[keel("balance")]
    pub balance: Decimal,
    #[keel("token")]
    pub token: Uuid,
    #[keel("created_at")]
    pub created_at: Option<OffsetDateTime>,
    #[keel("profile")]
    pub profile: serde_json::Value,
    #[keel("attrs")]
    pub attrs: Hstore,
    #[keel(skip)]
    pub cache: Option<String>,
}

const INSERT: &str = "INSERT INTO keel_account (id, email, nickname, credits, balance, token, created_at, profile, attrs) \
    VALUES (${id}, ${email}, ${nickname}, ${credits}, ${balance}, ${token}, ${created_at}, ${profile}, ${attrs})";

fn accounts() -> Vec<Account> {
    vec![
        Account {
            id: 1,
            email: "ada@example.com".into(),
            nickname: Some("ada".into()),
            credits: 65535,
            balance: Decimal::from_str("1250.75").unwrap(),
            token: Uuid::new_v4(),
            created_at: Some(datetime!(2024-03-01 10:20:30 UTC)),
            profile: serde_json::json!({"lang": "en", "tags": ["admin"]}),
            attrs: Hstore::from([("plan".to_string(), Some("pro".to_string()))]),
            cache: None,
        },
        Account {
            id: 2,
            email: "linus@example.com".into(),
            nickname: None,
            credits: 0,
            balance: Decimal::ZERO,
            token: Uuid::new_v4(),
            created_at: Some(datetime!(1999-12-31 23:59:59 UTC)),
            profile: serde_json::json!({}),
            attrs: Hstore::from([("beta".to_string(), None)]),
            cache: None,
        },
        Account {
            id: 3,
            email: "grace@example.com".into(),
            nickname: Some("amazing grace".into()),
            credits: 42,
            balance: Decimal::from_str("-7.5").unwrap(),
            token: Uuid::new_v4(),
            created_at: Some(datetime!(2021-06-15 08:00:00 UTC)),
            profile: serde_json::json!({"lang": "en"}),
            attrs: Hstore::new(),
            cache: None,
        },
    ]
}

pub async fn simple<D: Driver>(group: &Group<D>) {
    group
        .db()
        .enable_hstore()
        .await
        .expect("Could not create the hstore extension");
    group
        .drop_table::<Account>()
        .await
        .expect("Failed to drop the Account table");
    group
        .create_table::<Account>()
        .await
        .expect("Failed to create the Account table");
    // Creating twice is fine
    group
        .create_table::<Account>()
        .await
        .expect("Failed to create the Account table again");

    let accounts = accounts();
    for account in &accounts {
        let result = group
            .execute(INSERT, account)
            .await
            .expect("Could not insert an account");
        assert_eq!(result.rows_affected, 1);
    }

    // Round trip by primary key
    for account in &accounts {
        let found: Account = group
            .fetch_one(
                "SELECT * FROM keel_account WHERE id = ${id}",
                &params!("id" => account.id),
            )
            .await
            .expect("Could not fetch the account");
        assert_eq!(&found, account);
    }

    // Unsigned range enforced by the column check
    let result = group
        .execute(
            "UPDATE keel_account SET credits = credits + 1 WHERE id = ${id}",
            &params!("id" => 1i64),
        )
        .await;
    assert!(result.is_err(), "65536 must be rejected for a u16 column");

    // Zero capacity value destination
    let mut values: Vec<Account> = Vec::new();
    let error = group
        .fetch_many("SELECT * FROM keel_account ORDER BY id", &(), &mut values)
        .await
        .expect_err("A zero capacity Vec<Account> must be rejected");
    assert_eq!(error.data_error(), Some(&DataError::EmptySlice));

    let mut values: Vec<Account> = Vec::with_capacity(1);
    group
        .fetch_many("SELECT * FROM keel_account ORDER BY id", &(), &mut values)
        .await
        .expect("Could not fetch the accounts");
    assert_eq!(values, accounts);

    let mut boxed: Vec<Box<Account>> = Vec::new();
    group
        .fetch_many(
            "SELECT * FROM keel_account WHERE credits > ${min} ORDER BY id DESC",
            &params!("min" => 0u16),
            &mut boxed,
        )
        .await
        .expect("Could not fetch the boxed accounts");
    assert_eq!(
        boxed.iter().map(|v| v.id).collect::<Vec<_>>(),
        [3, 1],
        "Rows must be appended in the order they are returned"
    );

    // Empty result
    let error = group
        .fetch_one::<Account, _>(
            "SELECT * FROM keel_account WHERE id = ${id}",
            &params!("id" => 999i64),
        )
        .await
        .expect_err("There is no account 999");
    assert!(error.is_no_rows());

    // Missing parameter
    let error = group
        .fetch_one::<Account, _>(
            "SELECT * FROM keel_account WHERE id = ${id} AND email = ${email}",
            &params!("id" => 1i64),
        )
        .await
        .expect_err("The email parameter is missing");
    assert_eq!(
        error.data_error(),
        Some(&DataError::MissingKey("email".into()))
    );

    // Quoted placeholders are left alone
    let (text,): (String,) = group
        .fetch_one(
            "SELECT '${id}'::text || ${suffix}::text",
            &params!("suffix" => "!"),
        )
        .await
        .expect("Could not fetch the literal");
    assert_eq!(text, "${id}!");

    // Scalars and positional arguments
    let count: i64 = group
        .fetch_one("SELECT COUNT(*) FROM keel_account", &())
        .await
        .expect("Could not count the accounts");
    assert_eq!(count, 3);
    let email: String = group
        .fetch_one(
            "SELECT email FROM keel_account WHERE id = $1",
            &vec![Value::from(2i64)],
        )
        .await
        .expect("Could not fetch with positional arguments");
    assert_eq!(email, "linus@example.com");
    let nickname: Option<String> = group
        .fetch_one(
            "SELECT nickname FROM keel_account WHERE id = ${id}",
            &params!("id" => 2i64),
        )
        .await
        .expect("Could not fetch a null column");
    assert_eq!(nickname, None);

    // Prepared statement, executed more than once
    let stmt = group
        .prepare("SELECT * FROM keel_account WHERE id = ${id}")
        .await
        .expect("Could not prepare the statement");
    assert_eq!(stmt.keys(), Some(&["id".to_string()][..]));
    for account in &accounts {
        let found: Account = stmt
            .fetch_one(&params!("id" => account.id))
            .await
            .expect("Could not run the prepared statement");
        assert_eq!(&found, account);
    }
    drop(stmt);

    // A record is a parameter source for its own columns
    let mut changed = accounts[2].clone();
    changed.nickname = None;
    changed.balance = Decimal::ONE_HUNDRED;
    group
        .execute(
            "UPDATE keel_account SET nickname = ${nickname}, balance = ${balance} WHERE id = ${id}",
            &changed,
        )
        .await
        .expect("Could not update the account");
    let found: Account = group
        .fetch_one(
            "SELECT * FROM keel_account WHERE id = ${id}",
            &params!("id" => 3i64),
        )
        .await
        .expect("Could not fetch the updated account");
    assert_eq!(found, changed);
}
