use rust_decimal_macros::dec;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Currency, CurrencyUpdate, Decision, DepositCmd, Engine, EngineError, FeeDirection,
    FeeSchedule, Money, NewUser, PaymentMethod, PaymentMethodUpdate, Role, Session,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .password_cost(4)
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn admin() -> Session {
    Session::new("admin", Role::Admin)
}

#[tokio::test]
async fn seeding_is_repeatable() {
    let (engine, _db) = engine_with_db().await;

    let first = engine.seed_defaults().await.unwrap();
    assert_eq!(first.currencies_added.len(), 10);
    assert_eq!(
        first.payment_methods_added,
        vec!["instapay", "vodafone", "paypal"]
    );

    let second = engine.seed_defaults().await.unwrap();
    assert!(second.currencies_added.is_empty());
    assert!(second.payment_methods_added.is_empty());

    let btc = engine.currency("btc").await.unwrap();
    assert_eq!(btc.decimals, 8);
    assert_eq!(btc.exchange_rate, dec!(0.000023));
}

#[tokio::test]
async fn converts_with_stored_rates() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_defaults().await.unwrap();

    let egp = engine
        .convert_amount(Money::new(10_000), "USD", "EGP")
        .await
        .unwrap();
    assert_eq!(egp, Money::new(308_500));

    let rate = engine.exchange_rate("USD", "EUR").await.unwrap();
    assert_eq!(rate, dec!(0.85));

    let err = engine
        .convert_amount(Money::new(1), "USD", "NOPE")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn admin_manages_currencies() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_defaults().await.unwrap();
    let admin = admin();

    let chf = Currency::new("chf", "Swiss Franc", "Fr", 2, dec!(0.88)).unwrap();
    let added = engine.add_currency(&admin, chf.clone()).await.unwrap();
    assert_eq!(added.code, "CHF");

    let err = engine.add_currency(&admin, chf).await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("CHF".to_string()));

    let updated = engine
        .update_currency(
            &admin,
            "CHF",
            CurrencyUpdate {
                name: Some("Franc".to_string()),
                description: Some("Swiss franc".to_string()),
                ..CurrencyUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Franc");
    assert_eq!(updated.symbol, "Fr");
    assert_eq!(updated.exchange_rate, dec!(0.88));

    let updated = engine
        .update_exchange_rate(&admin, "CHF", dec!(0.9))
        .await
        .unwrap();
    assert_eq!(updated.exchange_rate, dec!(0.9));

    let err = engine
        .update_exchange_rate(&admin, "CHF", dec!(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    engine.set_currency_enabled(&admin, "CHF", false).await.unwrap();
    let visible = engine.list_currencies(false).await.unwrap();
    assert!(visible.iter().all(|c| c.code != "CHF"));
    let all = engine.list_currencies(true).await.unwrap();
    assert!(all.iter().any(|c| c.code == "CHF" && !c.enabled));

    let user = Session::new("alice", Role::User);
    let err = engine
        .update_exchange_rate(&user, "USD", dec!(2))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn bulk_rate_update_is_all_or_nothing() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_defaults().await.unwrap();

    let err = engine
        .bulk_update_exchange_rates(
            &admin(),
            &[
                ("EUR".to_string(), dec!(0.9)),
                ("NOPE".to_string(), dec!(1.1)),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert_eq!(engine.currency("EUR").await.unwrap().exchange_rate, dec!(0.85));

    let updated = engine
        .bulk_update_exchange_rates(
            &admin(),
            &[
                ("EUR".to_string(), dec!(0.9)),
                ("gbp".to_string(), dec!(0.8)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(updated.len(), 2);
    assert_eq!(engine.currency("GBP").await.unwrap().exchange_rate, dec!(0.8));
}

#[tokio::test]
async fn currency_in_use_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_defaults().await.unwrap();
    engine
        .create_user(NewUser {
            username: "alice".to_string(),
            password: "secret".to_string(),
            ..NewUser::default()
        })
        .await
        .unwrap();
    let tx = engine
        .request_deposit(
            &Session::new("alice", Role::User),
            DepositCmd::new(Money::new(5_000), "EUR", "paypal"),
        )
        .await
        .unwrap();
    engine
        .decide_transaction(&admin(), tx.id, Decision::Reject)
        .await
        .unwrap();

    let err = engine.delete_currency(&admin(), "EUR").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    engine.delete_currency(&admin(), "BNB").await.unwrap();
    let err = engine.currency("BNB").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine.delete_currency(&admin(), "BNB").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn quotes_fees_from_payment_methods() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_defaults().await.unwrap();

    let quote = engine
        .quote_fee("paypal", "200", FeeDirection::Deposit)
        .await
        .unwrap();
    assert_eq!(quote.fee, Money::new(500));
    assert_eq!(quote.total, Money::new(20_500));

    let quote = engine
        .quote_fee("paypal", "200", FeeDirection::Withdrawal)
        .await
        .unwrap();
    assert_eq!(quote.total, Money::new(19_500));

    let quote = engine
        .quote_fee("paypal", "not a number", FeeDirection::Deposit)
        .await
        .unwrap();
    assert_eq!(quote.total, Money::ZERO);

    let err = engine
        .quote_fee("pigeon", "10", FeeDirection::Deposit)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn admin_manages_payment_methods() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_defaults().await.unwrap();
    let admin = admin();

    let method = PaymentMethod::new(
        "Bank-Wire",
        "Bank wire",
        FeeSchedule {
            percent: dec!(1.5),
            fixed: Money::new(200),
        },
        Money::new(10_000),
        Some("IBAN EG00 0000".to_string()),
    )
    .unwrap();
    let added = engine.add_payment_method(&admin, method.clone()).await.unwrap();
    assert_eq!(added.id, "bank-wire");

    let err = engine.add_payment_method(&admin, method).await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let updated = engine
        .update_payment_method(
            &admin,
            "bank-wire",
            PaymentMethodUpdate {
                fees: Some(FeeSchedule::percent(dec!(1.5))),
                ..PaymentMethodUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.fees.fixed, Money::ZERO);
    assert_eq!(updated.min_amount, Money::new(10_000));

    let quote = engine
        .quote_fee("bank-wire", "200", FeeDirection::Deposit)
        .await
        .unwrap();
    assert_eq!(quote.fee, Money::new(300));
    assert_eq!(quote.total, Money::new(20_300));

    engine
        .set_payment_method_enabled(&admin, "bank-wire", false)
        .await
        .unwrap();
    let listed = engine.list_payment_methods(false).await.unwrap();
    assert!(listed.iter().all(|m| m.id != "bank-wire"));
    assert_eq!(engine.list_payment_methods(true).await.unwrap().len(), 4);
}

#[tokio::test]
async fn fee_percent_is_capped_at_one_hundred() {
    let (engine, _db) = engine_with_db().await;
    engine.seed_defaults().await.unwrap();

    let err = PaymentMethod::new(
        "usury",
        "Usury",
        FeeSchedule::percent(dec!(100000000000000000000)),
        Money::ZERO,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .update_payment_method(
            &admin(),
            "paypal",
            PaymentMethodUpdate {
                fees: Some(FeeSchedule::percent(dec!(100.5))),
                ..PaymentMethodUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let paypal = engine.payment_method("paypal").await.unwrap();
    assert_eq!(paypal.fees.percent, dec!(2.5));

    engine
        .update_payment_method(
            &admin(),
            "paypal",
            PaymentMethodUpdate {
                fees: Some(FeeSchedule::percent(dec!(100))),
                ..PaymentMethodUpdate::default()
            },
        )
        .await
        .unwrap();
    let quote = engine
        .quote_fee("paypal", "100000000000", FeeDirection::Deposit)
        .await
        .unwrap();
    assert_eq!(quote.fee, quote.amount);
    assert_eq!(quote.total, Money::new(quote.amount.minor() * 2));
}
