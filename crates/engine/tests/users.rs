use sea_orm::Database;

use engine::{AccountStatus, Engine, EngineError, KycStatus, NewUser, Role, Session};
use migration::MigratorTrait;

async fn engine_with_users() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .password_cost(4)
        .build()
        .await
        .unwrap();
    for (username, role) in [("admin", Role::Admin), ("alice", Role::User)] {
        engine
            .create_user(NewUser {
                username: username.to_string(),
                password: format!("{username}-pw"),
                email: Some(format!(" {username}@example.com ")),
                role,
                ..NewUser::default()
            })
            .await
            .unwrap();
    }
    engine
}

#[tokio::test]
async fn authenticate_checks_password() {
    let engine = engine_with_users().await;

    let session = engine.authenticate("alice", "alice-pw").await.unwrap();
    assert_eq!(session, Session::new("alice", Role::User));
    let session = engine.authenticate("admin", "admin-pw").await.unwrap();
    assert!(session.is_admin());

    for (username, password) in [("alice", "wrong"), ("nobody", "alice-pw"), ("alice", "")] {
        let err = engine.authenticate(username, password).await.unwrap_err();
        assert_eq!(
            err,
            EngineError::Unauthorized("invalid credentials".to_string())
        );
    }
}

#[tokio::test]
async fn suspended_users_cannot_log_in() {
    let engine = engine_with_users().await;
    let admin = Session::new("admin", Role::Admin);

    let user = engine
        .set_user_status(&admin, "alice", AccountStatus::Suspended)
        .await
        .unwrap();
    assert_eq!(user.status, AccountStatus::Suspended);

    let err = engine.authenticate("alice", "alice-pw").await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    engine
        .set_user_status(&admin, "alice", AccountStatus::Active)
        .await
        .unwrap();
    assert!(engine.authenticate("alice", "alice-pw").await.is_ok());
}

#[tokio::test]
async fn create_user_validates_and_rejects_duplicates() {
    let engine = engine_with_users().await;

    let err = engine
        .create_user(NewUser {
            username: "alice".to_string(),
            password: "x".to_string(),
            ..NewUser::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("alice".to_string()));

    let err = engine
        .create_user(NewUser {
            username: "   ".to_string(),
            password: "x".to_string(),
            ..NewUser::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_user(NewUser {
            username: "carol".to_string(),
            ..NewUser::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let alice = engine
        .user(&Session::new("alice", Role::User), "alice")
        .await
        .unwrap();
    assert_eq!(alice.email.as_deref(), Some("alice@example.com"));
    assert_eq!(alice.kyc_status, KycStatus::NotStarted);
}

#[tokio::test]
async fn profiles_are_private() {
    let engine = engine_with_users().await;
    let alice = Session::new("alice", Role::User);

    let err = engine.user(&alice, "admin").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert!(engine.list_users(&alice).await.is_err());

    let admin = Session::new("admin", Role::Admin);
    let users = engine.list_users(&admin).await.unwrap();
    let names: Vec<_> = users.iter().map(|u| u.user.username.as_str()).collect();
    assert_eq!(names, vec!["admin", "alice"]);
    assert!(users.iter().all(|u| u.balances.is_empty()));
}

#[tokio::test]
async fn kyc_flow() {
    let engine = engine_with_users().await;
    let alice = Session::new("alice", Role::User);
    let admin = Session::new("admin", Role::Admin);

    let err = engine.review_kyc(&admin, "alice", true).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidStateTransition(_)));

    let user = engine.submit_kyc(&alice).await.unwrap();
    assert_eq!(user.kyc_status, KycStatus::Pending);
    let err = engine.submit_kyc(&alice).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidStateTransition(_)));

    let err = engine.review_kyc(&alice, "alice", true).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let user = engine.review_kyc(&admin, "alice", false).await.unwrap();
    assert_eq!(user.kyc_status, KycStatus::Rejected);

    engine.submit_kyc(&alice).await.unwrap();
    let user = engine.review_kyc(&admin, "alice", true).await.unwrap();
    assert_eq!(user.kyc_status, KycStatus::Approved);
    assert_eq!(
        engine.user(&alice, "alice").await.unwrap().kyc_status,
        KycStatus::Approved
    );
}

#[tokio::test]
async fn roles_change_but_not_your_own() {
    let engine = engine_with_users().await;
    let admin = Session::new("admin", Role::Admin);

    let promoted = engine
        .set_user_role(&admin, "alice", Role::Admin)
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::Admin);
    let session = engine.authenticate("alice", "alice-pw").await.unwrap();
    assert!(session.is_admin());

    let err = engine
        .set_user_role(&admin, "admin", Role::User)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .set_user_role(&admin, "ghost", Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
