// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests against a real Postgres database.
//!
//! These tests require `DATABASE_URL` to point at a scratch database.
//! Run with: DATABASE_URL=postgres://localhost/ledger_test cargo test --test postgres_integration

use chrono::{TimeZone, Utc};
use ledger_api::db::{
    CategoryFields, DateWindow, NewAccount, NewUser, Page, TransactionFields, TransactionScope,
};
use ledger_api::error::AppError;
use ledger_api::models::{AccountType, Currency, Role, Session, TransactionType};
use uuid::Uuid;

mod common;

/// Skip test with message if no database is configured.
macro_rules! require_database {
    () => {
        if !common::database_available() {
            eprintln!("⚠️  Skipping: DATABASE_URL not set");
            return;
        }
    };
}

const PAGE: Page = Page {
    limit: 10,
    offset: 0,
};

/// Unique email for test isolation.
fn unique_email() -> String {
    format!("pg-{}@example.com", Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_user_lifecycle() {
    require_database!();
    let db = common::test_db().await;
    let email = unique_email();

    let user = db
        .create_user(NewUser {
            email: email.clone(),
            password_hash: "pbkdf2-sha256$1$c2FsdA$aGFzaA".to_string(),
        })
        .await
        .unwrap();

    let dup = db
        .create_user(NewUser {
            email: email.clone(),
            password_hash: "x".to_string(),
        })
        .await;
    assert!(matches!(dup, Err(AppError::Conflict(msg)) if msg == "user with email exists"));

    let found = db.get_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(found.id, user.id);

    let updated = db.update_password(user.id, "new-hash").await.unwrap().unwrap();
    assert_eq!(updated.password_hash, "new-hash");

    assert!(db.delete_user(user.id).await.unwrap().is_some());
    assert!(db.get_user(user.id).await.unwrap().is_none());
    assert!(db.delete_user(user.id).await.unwrap().is_none());

    // A deleted user's email is free again
    db.create_user(NewUser {
        email,
        password_hash: "x".to_string(),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_sessions_and_roles() {
    require_database!();
    let db = common::test_db().await;
    let user = db
        .create_user(NewUser {
            email: unique_email(),
            password_hash: "x".to_string(),
        })
        .await
        .unwrap();
    let now = Utc::now().timestamp();

    for token in ["first", "second"] {
        db.save_session(Session {
            user_id: user.id,
            device_id: "phone".to_string(),
            refresh_token: token.to_string(),
            expires_at: now + 60,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    }
    assert!(db
        .get_session(user.id, "phone", "first", now)
        .await
        .unwrap()
        .is_none());
    assert!(db
        .get_session(user.id, "phone", "second", now)
        .await
        .unwrap()
        .is_some());
    assert!(db
        .get_session(user.id, "phone", "second", now + 61)
        .await
        .unwrap()
        .is_none());

    let auditor = Role::parse("auditor").unwrap();
    db.grant_role(user.id, &auditor).await.unwrap();
    assert!(matches!(
        db.grant_role(user.id, &auditor).await,
        Err(AppError::Conflict(_))
    ));
    assert_eq!(db.roles_for_user(user.id).await.unwrap(), vec![auditor.clone()]);
    let holders = db.list_users_with_role(&auditor, PAGE).await.unwrap();
    assert!(holders.iter().any(|u| u.id == user.id));

    db.revoke_role(user.id, &auditor).await.unwrap();
    assert!(matches!(
        db.revoke_role(user.id, &auditor).await,
        Err(AppError::NotFound(_))
    ));
    assert!(db.roles_for_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ledger_rows() {
    require_database!();
    let db = common::test_db().await;
    let user = db
        .create_user(NewUser {
            email: unique_email(),
            password_hash: "x".to_string(),
        })
        .await
        .unwrap();

    let new_account = NewAccount {
        user_id: user.id,
        account_name: "Wallet".to_string(),
        account_type: AccountType::Cash,
        balance: 100,
        currency: Currency::Kes,
    };
    let account = db.create_account(new_account.clone()).await.unwrap();
    assert!(matches!(
        db.create_account(new_account).await,
        Err(AppError::Conflict(_))
    ));
    let account = db
        .update_balance(user.id, account.account_id, 250)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.balance, 250);
    assert_eq!(account.currency, Currency::Kes);

    let parent = db
        .create_category(
            user.id,
            CategoryFields {
                parent_id: None,
                name: "Bills".to_string(),
            },
        )
        .await
        .unwrap();
    let category = db
        .create_category(
            user.id,
            CategoryFields {
                parent_id: Some(parent.id),
                name: "Power".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(category.parent_id, Some(parent.id));

    let merchant = db.create_merchant(user.id, "Utility").await.unwrap();

    for month in [1, 2, 3] {
        db.create_transaction(
            user.id,
            TransactionFields {
                account_id: account.account_id,
                category_id: if month == 3 { parent.id } else { category.id },
                merchant_id: Some(merchant.id),
                name: format!("Bill {}", month),
                transaction_type: TransactionType::Expense,
                amount: 1000,
                notes: String::new(),
                date: Utc.with_ymd_and_hms(2024, month, 15, 0, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap();
    }

    let all = db
        .list_transactions(user.id, TransactionScope::All, DateWindow::default(), PAGE)
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[0].date > all[2].date);

    let by_category = db
        .list_transactions(
            user.id,
            TransactionScope::Category(category.id),
            DateWindow::default(),
            PAGE,
        )
        .await
        .unwrap();
    assert_eq!(by_category.len(), 2);

    let window = DateWindow {
        from: Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()),
        to: Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()),
    };
    let windowed = db
        .list_transactions(user.id, TransactionScope::All, window, PAGE)
        .await
        .unwrap();
    assert_eq!(windowed.len(), 1);

    let other = Uuid::new_v4();
    assert!(db
        .get_account(other, account.account_id)
        .await
        .unwrap()
        .is_none());
    assert!(db
        .delete_merchant(other, merchant.id)
        .await
        .unwrap()
        .is_none());

    assert!(db
        .delete_account(user.id, account.account_id)
        .await
        .unwrap()
        .is_some());
    assert!(db
        .get_account(user.id, account.account_id)
        .await
        .unwrap()
        .is_none());
}
