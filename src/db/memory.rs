// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store used offline and by the test suites.
//!
//! Uniqueness rules are enforced through `DashMap` index tables claimed with
//! the entry API, so two concurrent creates for the same key cannot both win.

use super::messages::{ACCOUNT_TAKEN, EMAIL_TAKEN, ROLE_NOT_HELD, ROLE_TAKEN};
use super::{
    CategoryFields, DateWindow, NewAccount, NewUser, Page, TransactionFields, TransactionScope,
};
use crate::error::AppError;
use crate::models::{Account, Category, Merchant, Role, Session, Transaction, User, UserRole};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Rows that belong to one user and are soft-deleted.
trait Owned: Clone {
    fn owner(&self) -> Uuid;
    fn deleted_at_mut(&mut self) -> &mut Option<DateTime<Utc>>;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_live_for(&self, user_id: Uuid) -> bool {
        self.owner() == user_id && self.deleted_at().is_none()
    }
}

macro_rules! impl_owned {
    ($($ty:ty),*) => {
        $(impl Owned for $ty {
            fn owner(&self) -> Uuid {
                self.user_id
            }
            fn deleted_at_mut(&mut self) -> &mut Option<DateTime<Utc>> {
                &mut self.deleted_at
            }
            fn deleted_at(&self) -> Option<DateTime<Utc>> {
                self.deleted_at
            }
        })*
    };
}

impl_owned!(Account, Category, Merchant, Transaction);

#[derive(Default)]
pub(super) struct MemoryStore {
    users: DashMap<Uuid, User>,
    /// Live email -> user id
    emails: DashMap<String, Uuid>,
    sessions: DashMap<(Uuid, String), Session>,
    roles: DashMap<(Uuid, Role), UserRole>,
    accounts: DashMap<Uuid, Account>,
    /// Live (user id, account name) -> account id
    account_names: DashMap<(Uuid, String), Uuid>,
    categories: DashMap<Uuid, Category>,
    merchants: DashMap<Uuid, Merchant>,
    transactions: DashMap<Uuid, Transaction>,
}

fn paginate<T>(rows: Vec<T>, page: Page) -> Vec<T> {
    let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit).unwrap_or(0);
    rows.into_iter().skip(offset).take(limit).collect()
}

fn get_owned<T: Owned>(table: &DashMap<Uuid, T>, user_id: Uuid, id: Uuid) -> Option<T> {
    table
        .get(&id)
        .filter(|row| row.is_live_for(user_id))
        .map(|row| row.value().clone())
}

fn list_owned<T: Owned>(table: &DashMap<Uuid, T>, user_id: Uuid) -> Vec<T> {
    table
        .iter()
        .filter(|row| row.is_live_for(user_id))
        .map(|row| row.value().clone())
        .collect()
}

fn delete_owned<T: Owned>(
    table: &DashMap<Uuid, T>,
    user_id: Uuid,
    id: Uuid,
) -> Option<DateTime<Utc>> {
    let mut row = table.get_mut(&id)?;
    if !row.is_live_for(user_id) {
        return None;
    }
    let now = Utc::now();
    *row.deleted_at_mut() = Some(now);
    Some(now)
}

impl MemoryStore {
    // ─── Users ─────────────────────────────────────────────────

    pub fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        match self.emails.entry(new.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(EMAIL_TAKEN.to_string())),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = User {
                    id: Uuid::new_v4(),
                    email: new.email,
                    password_hash: new.password_hash,
                    password_changed_at: now,
                    created_at: now,
                    deleted_at: None,
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    pub fn get_user(&self, user_id: Uuid) -> Option<User> {
        self.users
            .get(&user_id)
            .filter(|user| user.deleted_at.is_none())
            .map(|user| user.value().clone())
    }

    pub fn get_user_by_email(&self, email: &str) -> Option<User> {
        let user_id = *self.emails.get(email)?;
        self.get_user(user_id)
    }

    pub fn list_users(&self, page: Page) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|user| user.deleted_at.is_none())
            .map(|user| user.value().clone())
            .collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        paginate(users, page)
    }

    pub fn update_password(&self, user_id: Uuid, password_hash: &str) -> Option<User> {
        let mut user = self.users.get_mut(&user_id)?;
        if user.deleted_at.is_some() {
            return None;
        }
        user.password_hash = password_hash.to_string();
        user.password_changed_at = Utc::now();
        Some(user.clone())
    }

    pub fn delete_user(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        let email = {
            let mut user = self.users.get_mut(&user_id)?;
            if user.deleted_at.is_some() {
                return None;
            }
            user.deleted_at = Some(now);
            user.email.clone()
        };
        self.emails.remove_if(&email, |_, id| *id == user_id);
        Some(now)
    }

    // ─── Sessions ──────────────────────────────────────────────

    pub fn save_session(&self, session: Session) -> Session {
        self.sessions.insert(
            (session.user_id, session.device_id.clone()),
            session.clone(),
        );
        session
    }

    pub fn get_session(
        &self,
        user_id: Uuid,
        device_id: &str,
        refresh_token: &str,
        now: i64,
    ) -> Option<Session> {
        self.sessions
            .get(&(user_id, device_id.to_string()))
            .filter(|session| session.refresh_token == refresh_token && session.expires_at > now)
            .map(|session| session.value().clone())
    }

    // ─── Roles ─────────────────────────────────────────────────

    pub fn grant_role(&self, user_id: Uuid, role: &Role) -> Result<UserRole, AppError> {
        match self.roles.entry((user_id, role.clone())) {
            Entry::Occupied(_) => Err(AppError::Conflict(ROLE_TAKEN.to_string())),
            Entry::Vacant(slot) => {
                let granted = UserRole {
                    user_id,
                    role: role.clone(),
                    created_at: Utc::now(),
                };
                slot.insert(granted.clone());
                Ok(granted)
            }
        }
    }

    pub fn revoke_role(&self, user_id: Uuid, role: &Role) -> Result<(), AppError> {
        self.roles
            .remove(&(user_id, role.clone()))
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(ROLE_NOT_HELD.to_string()))
    }

    fn grants_for_user(&self, user_id: Uuid) -> Vec<UserRole> {
        let mut grants: Vec<UserRole> = self
            .roles
            .iter()
            .filter(|grant| grant.user_id == user_id)
            .map(|grant| grant.value().clone())
            .collect();
        grants.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.role.as_str().cmp(b.role.as_str()))
        });
        grants
    }

    pub fn roles_for_user(&self, user_id: Uuid) -> Vec<Role> {
        self.grants_for_user(user_id)
            .into_iter()
            .map(|grant| grant.role)
            .collect()
    }

    pub fn list_roles(&self, user_id: Uuid, page: Page) -> Vec<UserRole> {
        paginate(self.grants_for_user(user_id), page)
    }

    pub fn list_users_with_role(&self, role: &Role, page: Page) -> Vec<User> {
        let holders: Vec<Uuid> = self
            .roles
            .iter()
            .filter(|grant| grant.role == *role)
            .map(|grant| grant.user_id)
            .collect();
        let mut users: Vec<User> = holders
            .into_iter()
            .filter_map(|user_id| self.get_user(user_id))
            .collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        paginate(users, page)
    }

    // ─── Accounts ──────────────────────────────────────────────

    pub fn create_account(&self, new: NewAccount) -> Result<Account, AppError> {
        match self
            .account_names
            .entry((new.user_id, new.account_name.clone()))
        {
            Entry::Occupied(_) => Err(AppError::Conflict(ACCOUNT_TAKEN.to_string())),
            Entry::Vacant(slot) => {
                let account = Account {
                    account_id: Uuid::new_v4(),
                    user_id: new.user_id,
                    account_name: new.account_name,
                    account_type: new.account_type,
                    balance: new.balance,
                    currency: new.currency,
                    created_at: Utc::now(),
                    deleted_at: None,
                };
                self.accounts.insert(account.account_id, account.clone());
                slot.insert(account.account_id);
                Ok(account)
            }
        }
    }

    pub fn get_account(&self, user_id: Uuid, account_id: Uuid) -> Option<Account> {
        get_owned(&self.accounts, user_id, account_id)
    }

    pub fn update_balance(&self, user_id: Uuid, account_id: Uuid, balance: i64) -> Option<Account> {
        let mut account = self.accounts.get_mut(&account_id)?;
        if !account.is_live_for(user_id) {
            return None;
        }
        account.balance = balance;
        Some(account.clone())
    }

    pub fn list_accounts(&self, user_id: Uuid, page: Page) -> Vec<Account> {
        let mut accounts = list_owned(&self.accounts, user_id);
        accounts.sort_by_key(|account| (account.created_at, account.account_id));
        paginate(accounts, page)
    }

    pub fn delete_account(&self, user_id: Uuid, account_id: Uuid) -> Option<DateTime<Utc>> {
        let deleted_at = delete_owned(&self.accounts, user_id, account_id)?;
        let name = self.accounts.get(&account_id).map(|a| a.account_name.clone());
        if let Some(name) = name {
            self.account_names
                .remove_if(&(user_id, name), |_, id| *id == account_id);
        }
        Some(deleted_at)
    }

    // ─── Categories ────────────────────────────────────────────

    pub fn create_category(&self, user_id: Uuid, fields: CategoryFields) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            parent_id: fields.parent_id,
            user_id,
            name: fields.name,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.categories.insert(category.id, category.clone());
        category
    }

    pub fn get_category(&self, user_id: Uuid, category_id: Uuid) -> Option<Category> {
        get_owned(&self.categories, user_id, category_id)
    }

    pub fn update_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        fields: CategoryFields,
    ) -> Option<Category> {
        let mut category = self.categories.get_mut(&category_id)?;
        if !category.is_live_for(user_id) {
            return None;
        }
        category.parent_id = fields.parent_id;
        category.name = fields.name;
        Some(category.clone())
    }

    pub fn list_categories(&self, user_id: Uuid, page: Page) -> Vec<Category> {
        let mut categories = list_owned(&self.categories, user_id);
        categories.sort_by_key(|category| (category.created_at, category.id));
        paginate(categories, page)
    }

    pub fn delete_category(&self, user_id: Uuid, category_id: Uuid) -> Option<DateTime<Utc>> {
        delete_owned(&self.categories, user_id, category_id)
    }

    // ─── Merchants ─────────────────────────────────────────────

    pub fn create_merchant(&self, user_id: Uuid, name: &str) -> Merchant {
        let merchant = Merchant {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.merchants.insert(merchant.id, merchant.clone());
        merchant
    }

    pub fn get_merchant(&self, user_id: Uuid, merchant_id: Uuid) -> Option<Merchant> {
        get_owned(&self.merchants, user_id, merchant_id)
    }

    pub fn update_merchant(&self, user_id: Uuid, merchant_id: Uuid, name: &str) -> Option<Merchant> {
        let mut merchant = self.merchants.get_mut(&merchant_id)?;
        if !merchant.is_live_for(user_id) {
            return None;
        }
        merchant.name = name.to_string();
        Some(merchant.clone())
    }

    pub fn list_merchants(&self, user_id: Uuid, page: Page) -> Vec<Merchant> {
        let mut merchants = list_owned(&self.merchants, user_id);
        merchants.sort_by_key(|merchant| (merchant.created_at, merchant.id));
        paginate(merchants, page)
    }

    pub fn delete_merchant(&self, user_id: Uuid, merchant_id: Uuid) -> Option<DateTime<Utc>> {
        delete_owned(&self.merchants, user_id, merchant_id)
    }

    // ─── Transactions ──────────────────────────────────────────

    pub fn create_transaction(&self, user_id: Uuid, fields: TransactionFields) -> Transaction {
        let transaction = Transaction {
            id: Uuid::new_v4(),
            user_id,
            account_id: fields.account_id,
            category_id: fields.category_id,
            merchant_id: fields.merchant_id,
            name: fields.name,
            transaction_type: fields.transaction_type,
            amount: fields.amount,
            notes: fields.notes,
            date: fields.date,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.transactions.insert(transaction.id, transaction.clone());
        transaction
    }

    pub fn get_transaction(&self, user_id: Uuid, transaction_id: Uuid) -> Option<Transaction> {
        get_owned(&self.transactions, user_id, transaction_id)
    }

    pub fn update_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        fields: TransactionFields,
    ) -> Option<Transaction> {
        let mut transaction = self.transactions.get_mut(&transaction_id)?;
        if !transaction.is_live_for(user_id) {
            return None;
        }
        transaction.account_id = fields.account_id;
        transaction.category_id = fields.category_id;
        transaction.merchant_id = fields.merchant_id;
        transaction.name = fields.name;
        transaction.transaction_type = fields.transaction_type;
        transaction.amount = fields.amount;
        transaction.notes = fields.notes;
        transaction.date = fields.date;
        Some(transaction.clone())
    }

    pub fn list_transactions(
        &self,
        user_id: Uuid,
        scope: TransactionScope,
        window: DateWindow,
        page: Page,
    ) -> Vec<Transaction> {
        let mut transactions: Vec<Transaction> = list_owned(&self.transactions, user_id)
            .into_iter()
            .filter(|tx| match scope {
                TransactionScope::All => true,
                TransactionScope::Account(account_id) => tx.account_id == account_id,
                TransactionScope::Category(category_id) => tx.category_id == category_id,
            })
            .filter(|tx| window.contains(tx.date))
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        paginate(transactions, page)
    }

    pub fn delete_transaction(&self, user_id: Uuid, transaction_id: Uuid) -> Option<DateTime<Utc>> {
        delete_owned(&self.transactions, user_id, transaction_id)
    }
}
