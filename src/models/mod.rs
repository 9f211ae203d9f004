// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod account;
pub mod category;
pub mod merchant;
pub mod role;
pub mod session;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountType, Currency};
pub use category::Category;
pub use merchant::Merchant;
pub use role::{Role, UserRole};
pub use session::Session;
pub use transaction::{Transaction, TransactionType};
pub use user::User;
