//! Financial account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "account_type", rename_all = "lowercase")]
pub enum AccountType {
    Cash,
    Credit,
}

/// Currencies the ledger accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "currency_code", rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Kes,
    Ugx,
    Tzs,
}

/// An account owned by a user. Balance is kept in minor units.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub account_name: String,
    pub account_type: AccountType,
    pub balance: i64,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_codes_are_uppercase() {
        assert_eq!(serde_json::to_string(&Currency::Kes).unwrap(), "\"KES\"");
        let parsed: Currency = serde_json::from_str("\"UGX\"").unwrap();
        assert_eq!(parsed, Currency::Ugx);
        assert!(serde_json::from_str::<Currency>("\"GBP\"").is_err());
    }

    #[test]
    fn test_account_type_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&AccountType::Credit).unwrap(),
            "\"credit\""
        );
    }
}
