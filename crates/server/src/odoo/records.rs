//! Typed Odoo records.
//!
//! Odoo's JSON is loosely shaped: relations come back as `[id, "name"]` pairs
//! or `false`, and monetary fields as JSON floats. Each record the bridge reads
//! gets an explicit type here so a shape change fails decoding instead of
//! producing a wrong answer.

use std::str::FromStr;

use odoo_bridge_core::{OdooUserId, PartnerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de};

/// A many2one relation value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Many2one<Id> {
    /// Related record ID.
    pub id: Id,
    /// Related record display name, when Odoo sends one.
    pub display_name: Option<String>,
}

/// The wire shapes Odoo uses for a many2one value.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMany2one {
    /// `[id, "display name"]` from `search_read`.
    Pair(i64, String),
    /// `{"id": .., "display_name": ..}` from `web_read` style specifications.
    Object {
        id: i64,
        #[serde(default)]
        display_name: Option<String>,
    },
    /// Bare integer ID.
    Id(i64),
    /// `false` for an empty relation.
    Empty(bool),
}

/// Deserialize an optional many2one, mapping Odoo's `false` to `None`.
///
/// # Errors
///
/// Fails on `true` or any shape other than the ones Odoo produces.
pub fn many2one<'de, D, Id>(deserializer: D) -> Result<Option<Many2one<Id>>, D::Error>
where
    D: Deserializer<'de>,
    Id: From<i64>,
{
    match RawMany2one::deserialize(deserializer)? {
        RawMany2one::Pair(id, name) => Ok(Some(Many2one {
            id: Id::from(id),
            display_name: Some(name),
        })),
        RawMany2one::Object { id, display_name } => Ok(Some(Many2one {
            id: Id::from(id),
            display_name,
        })),
        RawMany2one::Id(id) => Ok(Some(Many2one {
            id: Id::from(id),
            display_name: None,
        })),
        RawMany2one::Empty(false) => Ok(None),
        RawMany2one::Empty(true) => Err(de::Error::custom(
            "expected a many2one value or false, found true",
        )),
    }
}

/// Deserialize a JSON number into an exact [`Decimal`].
///
/// Goes through the number's shortest textual form so `0.1` stays `0.1`.
///
/// # Errors
///
/// Fails if the value is not a number or is out of `Decimal` range.
pub fn exact_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| de::Error::custom(format!("invalid decimal {text}: {e}")))
}

/// A `res.users` row as read by identity resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    /// User ID.
    pub id: OdooUserId,
    /// Linked billing partner.
    #[serde(deserialize_with = "many2one")]
    pub partner_id: Option<Many2one<PartnerId>>,
}

impl UserRecord {
    /// Fields to request for this record.
    pub const FIELDS: &'static [&'static str] = &["id", "partner_id"];
}

/// An `account.move.line` row as read by balance aggregation.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerLine {
    /// Signed balance (debit minus credit).
    #[serde(deserialize_with = "exact_decimal")]
    pub balance: Decimal,
}

impl LedgerLine {
    /// Fields to request for this record.
    pub const FIELDS: &'static [&'static str] = &["balance"];
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_user_partner_pair_is_unwrapped() {
        let user: UserRecord =
            serde_json::from_value(json!({"id": 7, "partner_id": [900, "Ferreteria Garys"]}))
                .unwrap();
        assert_eq!(user.id, OdooUserId::new(7));
        let partner = user.partner_id.unwrap();
        assert_eq!(partner.id, PartnerId::new(900));
        assert_eq!(partner.display_name.as_deref(), Some("Ferreteria Garys"));
    }

    #[test]
    fn test_user_partner_other_shapes() {
        let user: UserRecord =
            serde_json::from_value(json!({"id": 7, "partner_id": false})).unwrap();
        assert!(user.partner_id.is_none());

        let user: UserRecord = serde_json::from_value(json!({
            "id": 7,
            "partner_id": {"id": 900, "display_name": "Garys"}
        }))
        .unwrap();
        assert_eq!(user.partner_id.unwrap().id, PartnerId::new(900));

        let user: UserRecord =
            serde_json::from_value(json!({"id": 7, "partner_id": 900})).unwrap();
        assert_eq!(user.partner_id.unwrap().id, PartnerId::new(900));
    }

    #[test]
    fn test_user_shape_mismatch_fails() {
        assert!(serde_json::from_value::<UserRecord>(json!({"id": 7})).is_err());
        assert!(
            serde_json::from_value::<UserRecord>(json!({"id": 7, "partner_id": true})).is_err()
        );
        assert!(
            serde_json::from_value::<UserRecord>(json!({"id": 7, "partner_id": "900"})).is_err()
        );
    }

    #[test]
    fn test_ledger_balance_is_exact() {
        let lines: Vec<LedgerLine> = serde_json::from_value(json!([
            {"id": 1, "balance": 0.1},
            {"id": 2, "balance": 0.2},
            {"id": 3, "balance": -150},
            {"id": 4, "balance": 1e-5}
        ]))
        .unwrap();

        let balances: Vec<Decimal> = lines.iter().map(|line| line.balance).collect();
        assert_eq!(balances[0], Decimal::from_str("0.1").unwrap());
        assert_eq!(balances[0] + balances[1], Decimal::from_str("0.3").unwrap());
        assert_eq!(balances[2], Decimal::from(-150));
        assert_eq!(balances[3], Decimal::from_str("0.00001").unwrap());
    }

    #[test]
    fn test_ledger_balance_rejects_non_numbers() {
        assert!(serde_json::from_value::<LedgerLine>(json!({"balance": "12.5"})).is_err());
        assert!(serde_json::from_value::<LedgerLine>(json!({"balance": false})).is_err());
        assert!(serde_json::from_value::<LedgerLine>(json!({})).is_err());
    }
}
