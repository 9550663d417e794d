//! Leaderboard rows from the upstream sales statistics endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

use crate::api::models::account::UserId;
use crate::types::StationId;

/// Sales made by one user (optionally at one station) in the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSalesStat {
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
    pub user_email: String,
    pub sales_count: u64,
    #[serde(deserialize_with = "non_negative_amount")]
    pub total_revenue: Decimal,
    #[serde(default, alias = "barStationId")]
    pub station_id: Option<StationId>,
    #[serde(default, alias = "barStationName")]
    pub station_name: Option<String>,
}

/// Sales made at one station in the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSalesStat {
    #[serde(alias = "barStationId")]
    pub station_id: StationId,
    #[serde(default, alias = "barStationName")]
    pub station_name: Option<String>,
    pub sales_count: u64,
    #[serde(deserialize_with = "non_negative_amount")]
    pub total_revenue: Decimal,
}

/// Revenue is never negative; a row claiming otherwise makes the whole payload malformed.
fn non_negative_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(D::Error::custom(format!("expected a non-negative amount, got {amount}")));
    }
    Ok(amount)
}
