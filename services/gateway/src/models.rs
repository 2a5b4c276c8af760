//! Request payloads
//!
//! Money fields arrive as strings and are parsed exactly; a float never
//! touches an amount.

use matching_engine::{DepositRequest, OrderRequest, UpdateRequest, WithdrawalRequest};
use rust_decimal::Decimal;
use serde::Deserialize;
use types::currency::{Currency, Pair};
use types::errors::ValidationError;
use types::numeric::parse_decimal;
use types::order::Side;

fn decimal(field: &str, raw: &str) -> Result<Decimal, ValidationError> {
    parse_decimal(raw).ok_or_else(|| ValidationError::Malformed(format!("{field} '{raw}' is not a decimal")))
}

fn optional_decimal(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, ValidationError> {
    raw.map(|raw| decimal(field, raw)).transpose()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderPayload {
    pub pair: Pair,
    #[serde(rename = "type")]
    pub side: Side,
    pub price: String,
    pub amount: Option<String>,
    pub total: Option<String>,
    #[serde(default)]
    pub need_approve: bool,
}

impl CreateOrderPayload {
    pub fn into_request(self) -> Result<OrderRequest, ValidationError> {
        Ok(OrderRequest {
            pair: self.pair,
            side: self.side,
            price: decimal("price", &self.price)?,
            amount: optional_decimal("amount", self.amount.as_deref())?,
            total: optional_decimal("total", self.total.as_deref())?,
            need_approve: self.need_approve,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderPayload {
    pub price: Option<String>,
    pub amount: Option<String>,
    pub total: Option<String>,
}

impl UpdateOrderPayload {
    pub fn into_request(self) -> Result<UpdateRequest, ValidationError> {
        Ok(UpdateRequest {
            price: optional_decimal("price", self.price.as_deref())?,
            amount: optional_decimal("amount", self.amount.as_deref())?,
            total: optional_decimal("total", self.total.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountPayload {
    pub currency: Currency,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositPayload {
    pub amount: String,
}

impl DepositPayload {
    pub fn into_request(self, currency: Currency) -> Result<DepositRequest, ValidationError> {
        Ok(DepositRequest {
            currency,
            amount: decimal("amount", &self.amount)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalPayload {
    pub amount: String,
    pub address: String,
}

impl WithdrawalPayload {
    pub fn into_request(self, currency: Currency) -> Result<WithdrawalRequest, ValidationError> {
        let address = self.address.trim().to_string();
        if address.is_empty() {
            return Err(ValidationError::Malformed("address is required".into()));
        }
        Ok(WithdrawalRequest {
            currency,
            amount: decimal("amount", &self.amount)?,
            address,
        })
    }
}

/// `GET /orders` filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersQuery {
    pub pair: Option<Pair>,
    #[serde(rename = "type")]
    pub side: Option<Side>,
}

/// `GET /offers/{pair}/{side}` depth
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OffersQuery {
    pub depth: Option<usize>,
}
