//! # Sales Ledger
//!
//! Sales recorded after successful checkouts and the monthly closing
//! ("recaudation") records the admin creates from them.

use crate::money::Amount;
use crate::order::OrderDraft;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One sold line, as stored by `POST /boughtProduct`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Amount,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub sold_at: DateTime<Utc>,
}

impl Sale {
    pub fn total(&self) -> Amount {
        self.unit_price * Amount::from(self.quantity)
    }

    /// One sale per line of a paid order
    pub fn from_order(draft: &OrderDraft, sold_at: DateTime<Utc>) -> Vec<Sale> {
        draft
            .items()
            .iter()
            .map(|item| Sale {
                id: None,
                title: match &item.variant_label {
                    Some(variant) => format!("{} ({})", item.title, variant),
                    None => item.title.clone(),
                },
                unit_price: item.unit_price,
                quantity: item.quantity,
                order_id: Some(draft.id().to_string()),
                sold_at,
            })
            .collect()
    }
}

/// Calendar month a closing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: DateTime<Utc>) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        Month::of(date) == *self
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

/// Monthly revenue closing, as stored by `POST /recaudation/recaudation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recaudation {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub month: Month,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Amount,
    pub sales_count: u32,
    pub closed_at: DateTime<Utc>,
}

impl Recaudation {
    /// Sum every sale that happened in `month`
    pub fn close_month(sales: &[Sale], month: Month, closed_at: DateTime<Utc>) -> Self {
        let in_month: Vec<&Sale> = sales.iter().filter(|s| month.contains(s.sold_at)).collect();
        Self {
            id: None,
            month,
            amount: in_month.iter().map(|s| s.total()).sum::<Decimal>(),
            sales_count: in_month.len() as u32,
            closed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sale(title: &str, price: i64, qty: u32, date: DateTime<Utc>) -> Sale {
        Sale {
            id: None,
            title: title.into(),
            unit_price: Decimal::from(price),
            quantity: qty,
            order_id: None,
            sold_at: date,
        }
    }

    #[test]
    fn test_close_month_sums_only_that_month() {
        let march = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let end_of_march = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        let april = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let sales = vec![
            sale("Remera", 1000, 2, march),
            sale("Taza", 2500, 1, end_of_march),
            sale("Buzo", 9000, 1, april),
        ];

        let closing = Recaudation::close_month(&sales, Month::of(march), april);

        assert_eq!(closing.amount, Decimal::from(4500));
        assert_eq!(closing.sales_count, 2);
        assert_eq!(closing.month.first_day(), NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_sale_wire_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let json = serde_json::to_value(sale("Taza", 2500, 2, at)).unwrap();

        assert_eq!(json["unitPrice"], serde_json::json!(2500.0));
        assert_eq!(json["quantity"], 2);
        assert!(json.get("id").is_none());
    }
}
