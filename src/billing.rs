use std::fmt;
use std::str::FromStr;

use num_format::{Locale, ToFormattedString};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Products;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(
    Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy,
    Default,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Exact `amount * (100 - percentage) / 100`, no rounding.
    fn discounted(self, percentage: u8) -> Option<Self> {
        if percentage == 0 {
            return Some(self);
        }
        self.0
            .checked_mul(Decimal::from(100 - percentage))?
            .checked_div(HUNDRED)
            .map(Self)
    }

    /// Amount rounded to cents, with thousands separators and no currency
    /// symbol.
    pub fn plain(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let abs = rounded.abs();
        let whole = abs.trunc();
        // every Decimal fits in a u128, the fallback just skips grouping
        let whole = match whole.to_u128() {
            Some(w) => w.to_formatted_string(&Locale::en),
            None => whole.to_string(),
        };
        let cents = (abs.fract() * HUNDRED).to_u32().unwrap_or(0);
        format!("{}{}.{:02}", sign, whole, cents)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(&format!("${}", self.plain()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error(
        "Invalid format '{token}', expected product:quantity[:discount][:@price]"
    )]
    Format { token: String },

    #[error("Invalid quantity '{value}' in '{token}', expected a positive integer")]
    Quantity { token: String, value: String },

    #[error("Invalid discount '{value}' in '{token}', expected an integer from 0 to 100")]
    Discount { token: String, value: String },

    #[error("Invalid price '{value}' in '{token}', expected @ followed by a non-negative amount")]
    Price { token: String, value: String },

    #[error("Product '{key}' not found in products.yml")]
    UnknownProduct { key: String },

    #[error("Amount too large in '{token}'")]
    Overflow { token: String },
}

/// One `product:qty[:discount][:@price]` argument.
#[derive(Debug, PartialEq, Clone)]
pub struct ItemSpec {
    pub product: String,
    pub quantity: u32,
    pub discount: u8,
    pub price: Option<Money>,
}

impl FromStr for ItemSpec {
    type Err = PricingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let format = || PricingError::Format {
            token: token.to_string(),
        };
        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() < 2 || parts[0].is_empty() {
            return Err(format());
        }

        let (discount, price) = match parts[2..] {
            [] => (None, None),
            [price] if price.starts_with('@') => (None, Some(price)),
            [discount] => (Some(discount), None),
            [discount, price] if !discount.starts_with('@') => {
                (Some(discount), Some(price))
            }
            _ => return Err(format()),
        };

        Ok(Self {
            product: parts[0].to_string(),
            quantity: parse_quantity(token, parts[1])?,
            discount: discount
                .map(|d| parse_discount(token, d))
                .transpose()?
                .unwrap_or(0),
            price: price.map(|p| parse_price(token, p)).transpose()?,
        })
    }
}

fn parse_quantity(token: &str, value: &str) -> Result<u32, PricingError> {
    match value.parse::<u32>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(PricingError::Quantity {
            token: token.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_discount(token: &str, value: &str) -> Result<u8, PricingError> {
    match value.parse::<i64>() {
        Ok(discount) if (0..=100).contains(&discount) => Ok(discount as u8),
        _ => Err(PricingError::Discount {
            token: token.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_price(token: &str, value: &str) -> Result<Money, PricingError> {
    let err = || PricingError::Price {
        token: token.to_string(),
        value: value.to_string(),
    };
    let amount = value.strip_prefix('@').ok_or_else(err)?;
    match Decimal::from_str(amount) {
        Ok(price) if !price.is_sign_negative() => Ok(Money(price)),
        _ => Err(err()),
    }
}

impl ItemSpec {
    /// Prices the item, or `None` when an amount doesn't fit in a Decimal.
    pub fn item(&self, catalog_price: Money) -> Option<Item> {
        let base = match self.price {
            Some(price) if price.is_positive() => price,
            _ => catalog_price,
        };
        let unit_price = base.discounted(self.discount)?;
        Some(Item {
            product: self.product.clone(),
            quantity: self.quantity,
            unit_price,
            total: unit_price.checked_mul(self.quantity)?,
            discount: self.discount,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Item {
    pub product: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
    #[serde(default)]
    pub discount: u8,
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} x {} @ {}", self.quantity, self.product, self.unit_price)?;
        if self.discount > 0 {
            write!(f, " ({}% off)", self.discount)?;
        }
        write!(f, ": {}", self.total)
    }
}

/// Parses every token and prices it against the catalog; the first bad
/// token aborts the whole set. The returned items always have a total.
pub fn price_items<S: AsRef<str>>(
    tokens: &[S],
    products: &Products,
) -> Result<Vec<Item>, PricingError> {
    let mut items = Vec::with_capacity(tokens.len());
    let mut sum = Money::default();
    for token in tokens {
        let token = token.as_ref();
        let overflow = || PricingError::Overflow {
            token: token.to_string(),
        };
        let spec: ItemSpec = token.parse()?;
        let product = products.get(&spec.product).ok_or_else(|| {
            PricingError::UnknownProduct {
                key: spec.product.clone(),
            }
        })?;
        let item = spec.item(product.price).ok_or_else(overflow)?;
        sum = sum.checked_add(item.total).ok_or_else(overflow)?;
        items.push(item);
    }
    Ok(items)
}

pub fn total(items: &[Item]) -> Option<Money> {
    items
        .iter()
        .try_fold(Money::default(), |acc, item| acc.checked_add(item.total))
}
