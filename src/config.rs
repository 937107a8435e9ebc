use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use crate::billing::Money;

pub const DEFAULT_RENDERER: &str = "wkhtmltopdf";

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub company: Company,
    pub invoice: InvoiceSettings,
    pub auto_commit: bool,
    pub skip_update_check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
}

impl Config {
    /// Binary used to turn the rendered HTML into a PDF.
    pub fn renderer(&self) -> &str {
        self.renderer
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_RENDERER)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(default)]
pub struct Company {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(default)]
pub struct InvoiceSettings {
    pub prefix: String,
    #[serde(deserialize_with = "string_or_number")]
    pub starting_number: String,
    pub payment_terms: String,
    pub due_days: i64,
    pub notes: String,
}

impl InvoiceSettings {
    /// Sequence number the first invoice of a year follows. Anything that
    /// isn't a number counts as zero.
    pub fn starting_number(&self) -> u32 {
        let raw = self.starting_number.trim();
        if raw.is_empty() {
            return 0;
        }
        raw.parse().unwrap_or_else(|_| {
            warn!(
                "starting_number '{}' is not a number, numbering from 0",
                raw
            );
            0
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(default)]
pub struct Customer {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub id: String,
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub sku: String,
    pub price: Money,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:<40}  {}", self.name, self.price)
    }
}

pub type Customers = BTreeMap<String, Customer>;
pub type Products = BTreeMap<String, Product>;
