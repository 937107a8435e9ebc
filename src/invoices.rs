use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::billing::{self, Item, Money, PricingError};
use crate::error::StoreError;

const YAML_EXT: &str = "yml";
const PDF_EXT: &str = "pdf";

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Invoice {
    pub invoice_number: String,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub customer: String,
    pub items: Vec<Item>,
    pub total: Money,
    pub created_at: DateTime<Local>,
}

impl Invoice {
    pub fn new(
        invoice_number: String,
        customer: &str,
        items: Vec<Item>,
        created_at: DateTime<Local>,
        due_days: i64,
    ) -> Result<Self, PricingError> {
        let date = created_at.date_naive();
        let due_date = Duration::try_days(due_days)
            .and_then(|days| date.checked_add_signed(days))
            .unwrap_or_else(|| {
                warn!("due_days {} is out of range, due on issue date", due_days);
                date
            });
        let total =
            billing::total(&items).ok_or_else(|| PricingError::Overflow {
                token: invoice_number.clone(),
            })?;

        Ok(Self {
            invoice_number,
            date,
            due_date,
            customer: customer.to_string(),
            items,
            total,
            created_at,
        })
    }

    /// Writes `<dir>/<number>.yml`, replacing any file already there.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = yaml_path(dir, &self.invoice_number);
        let yaml =
            serde_yaml::to_string(self).map_err(|source| StoreError::Encode {
                number: self.invoice_number.clone(),
                source,
            })?;
        debug!("Writing {}", path.display());
        fs::write(&path, yaml).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl fmt::Display for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Invoice: {}\n\
             Date: {}\n\
             Due: {}\n\n",
            self.invoice_number, self.date, self.due_date,
        )?;

        for item in self.items.iter() {
            writeln!(f, "{}", item)?;
        }

        write!(f, "\nTotal: {}", self.total)
    }
}

pub fn yaml_path(dir: &Path, number: &str) -> PathBuf {
    dir.join(format!("{}.{}", number, YAML_EXT))
}

pub fn pdf_path(dir: &Path, number: &str) -> PathBuf {
    dir.join(format!("{}.{}", number, PDF_EXT))
}

/// Next free number for `prefix` in `year`: one past the larger of
/// `starting` and the highest sequence already on disk.
pub fn next_number(
    dir: &Path,
    prefix: &str,
    year: i32,
    starting: u32,
) -> io::Result<String> {
    let highest = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map_or(false, |t| t.is_file()))
            .filter_map(|entry| {
                sequence_of(&entry.file_name().to_string_lossy(), prefix, year)
            })
            .fold(starting, u32::max),
        Err(e) if e.kind() == io::ErrorKind::NotFound => starting,
        Err(e) => return Err(e),
    };
    Ok(format_number(prefix, year, highest.saturating_add(1)))
}

pub fn format_number(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{}-{}-{:04}", prefix, year, sequence)
}

/// Sequence of a file named `PREFIX-YEAR-NNNN.yml`, at least four digits.
fn sequence_of(file_name: &str, prefix: &str, year: i32) -> Option<u32> {
    let digits = file_name
        .strip_suffix(".yml")?
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_prefix(year.to_string().as_str())?
        .strip_prefix('-')?;
    if digits.len() < 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Every readable invoice in `dir`; files that fail to parse are skipped.
pub fn load_all(dir: &Path) -> Result<Vec<Invoice>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut invoices = Vec::new();
    for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
        if !path.is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(YAML_EXT)
        {
            continue;
        }
        match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_yaml::from_str(&s).map_err(|e| e.to_string()))
        {
            Ok(invoice) => invoices.push(invoice),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(invoices)
}

fn is_plain_name(number: &str) -> bool {
    !number.is_empty()
        && !number.contains(['/', '\\'])
        && number != "."
        && number != ".."
}

pub fn exists(dir: &Path, number: &str) -> bool {
    is_plain_name(number) && yaml_path(dir, number).is_file()
}

/// Removes an invoice and its PDF. Returns whether a PDF was removed.
pub fn delete(dir: &Path, number: &str) -> Result<bool, StoreError> {
    if !exists(dir, number) {
        return Err(StoreError::InvoiceNotFound {
            number: number.to_string(),
        });
    }

    let yaml = yaml_path(dir, number);
    fs::remove_file(&yaml)
        .map_err(|source| StoreError::Write { path: yaml, source })?;

    let pdf = pdf_path(dir, number);
    match fs::remove_file(&pdf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Write { path: pdf, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    fn item(product: &str, quantity: u32, unit: Money) -> Item {
        Item {
            product: product.to_string(),
            quantity,
            unit_price: unit,
            total: unit.checked_mul(quantity).unwrap(),
            discount: 0,
        }
    }

    fn sample(number: &str) -> Invoice {
        let created = Local.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap();
        Invoice::new(
            number.to_string(),
            "globex",
            vec![
                item("widget", 10, Money::new(dec!(19.99))),
                item("consult", 2, Money::new(dec!(100))),
            ],
            created,
            14,
        )
        .unwrap()
    }

    #[test]
    fn first_number_follows_starting_number() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            next_number(tmp.path(), "INV", 2025, 5).unwrap(),
            "INV-2025-0006"
        );
    }

    #[test]
    fn missing_directory_uses_starting_number() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("invoices");
        assert_eq!(
            next_number(&missing, "INV", 2025, 0).unwrap(),
            "INV-2025-0001"
        );
    }

    #[test]
    fn highest_existing_wins() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "INV-2025-0003.yml");
        touch(tmp.path(), "INV-2025-0010.yml");
        touch(tmp.path(), "INV-2025-0010.pdf");
        assert_eq!(
            next_number(tmp.path(), "INV", 2025, 5).unwrap(),
            "INV-2025-0011"
        );
        assert_eq!(
            next_number(tmp.path(), "INV", 2025, 50).unwrap(),
            "INV-2025-0051"
        );
    }

    #[test]
    fn numbering_is_per_year_and_prefix() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "INV-2024-0042.yml");
        touch(tmp.path(), "EST-2025-0042.yml");
        touch(tmp.path(), "INV-2025-12.yml");
        touch(tmp.path(), "INV-2025-00a1.yml");
        assert_eq!(
            next_number(tmp.path(), "INV", 2025, 0).unwrap(),
            "INV-2025-0001"
        );
    }

    #[test]
    fn sequence_overflows_four_digits() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "INV-2025-9999.yml");
        assert_eq!(
            next_number(tmp.path(), "INV", 2025, 0).unwrap(),
            "INV-2025-10000"
        );
        touch(tmp.path(), "INV-2025-10000.yml");
        assert_eq!(
            next_number(tmp.path(), "INV", 2025, 0).unwrap(),
            "INV-2025-10001"
        );
    }

    #[test]
    fn new_invoice_totals_and_dates() {
        let invoice = sample("INV-2025-0001");
        assert_eq!(invoice.date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(
            invoice.due_date,
            NaiveDate::from_ymd_opt(2025, 3, 24).unwrap()
        );
        assert_eq!(invoice.total, Money::new(dec!(399.90)));
    }

    #[test]
    fn out_of_range_due_days_fall_back_to_issue_date() {
        let created = Local.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap();
        for due_days in [200_000_000_000_000, i64::MAX, i64::MIN, 100_000_000] {
            let number = "INV-2025-0001".to_string();
            let invoice =
                Invoice::new(number, "globex", vec![], created, due_days).unwrap();
            assert_eq!(invoice.due_date, invoice.date, "{}", due_days);
        }
    }

    #[test]
    fn total_overflow_is_an_error() {
        let huge = Money::new(Decimal::MAX);
        let err = Invoice::new(
            "INV-2025-0001".to_string(),
            "globex",
            vec![item("widget", 1, huge), item("widget", 1, huge)],
            Local.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap(),
            14,
        )
        .unwrap_err();
        assert!(err.to_string().contains("INV-2025-0001"));
    }

    #[test]
    fn save_and_load() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("invoices");
        let invoice = sample("INV-2025-0001");
        let path = invoice.save(&dir).unwrap();
        assert_eq!(path, dir.join("INV-2025-0001.yml"));

        let yaml = fs::read_to_string(&path).unwrap();
        assert!(yaml.contains("invoice_number:"));
        assert!(yaml.contains("2025-03-24"));
        assert!(yaml.contains("unit_price: 19.99"));

        let loaded = load_all(&dir).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].invoice_number, invoice.invoice_number);
        assert_eq!(loaded[0].date, invoice.date);
        assert_eq!(loaded[0].customer, invoice.customer);
        assert_eq!(loaded[0].total, invoice.total);
    }

    #[test]
    fn load_skips_unreadable_files() {
        let tmp = TempDir::new().unwrap();
        sample("INV-2025-0001").save(tmp.path()).unwrap();
        fs::write(tmp.path().join("INV-2025-0002.yml"), "not: [an invoice")
            .unwrap();
        touch(tmp.path(), "INV-2025-0001.pdf");
        assert_eq!(load_all(tmp.path()).unwrap().len(), 1);
        assert!(load_all(&tmp.path().join("none")).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_yaml_and_pdf() {
        let tmp = TempDir::new().unwrap();
        sample("INV-2025-0001").save(tmp.path()).unwrap();
        sample("INV-2025-0002").save(tmp.path()).unwrap();
        touch(tmp.path(), "INV-2025-0001.pdf");
        touch(tmp.path(), "INV-2025-0002.pdf");

        assert!(delete(tmp.path(), "INV-2025-0001").unwrap());
        assert!(!tmp.path().join("INV-2025-0001.yml").exists());
        assert!(!tmp.path().join("INV-2025-0001.pdf").exists());
        assert!(tmp.path().join("INV-2025-0002.yml").exists());
        assert!(tmp.path().join("INV-2025-0002.pdf").exists());
    }

    #[test]
    fn delete_without_pdf() {
        let tmp = TempDir::new().unwrap();
        sample("INV-2025-0001").save(tmp.path()).unwrap();
        assert!(!delete(tmp.path(), "INV-2025-0001").unwrap());
    }

    #[test]
    fn delete_missing_invoice() {
        let tmp = TempDir::new().unwrap();
        sample("INV-2025-0001").save(tmp.path()).unwrap();
        for number in ["INV-2025-0009", "../INV-2025-0001", ""] {
            assert!(matches!(
                delete(tmp.path(), number),
                Err(StoreError::InvoiceNotFound { .. })
            ));
        }
        assert!(tmp.path().join("INV-2025-0001.yml").exists());
    }
}
