use std::io;

use chrono::{DateTime, Datelike, Local};
use log::{debug, warn};
use thiserror::Error;

use crate::billing::{self, PricingError};
use crate::cli::{Command, Listable};
use crate::error::StoreError;
use crate::input::Prompt;
use crate::invoices::{self, Invoice};
use crate::pdf::{RenderError, Renderer, TemplateData};
use crate::store::{Store, StoreFile};
use crate::templates;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("{source}")]
    Pricing {
        #[from]
        source: PricingError,
    },

    #[error("{source}")]
    Render {
        #[from]
        source: RenderError,
    },

    #[error("Input Error: {source}")]
    Input {
        #[from]
        source: inquire::error::InquireError,
    },

    #[error("Generating invoice number: {source}")]
    Numbering { source: io::Error },

    #[error("Opening preview: {source}")]
    Preview { source: io::Error },

    #[error("Formatting output: {source}")]
    Output {
        #[from]
        source: askama::Error,
    },
}

/// How an `invoice` command ended.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Saved(String),
    Cancelled,
}

pub fn run_cmd(
    cmd: Command,
    store: &Store,
    prompt: &mut impl Prompt,
) -> Result<(), RunError> {
    match cmd {
        Command::Init => init(store),
        Command::Invoice {
            customer,
            items,
            yes,
        } => invoice(store, prompt, &customer, &items, yes, Local::now())
            .map(|_| ()),
        Command::List { listing } => list(store, listing),
        Command::Delete { number, confirm } => {
            delete(store, prompt, &number, confirm)
        }
    }
}

fn init(store: &Store) -> Result<(), RunError> {
    store.init()?;
    println!("Created {}", store.dir().display());
    println!(
        "Edit your config files there, then run: \
         quickbill invoice <customer> <product:qty>"
    );
    commit(store, "quickbill: initialized");
    Ok(())
}

/// Drafts an invoice, previews it unless `skip_preview`, then saves the
/// YAML record followed by the PDF.
pub fn invoice(
    store: &Store,
    prompt: &mut impl Prompt,
    customer_key: &str,
    tokens: &[String],
    skip_preview: bool,
    now: DateTime<Local>,
) -> Result<Outcome, RunError> {
    let config = store.load()?;
    let customers = store.load_customers()?;
    let products = store.load_products()?;

    let customer = Store::customer(&customers, customer_key)?;
    let items = billing::price_items(tokens, &products)?;

    let invoices_dir = store.invoices_dir();
    let number = invoices::next_number(
        &invoices_dir,
        &config.invoice.prefix,
        now.year(),
        config.invoice.starting_number(),
    )
    .map_err(|source| RunError::Numbering { source })?;

    let invoice = Invoice::new(
        number,
        customer_key,
        items,
        now,
        config.invoice.due_days,
    )?;
    debug!("Drafted:\n{}", invoice);

    let data = TemplateData::new(&invoice, &config, &customer, &products);
    let renderer =
        Renderer::new(store.path(StoreFile::Template), config.renderer());

    if !skip_preview {
        let preview = renderer.render_preview(&data)?;
        prompt
            .preview(&preview)
            .map_err(|source| RunError::Preview { source })?;
        if !prompt.confirm("Save invoice? [y/n]:")? {
            println!("Invoice cancelled.");
            return Ok(Outcome::Cancelled);
        }
    }

    invoice.save(&invoices_dir)?;
    let pdf = invoices::pdf_path(&invoices_dir, &invoice.invoice_number);
    renderer.render_to(&data, &pdf)?;

    println!("Created {}", invoice.invoice_number);
    println!("{}", pdf.display());
    commit(
        store,
        &format!("quickbill: created invoice {}", invoice.invoice_number),
    );
    Ok(Outcome::Saved(invoice.invoice_number))
}

fn list(store: &Store, listing: Listable) -> Result<(), RunError> {
    match listing {
        Listable::Invoices => list_invoices(store),
        Listable::Customers => list_customers(store),
        Listable::Products => list_products(store),
        Listable::Config => list_config(store),
    }
}

fn list_invoices(store: &Store) -> Result<(), RunError> {
    let mut saved = invoices::load_all(&store.invoices_dir())?;
    if saved.is_empty() {
        println!("No invoices yet.");
        return Ok(());
    }
    let customers = store.load_customers()?;

    saved.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.invoice_number.cmp(&a.invoice_number))
    });

    for i in saved.iter() {
        let name = customers
            .get(&i.customer)
            .map_or(i.customer.as_str(), |c| c.name.as_str());
        println!(
            "{:<15}  {}  {:<30}  {:>12}",
            i.invoice_number, i.date, name, i.total
        );
    }
    Ok(())
}

fn list_customers(store: &Store) -> Result<(), RunError> {
    let customers = store.load_customers()?;
    if customers.is_empty() {
        println!("No customers defined.");
    }
    for (key, customer) in customers.iter() {
        println!("{:<15}  {}", key, customer);
    }
    Ok(())
}

fn list_products(store: &Store) -> Result<(), RunError> {
    let products = store.load_products()?;
    if products.is_empty() {
        println!("No products defined.");
    }
    for (key, product) in products.iter() {
        println!("{:<15}  {}", key, product);
    }
    Ok(())
}

fn list_config(store: &Store) -> Result<(), RunError> {
    let config = store.load()?;
    println!("{}", templates::config_summary(&config)?);
    Ok(())
}

/// Removes an invoice and its PDF. A missing invoice fails before asking.
pub fn delete(
    store: &Store,
    prompt: &mut impl Prompt,
    number: &str,
    confirmed: bool,
) -> Result<(), RunError> {
    let dir = store.invoices_dir();
    if !invoices::exists(&dir, number) {
        return Err(StoreError::InvoiceNotFound {
            number: number.to_string(),
        }
        .into());
    }

    if !confirmed
        && !prompt.confirm(&format!("Delete invoice {}? [y/N]", number))?
    {
        println!("Cancelled.");
        return Ok(());
    }

    if invoices::delete(&dir, number)? {
        debug!("Removed PDF for {}", number);
    }
    println!("Deleted {}", number);
    commit(store, &format!("quickbill: deleted invoice {}", number));
    Ok(())
}

// The change is already on disk, a failed commit only gets reported.
fn commit(store: &Store, message: &str) {
    match store.auto_commit(message) {
        Ok(result) => debug!("Auto-commit: {:?}", result),
        Err(e) => warn!("Auto-commit failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::Money;
    use crate::input::tests::Scripted;
    use crate::store::tests::sample_store;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::fs;
    use std::path::Path;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn june() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
    }

    fn yaml_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".yml"))
            .collect();
        names.sort();
        names
    }

    #[cfg(unix)]
    fn use_fake_renderer(store: &Store, dir: &Path) {
        let script = crate::pdf::tests::fake_renderer(dir);
        let mut config = fs::read_to_string(store.path(StoreFile::Config))
            .unwrap();
        config.push_str(&format!("renderer: \"{}\"\n", script.display()));
        fs::write(store.path(StoreFile::Config), config).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn confirmed_preview_saves_yaml_and_pdf() {
        let (tmp, store) = sample_store();
        use_fake_renderer(&store, tmp.path());
        let mut prompt = Scripted::answering(true);

        let outcome = invoice(
            &store,
            &mut prompt,
            "globex",
            &tokens(&["widget:10", "consult:2:0:@15.00"]),
            false,
            june(),
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Saved("INV-2025-0006".to_string()));
        assert_eq!(prompt.previews.len(), 1);
        assert!(!prompt.previews[0].exists());

        let dir = store.invoices_dir();
        assert!(dir.join("INV-2025-0006.pdf").is_file());
        let saved = invoices::load_all(&dir).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].customer, "globex");
        assert_eq!(saved[0].total, Money::new(dec!(229.90)));
        assert_eq!(saved[0].due_date.to_string(), "2025-06-16");
    }

    #[cfg(unix)]
    #[test]
    fn declined_preview_writes_nothing() {
        let (tmp, store) = sample_store();
        use_fake_renderer(&store, tmp.path());
        let mut prompt = Scripted::answering(false);

        let outcome = invoice(
            &store,
            &mut prompt,
            "globex",
            &tokens(&["widget:1"]),
            false,
            june(),
        )
        .unwrap();

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(prompt.questions.len(), 1);
        assert_eq!(fs::read_dir(store.invoices_dir()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn numbers_increase() {
        let (tmp, store) = sample_store();
        use_fake_renderer(&store, tmp.path());
        let mut prompt = Scripted::answering(true);

        for _ in 0..3 {
            invoice(&store, &mut prompt, "initech", &tokens(&["widget:1"]), true, june())
                .unwrap();
        }
        assert!(prompt.previews.is_empty());
        assert_eq!(
            yaml_files(&store.invoices_dir()),
            ["INV-2025-0006.yml", "INV-2025-0007.yml", "INV-2025-0008.yml"]
        );
    }

    #[test]
    fn skip_preview_saves_yaml_before_pdf() {
        let (_tmp, store) = sample_store();
        let mut config = fs::read_to_string(store.path(StoreFile::Config))
            .unwrap();
        config.push_str("renderer: quickbill-no-such-converter\n");
        fs::write(store.path(StoreFile::Config), config).unwrap();
        let mut prompt = Scripted::answering(true);

        let err = invoice(
            &store,
            &mut prompt,
            "globex",
            &tokens(&["widget:1"]),
            true,
            june(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            RunError::Render {
                source: RenderError::Missing { .. }
            }
        ));
        assert_eq!(yaml_files(&store.invoices_dir()), ["INV-2025-0006.yml"]);
    }

    #[test]
    fn bad_input_touches_nothing() {
        let (_tmp, store) = sample_store();
        let mut prompt = Scripted::answering(true);

        let err = invoice(
            &store,
            &mut prompt,
            "hooli",
            &tokens(&["widget:1"]),
            true,
            june(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("hooli"));

        let err = invoice(
            &store,
            &mut prompt,
            "globex",
            &tokens(&["widget:1", "widget:1:200"]),
            true,
            june(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Pricing { .. }));
        assert!(err.to_string().contains("widget:1:200"));

        assert!(prompt.questions.is_empty());
        assert_eq!(fs::read_dir(store.invoices_dir()).unwrap().count(), 0);
    }

    #[test]
    fn invoice_requires_init() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = Store::new(tmp.path().join("none"));
        let mut prompt = Scripted::answering(true);
        let err = invoice(&store, &mut prompt, "globex", &tokens(&["widget:1"]), true, june())
            .unwrap_err();
        assert!(err.to_string().contains("quickbill init"));
    }

    fn saved_invoice(store: &Store, number: &str) {
        let products = store.load_products().unwrap();
        let items = billing::price_items(&["widget:1"], &products).unwrap();
        Invoice::new(number.to_string(), "globex", items, june(), 14)
            .unwrap()
            .save(&store.invoices_dir())
            .unwrap();
    }

    #[test]
    fn delete_missing_fails_without_prompting() {
        let (_tmp, store) = sample_store();
        saved_invoice(&store, "INV-2025-0006");
        let mut prompt = Scripted::answering(true);

        let err = delete(&store, &mut prompt, "INV-2025-0099", false)
            .unwrap_err();
        assert!(err.to_string().contains("INV-2025-0099 not found"));
        assert!(prompt.questions.is_empty());
        assert_eq!(yaml_files(&store.invoices_dir()), ["INV-2025-0006.yml"]);
    }

    #[test]
    fn delete_declined_keeps_files() {
        let (_tmp, store) = sample_store();
        saved_invoice(&store, "INV-2025-0006");
        let mut prompt = Scripted::answering(false);

        delete(&store, &mut prompt, "INV-2025-0006", false).unwrap();
        assert_eq!(prompt.questions.len(), 1);
        assert_eq!(yaml_files(&store.invoices_dir()), ["INV-2025-0006.yml"]);
    }

    #[test]
    fn delete_confirmed_removes_pair() {
        let (_tmp, store) = sample_store();
        saved_invoice(&store, "INV-2025-0006");
        saved_invoice(&store, "INV-2025-0007");
        let dir = store.invoices_dir();
        fs::write(dir.join("INV-2025-0006.pdf"), "pdf").unwrap();
        let mut prompt = Scripted::answering(false);

        delete(&store, &mut prompt, "INV-2025-0006", true).unwrap();
        assert!(prompt.questions.is_empty());
        assert!(!dir.join("INV-2025-0006.pdf").exists());
        assert_eq!(yaml_files(&dir), ["INV-2025-0007.yml"]);
    }

    #[test]
    fn listings_succeed() {
        let (_tmp, store) = sample_store();
        saved_invoice(&store, "INV-2025-0006");
        for listing in [
            Listable::Invoices,
            Listable::Customers,
            Listable::Products,
            Listable::Config,
        ] {
            list(&store, listing).unwrap();
        }
    }
}
