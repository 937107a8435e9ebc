use std::error::Error as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use serde::Serialize;
use tempfile::{Builder, TempPath};
use tera::{Context, Tera};
use thiserror::Error;

use crate::config::{Company, Config, Customer, Products};
use crate::invoices::Invoice;

const PAGE_OPTIONS: [&str; 10] = [
    "--page-size",
    "Letter",
    "--margin-top",
    "10mm",
    "--margin-bottom",
    "10mm",
    "--margin-left",
    "10mm",
    "--margin-right",
    "10mm",
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Reading template {}: {source}", path.display())]
    ReadTemplate { path: PathBuf, source: io::Error },

    #[error("Rendering template {}: {reason}", path.display())]
    Template { path: PathBuf, reason: String },

    #[error("Creating temporary file: {source}")]
    TempFile { source: io::Error },

    #[error(
        "{command} not installed\n\n\
         Install it with:\n  \
         macOS: brew install wkhtmltopdf\n  \
         Ubuntu/Debian: sudo apt install wkhtmltopdf\n  \
         Fedora: sudo dnf install wkhtmltopdf"
    )]
    Missing { command: String },

    #[error("Running {command}: {source}")]
    Spawn { command: String, source: io::Error },

    #[error("{command} failed: {status}\n{output}")]
    Failed {
        command: String,
        status: String,
        output: String,
    },
}

#[derive(Serialize, Debug, PartialEq)]
pub struct TemplateItem {
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub discount: u8,
    pub price: String,
    pub total: String,
}

/// Everything the invoice template can refer to. Customer and product
/// details are copied in as they are at render time.
#[derive(Serialize, Debug)]
pub struct TemplateData<'a> {
    pub invoice_number: &'a str,
    pub date: String,
    pub due_date: String,
    pub company: &'a Company,
    pub customer: &'a Customer,
    pub payment_terms: &'a str,
    pub notes: &'a str,
    pub items: Vec<TemplateItem>,
    pub total: String,
}

impl<'a> TemplateData<'a> {
    pub fn new(
        invoice: &'a Invoice,
        config: &'a Config,
        customer: &'a Customer,
        products: &Products,
    ) -> Self {
        let items = invoice
            .items
            .iter()
            .map(|item| {
                let (name, sku) = match products.get(&item.product) {
                    Some(p) => (p.name.clone(), p.sku.clone()),
                    None => (item.product.clone(), String::new()),
                };
                TemplateItem {
                    name,
                    sku,
                    quantity: item.quantity,
                    discount: item.discount,
                    price: item.unit_price.plain(),
                    total: item.total.plain(),
                }
            })
            .collect();

        Self {
            invoice_number: &invoice.invoice_number,
            date: invoice.date.to_string(),
            due_date: invoice.due_date.to_string(),
            company: &config.company,
            customer,
            payment_terms: &config.invoice.payment_terms,
            notes: &config.invoice.notes,
            items,
            total: invoice.total.plain(),
        }
    }
}

/// Fills the user's HTML template and hands it to an external HTML to PDF
/// converter.
pub struct Renderer {
    template: PathBuf,
    command: String,
}

impl Renderer {
    pub fn new(template: PathBuf, command: &str) -> Self {
        Self {
            template,
            command: command.to_string(),
        }
    }

    pub fn html(&self, data: &TemplateData) -> Result<String, RenderError> {
        let source = fs::read_to_string(&self.template).map_err(|source| {
            RenderError::ReadTemplate {
                path: self.template.clone(),
                source,
            }
        })?;
        let template_err = |e: tera::Error| RenderError::Template {
            path: self.template.clone(),
            reason: describe(&e),
        };
        let context = Context::from_serialize(data).map_err(template_err)?;
        Tera::one_off(&source, &context, true).map_err(template_err)
    }

    /// Renders straight to `output`, replacing an existing file.
    pub fn render_to(
        &self,
        data: &TemplateData,
        output: &Path,
    ) -> Result<(), RenderError> {
        let html = self.html_file(data)?;
        self.convert(&html, output)
    }

    /// Renders to a temporary PDF that is removed when the returned path
    /// is dropped.
    pub fn render_preview(
        &self,
        data: &TemplateData,
    ) -> Result<TempPath, RenderError> {
        let html = self.html_file(data)?;
        let pdf = Builder::new()
            .prefix("quickbill-preview-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|source| RenderError::TempFile { source })?
            .into_temp_path();
        self.convert(&html, &pdf)?;
        Ok(pdf)
    }

    fn html_file(&self, data: &TemplateData) -> Result<TempPath, RenderError> {
        let html = self.html(data)?;
        let mut file = Builder::new()
            .prefix("quickbill-")
            .suffix(".html")
            .tempfile()
            .map_err(|source| RenderError::TempFile { source })?;
        file.write_all(html.as_bytes())
            .map_err(|source| RenderError::TempFile { source })?;
        Ok(file.into_temp_path())
    }

    fn convert(&self, html: &Path, pdf: &Path) -> Result<(), RenderError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(PAGE_OPTIONS);
        if !cfg!(windows) {
            cmd.arg("--quiet");
        }
        cmd.arg(html).arg(pdf);

        debug!("Running {:?}", cmd);
        let output = cmd.output().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => RenderError::Missing {
                command: self.command.clone(),
            },
            _ => RenderError::Spawn {
                command: self.command.clone(),
                source,
            },
        })?;

        if output.status.success() {
            return Ok(());
        }
        let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stdout));
        Err(RenderError::Failed {
            command: self.command.clone(),
            status: output.status.to_string(),
            output: text.trim().to_string(),
        })
    }
}

// tera keeps the useful part of its messages in the source chain
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
