use clap::{Parser, ValueEnum, ValueHint};
use std::path::PathBuf;

/* Argument Stucture
 *
 * init
 * invoice <customer> <product:qty[:discount][:@price]>... [-y]
 * list [invoices | customers | products | config]
 * delete <number> [--confirm]
 */

#[derive(Parser)]
#[clap(name = "quickbill", version, disable_version_flag = true)]
pub struct Opts {
    /// Directory holding the configuration and invoices
    /// [default: ~/.quickbill]
    #[clap(short, long, env = "QUICKBILL_DIR", global = true,
        value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    /// Don't check for a newer release
    #[clap(long, global = true)]
    pub no_update_check: bool,

    /// Print version
    #[clap(short = 'v', long)]
    pub version: bool,

    #[clap(subcommand)]
    pub subcommand: Option<Command>,
}

#[derive(Parser)]
pub enum Command {
    /// Create the data directory with default configuration files
    Init,

    /// Generate an invoice for a customer
    Invoice {
        /// key name to identify the customer
        customer: String,

        /// Items as product:qty[:discount][:@price]
        #[clap(required = true, value_name = "PRODUCT:QTY")]
        items: Vec<String>,

        /// Save without previewing the PDF
        #[clap(short, long)]
        yes: bool,
    },

    /// List invoices, customers, products or the configuration
    List {
        #[clap(value_enum, default_value_t = Listable::Invoices)]
        listing: Listable,
    },

    /// Delete an invoice and its PDF
    Delete {
        /// Invoice number to delete, e.g. INV-2025-0001
        number: String,

        /// Delete without asking
        #[clap(short = 'y', long)]
        confirm: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum Listable {
    /// Saved invoices, newest first
    Invoices,
    /// Customers from customers.yml
    Customers,
    /// Products from products.yml
    Products,
    /// Company and invoice settings
    Config,
}
