/*
 * Invoices from the command line
 *
 * Everything lives in ~/.quickbill:
 *  - config.yml: company details, numbering, payment terms
 *  - customers.yml / products.yml: keyed records used on the command line
 *  - template.html: the invoice layout, freely editable
 *  - invoices/: one YAML record and one PDF per invoice
 *
 * To generate an invoice:
 *  - Look up the customer and every product:qty item
 *  - Price each item (discount, override price)
 *  - Number it PREFIX-YEAR-NNNN after the highest existing one
 *  - Preview the PDF and ask before saving (unless -y)
 *  - Save the YAML record, then render the PDF next to it
 *  - Commit the directory to git if auto_commit is on
 */

mod billing;
mod cli;
mod config;
mod error;
mod git;
mod input;
mod invoices;
mod pdf;
mod run;
mod store;
mod templates;
mod update;

use std::process;

use clap::{CommandFactory, Parser};
use env_logger::Env;

use crate::cli::Opts;
use crate::input::Terminal;
use crate::store::Store;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let opts = Opts::parse();

    if opts.version {
        println!("quickbill {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let Some(subcommand) = opts.subcommand else {
        let _ = Opts::command().print_help();
        process::exit(1);
    };

    let result = Store::locate(opts.dir)
        .map_err(run::RunError::from)
        .and_then(|store| {
            if !opts.no_update_check {
                update::check(&store, env!("CARGO_PKG_VERSION"));
            }
            run::run_cmd(subcommand, &store, &mut Terminal)
        });

    if let Err(error) = result {
        eprintln!("Error: {}", error);
        process::exit(1);
    }
}
