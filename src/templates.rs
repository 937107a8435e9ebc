use std::path::Path;

use askama::Template;

use crate::config::Config;

#[derive(Template)]
#[template(path = "config.yml", escape = "none")]
struct DefaultConfig<'a> {
    dir: String,
    renderer: &'a str,
}

#[derive(Template)]
#[template(path = "config_summary.txt", escape = "none")]
struct ConfigSummary<'a> {
    config: &'a Config,
    address: String,
}

/// Contents of a fresh `config.yml` for a store at `dir`.
pub fn default_config(dir: &Path, renderer: &str) -> askama::Result<String> {
    DefaultConfig {
        dir: dir.display().to_string(),
        renderer,
    }
    .render()
}

/// Human readable listing of the company and invoice settings.
pub fn config_summary(config: &Config) -> askama::Result<String> {
    let address = config
        .company
        .address
        .trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(", ");
    ConfigSummary { config, address }.render()
}
