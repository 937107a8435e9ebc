use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use log::debug;
use serde::de::DeserializeOwned;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::config::{Config, Customer, Customers, Products, DEFAULT_RENDERER};
use crate::error::StoreError;
use crate::git::{self, Commit, GitError};
use crate::templates;

const STORE_DIR_NAME: &str = ".quickbill";
const INVOICES_DIR_NAME: &str = "invoices";

const DEFAULT_CUSTOMERS: &str = include_str!("../assets/customers.yml");
const DEFAULT_PRODUCTS: &str = include_str!("../assets/products.yml");
const DEFAULT_TEMPLATE: &str = include_str!("../assets/template.html");

#[derive(Display, EnumIter, IntoStaticStr, Debug, PartialEq, Clone, Copy)]
pub enum StoreFile {
    #[strum(serialize = "config.yml")]
    Config,
    #[strum(serialize = "customers.yml")]
    Customers,
    #[strum(serialize = "products.yml")]
    Products,
    #[strum(serialize = "template.html")]
    Template,
    #[strum(serialize = ".last-version-check")]
    VersionCheck,
}

/// The per-user directory holding configuration, customers, products and
/// saved invoices. Nothing is cached, every load reads the file again.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Uses `dir` when given, otherwise `~/.quickbill`.
    pub fn locate(dir: Option<PathBuf>) -> Result<Self, StoreError> {
        match dir {
            Some(dir) => Ok(Self::new(dir)),
            None => BaseDirs::new()
                .map(|base| Self::new(base.home_dir().join(STORE_DIR_NAME)))
                .ok_or(StoreError::NoHome),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: StoreFile) -> PathBuf {
        let name: &'static str = file.into();
        self.dir.join(name)
    }

    pub fn invoices_dir(&self) -> PathBuf {
        self.dir.join(INVOICES_DIR_NAME)
    }

    pub fn load(&self) -> Result<Config, StoreError> {
        let path = self.path(StoreFile::Config);
        if !path.exists() {
            return Err(StoreError::NotInitialized {
                dir: self.dir.clone(),
            });
        }
        read_yaml(&path)
    }

    pub fn load_customers(&self) -> Result<Customers, StoreError> {
        read_yaml(&self.path(StoreFile::Customers))
    }

    pub fn load_products(&self) -> Result<Products, StoreError> {
        read_yaml(&self.path(StoreFile::Products))
    }

    pub fn customer(
        customers: &Customers,
        key: &str,
    ) -> Result<Customer, StoreError> {
        customers
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::CustomerNotFound {
                key: key.to_string(),
            })
    }

    /// Creates the directory with default files. Refuses to touch an
    /// existing directory.
    pub fn init(&self) -> Result<(), StoreError> {
        if self.dir.exists() {
            return Err(StoreError::AlreadyInitialized {
                dir: self.dir.clone(),
            });
        }

        let invoices = self.invoices_dir();
        fs::create_dir_all(&invoices).map_err(|source| StoreError::Write {
            path: invoices,
            source,
        })?;

        for file in StoreFile::iter() {
            if let Some(content) = self.scaffold(file)? {
                let path = self.path(file);
                debug!("Writing {}", path.display());
                fs::write(&path, content)
                    .map_err(|source| StoreError::Write { path, source })?;
            }
        }
        Ok(())
    }

    fn scaffold(&self, file: StoreFile) -> Result<Option<String>, StoreError> {
        Ok(match file {
            StoreFile::Config => Some(
                templates::default_config(&self.dir, DEFAULT_RENDERER)
                    .map_err(|e| StoreError::Scaffold {
                        file: file.to_string(),
                        reason: e.to_string(),
                    })?,
            ),
            StoreFile::Customers => Some(DEFAULT_CUSTOMERS.to_string()),
            StoreFile::Products => Some(DEFAULT_PRODUCTS.to_string()),
            StoreFile::Template => Some(DEFAULT_TEMPLATE.to_string()),
            StoreFile::VersionCheck => None,
        })
    }

    /// Snapshots the directory in git when `auto_commit` is on. An
    /// unreadable config means there is nothing to do.
    pub fn auto_commit(&self, message: &str) -> Result<Commit, GitError> {
        let enabled = self.load().map(|c| c.auto_commit).unwrap_or(false);
        git::auto_commit(&self.dir, enabled, message)
    }
}

fn is_blank_yaml(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

fn read_yaml<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<T, StoreError> {
    debug!("Reading {}", path.display());
    let content =
        fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if is_blank_yaml(&content) {
        return Ok(T::default());
    }
    serde_yaml::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
