//! Connection factory and request-scoped transactions.
//!
//! A [`Catalog`] is built once per process and hands out one [`CatalogConn`]
//! per worker. Every mutating operation runs inside
//! [`CatalogConn::with_txn`], which opens a `BEGIN IMMEDIATE` transaction and
//! passes a [`Session`] (transaction, actor, config, clock) to the work.

use crate::config::{self, CATALOG_DIR, CatalogConfig};
use crate::db::{self, DB_FILE, users};
use crate::error::{CatalogError, Result};
use crate::model::{Role, RoleSet, User};
use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub name: String,
    pub roles: RoleSet,
}

impl Actor {
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            roles: user.roles.clone(),
        }
    }

    #[must_use]
    pub fn has(&self, role: Role) -> bool {
        self.roles.has(role)
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::Unauthorized`] when the actor lacks `role`.
    pub fn require(&self, role: Role) -> Result<()> {
        if self.has(role) {
            Ok(())
        } else {
            tracing::debug!(user = %self.name, role = %role, "role check failed");
            Err(CatalogError::Unauthorized)
        }
    }
}

/// Process-wide catalog handle: database location plus configuration.
#[derive(Debug, Clone)]
pub struct Catalog {
    db_path: PathBuf,
    config: CatalogConfig,
}

impl Catalog {
    /// Open the catalog under `project_root/.tally`, loading its config and
    /// migrating the database once.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog directory is missing, the config does
    /// not parse, or the database cannot be opened or migrated.
    pub fn open(project_root: &Path) -> anyhow::Result<Self> {
        let dir = project_root.join(CATALOG_DIR);
        if !dir.is_dir() {
            anyhow::bail!("no catalog at {}", dir.display());
        }
        let config = config::load_project_config(project_root)?;
        Self::with_config(dir.join(DB_FILE), config)
    }

    /// Create `project_root/.tally` with a default config file (kept when
    /// already present) and an empty migrated database.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, config, or database cannot be
    /// written.
    pub fn init(project_root: &Path) -> anyhow::Result<Self> {
        let dir = project_root.join(CATALOG_DIR);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create catalog directory {}", dir.display()))?;
        let config_path = dir.join("config.toml");
        if !config_path.exists() {
            let rendered = config::to_toml(&CatalogConfig::default())?;
            std::fs::write(&config_path, rendered)
                .with_context(|| format!("write {}", config_path.display()))?;
        }
        Self::open(project_root)
    }

    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn with_config(db_path: PathBuf, config: CatalogConfig) -> anyhow::Result<Self> {
        db::open_catalog(&db_path)?;
        Ok(Self { db_path, config })
    }

    /// Open a fresh connection for one worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn connect(&self) -> anyhow::Result<CatalogConn> {
        let conn = db::open_catalog(&self.db_path)?;
        Ok(CatalogConn {
            conn,
            config: self.config.clone(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// One worker's connection. Not shared across threads.
#[derive(Debug)]
pub struct CatalogConn {
    conn: Connection,
    config: CatalogConfig,
}

impl CatalogConn {
    /// Private in-memory catalog, for tests and throwaway tooling.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub fn in_memory(config: CatalogConfig) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
            config,
        })
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Resolve a user name to an actor.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown name.
    pub fn actor(&self, name: &str) -> Result<Actor> {
        users::find_by_name(&self.conn, name)?
            .map(|user| Actor::from_user(&user))
            .ok_or_else(|| CatalogError::not_found("user", name))
    }

    /// Run `work` inside one `BEGIN IMMEDIATE` transaction stamped with the
    /// current time.
    ///
    /// # Errors
    ///
    /// Returns whatever `work` returns, or a storage error from
    /// begin/commit/rollback.
    pub fn with_txn<T>(
        &mut self,
        actor: &Actor,
        work: impl FnOnce(&Session<'_>) -> Result<T>,
    ) -> Result<T> {
        self.with_txn_at(actor, Utc::now(), work)
    }

    /// [`Self::with_txn`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns whatever `work` returns, or a storage error from
    /// begin/commit/rollback.
    pub fn with_txn_at<T>(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
        work: impl FnOnce(&Session<'_>) -> Result<T>,
    ) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let session = Session {
            tx,
            actor,
            config: &self.config,
            now,
        };

        match work(&session) {
            Ok(value) => {
                session.tx.commit()?;
                Ok(value)
            }
            Err(error) => {
                tracing::warn!(user = %actor.name, error = %error, "rolling back transaction");
                session.tx.rollback()?;
                Err(error)
            }
        }
    }

    /// Seed the first administrator of an empty catalog. Returns `None`
    /// when users already exist.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub fn bootstrap_admin(&mut self, name: &str) -> Result<Option<User>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if users::count(&tx)? > 0 {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            roles: RoleSet::new([Role::Admin]),
            created_at: Utc::now(),
        };
        users::insert(&tx, &user)?;
        tx.commit()?;
        tracing::info!(user = %user.name, "seeded catalog administrator");
        Ok(Some(user))
    }
}

/// Request-scoped state handed to every core operation.
#[derive(Debug)]
pub struct Session<'a> {
    tx: Transaction<'a>,
    actor: &'a Actor,
    config: &'a CatalogConfig,
    now: DateTime<Utc>,
}

impl Session<'_> {
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    #[must_use]
    pub const fn actor(&self) -> &Actor {
        self.actor
    }

    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        self.config
    }

    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Run `work` inside a named savepoint: released on `Ok`, rolled back
    /// on `Err`. The outer transaction stays usable either way.
    ///
    /// # Errors
    ///
    /// Returns whatever `work` returns, or a storage error from the
    /// savepoint statements.
    pub fn savepoint<T>(&self, name: &str, work: impl FnOnce() -> Result<T>) -> Result<T> {
        self.tx.execute_batch(&format!("SAVEPOINT {name}"))?;
        match work() {
            Ok(value) => {
                self.tx.execute_batch(&format!("RELEASE {name}"))?;
                Ok(value)
            }
            Err(error) => {
                self.tx
                    .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))?;
                Err(error)
            }
        }
    }
}

/// Register a new user. Requires the admin role.
///
/// # Errors
///
/// Returns [`CatalogError::Unauthorized`] for non-admins and
/// [`CatalogError::InvalidOperation`] for a blank or taken name.
pub fn register_user(session: &Session<'_>, name: &str, roles: RoleSet) -> Result<User> {
    session.actor().require(Role::Admin)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::invalid("user name must not be blank"));
    }
    if users::find_by_name(session.conn(), name)?.is_some() {
        return Err(CatalogError::invalid(format!("user '{name}' already exists")));
    }
    let user = User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        roles,
        created_at: session.now(),
    };
    users::insert(session.conn(), &user)?;
    tracing::info!(user = %user.name, roles = %user.roles.to_db_string(), "registered user");
    Ok(user)
}
