#![allow(dead_code)]

use async_trait::async_trait;
use pg_publication_controller::postgres::{ConnectionProvider, Session, TextRow};
use pg_publication_controller::publication::sql::{PUBLICATION_QUERY, PUBLICATION_TABLES_QUERY};
use pg_publication_controller::{Error, Result};
use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory stand-in for a cluster.
///
/// Understands the two catalog lookups and the publication DDL shapes the
/// reconciler emits; every statement it sees is recorded.
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    databases: HashMap<String, HashMap<String, FakePublication>>,
    executed: Vec<(String, String)>,
    connections: usize,
    open_sessions: usize,
    execute_error: Option<(String, String)>,
    connect_error: Option<String>,
    connect_delay: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct FakePublication {
    pub owner: String,
    /// Membership clause of the last CREATE/ALTER SET.
    pub membership: String,
    /// `(schema, table, attnames, rowfilter)` rows.
    pub tables: Vec<TextRow>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(self, database: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .databases
            .entry(database.to_string())
            .or_default();
        self
    }

    pub fn with_publication(self, database: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .databases
            .entry(database.to_string())
            .or_default()
            .insert(
                name.to_string(),
                FakePublication {
                    owner: "postgres".to_string(),
                    ..FakePublication::default()
                },
            );
        self
    }

    pub fn with_table(self, database: &str, name: &str, row: [&str; 4]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let publication = state
                .databases
                .get_mut(database)
                .and_then(|pubs| pubs.get_mut(name))
                .expect("publication must exist");
            publication.tables.push(TextRow::from(row.iter().map(|c| Some(*c)).collect::<Vec<_>>()));
        }
        self
    }

    /// Every subsequent DDL fails with the given SQLSTATE.
    pub fn fail_execute_with(self, code: &str) -> Self {
        self.state.lock().unwrap().execute_error = Some((code.to_string(), "injected failure".to_string()));
        self
    }

    /// Every subsequent connect fails with a connection error.
    pub fn refuse_connections(self, message: &str) -> Self {
        self.state.lock().unwrap().connect_error = Some(message.to_string());
        self
    }

    /// Every subsequent connect hangs for `delay` before succeeding.
    pub fn delay_connections(self, delay: Duration) -> Self {
        self.state.lock().unwrap().connect_delay = Some(delay);
        self
    }

    /// DDL statements executed so far, as `(database, statement)`.
    pub fn executed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().open_sessions
    }

    pub fn publication(&self, database: &str, name: &str) -> Option<FakePublication> {
        self.state
            .lock()
            .unwrap()
            .databases
            .get(database)
            .and_then(|pubs| pubs.get(name))
            .cloned()
    }
}

#[async_trait]
impl ConnectionProvider for FakeCluster {
    async fn connect(&self, database: &str) -> Result<Box<dyn Session>> {
        let database = if database.is_empty() {
            self.default_database().to_string()
        } else {
            database.to_string()
        };

        let delay = self.state.lock().unwrap().connect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.connections += 1;
        if let Some(message) = &state.connect_error {
            return Err(Error::Connection(message.clone()));
        }
        if database != self.default_database() && !state.databases.contains_key(&database) {
            return Err(Error::Database {
                code: "3D000".to_string(),
                message: format!("database \"{}\" does not exist", database),
            });
        }
        state.open_sessions += 1;
        Ok(Box::new(FakeSession {
            database,
            state: self.state.clone(),
        }))
    }

    fn default_database(&self) -> &str {
        "postgres"
    }
}

struct FakeSession {
    database: String,
    state: Arc<Mutex<FakeState>>,
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.open_sessions -= 1;
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&self, statement: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        if statement.starts_with("SELECT 1") {
            return Ok(1);
        }
        state
            .executed
            .push((self.database.clone(), statement.to_string()));
        if let Some((code, message)) = &state.execute_error {
            return Err(Error::Database {
                code: code.clone(),
                message: message.clone(),
            });
        }

        let name = quoted_name(statement);
        let pubs = state.databases.entry(self.database.clone()).or_default();
        if statement.starts_with("CREATE PUBLICATION") {
            if pubs.contains_key(&name) {
                return Err(Error::Database {
                    code: "42710".to_string(),
                    message: format!("publication \"{}\" already exists", name),
                });
            }
            pubs.insert(
                name,
                FakePublication {
                    owner: "postgres".to_string(),
                    membership: membership(statement, " FOR "),
                    tables: Vec::new(),
                },
            );
        } else if statement.starts_with("ALTER PUBLICATION") {
            let publication = pubs.get_mut(&name).ok_or_else(|| Error::Database {
                code: "42704".to_string(),
                message: format!("publication \"{}\" does not exist", name),
            })?;
            if statement.contains("\" SET ") {
                publication.membership = membership(statement, " SET ");
            } else {
                publication.membership.push_str(&membership(statement, " ADD "));
            }
        } else if statement.starts_with("DROP PUBLICATION") {
            pubs.remove(&name);
        }
        Ok(0)
    }

    async fn query(&self, statement: &str, params: &[&str]) -> Result<Vec<TextRow>> {
        let state = self.state.lock().unwrap();
        let name = params.first().copied().unwrap_or_default();
        let publication = state
            .databases
            .get(&self.database)
            .and_then(|pubs| pubs.get(name));

        match (statement, publication) {
            (PUBLICATION_QUERY, Some(publication)) => Ok(vec![TextRow::from(vec![
                Some(name.to_string()),
                Some(publication.owner.clone()),
            ])]),
            (PUBLICATION_TABLES_QUERY, Some(publication)) => Ok(publication.tables.clone()),
            (PUBLICATION_QUERY, None) | (PUBLICATION_TABLES_QUERY, None) => Ok(Vec::new()),
            _ => Err(Error::Unexpected(format!("unexpected query: {}", statement))),
        }
    }
}

fn quoted_name(statement: &str) -> String {
    statement
        .split('"')
        .nth(1)
        .unwrap_or_default()
        .to_string()
}

fn membership(statement: &str, marker: &str) -> String {
    statement
        .split_once(marker)
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_default()
}

/// Live-cluster settings for `#[ignore]`d tests.
pub fn live_postgres_config() -> pg_publication_controller::config::PostgresConfig {
    pg_publication_controller::config::PostgresConfig {
        host: env::var("TEST_PG_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: env::var("TEST_PG_PORT")
            .unwrap_or_else(|_| "5432".to_string())
            .parse()
            .unwrap_or(5432),
        username: env::var("TEST_PG_USERNAME").unwrap_or_else(|_| "postgres".to_string()),
        password: env::var("TEST_PG_PASSWORD").unwrap_or_else(|_| "postgres".to_string()),
        database: env::var("TEST_PG_DATABASE").unwrap_or_else(|_| "postgres".to_string()),
        ..Default::default()
    }
}
