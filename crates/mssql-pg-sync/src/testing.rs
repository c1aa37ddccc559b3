//! In-memory connector for unit tests.
//!
//! Source tables are keyed by logical table name, destination tables by
//! destination object. Every call is appended to an event log so tests can
//! assert on the exact sequence the engine produced.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::{Connector, DestinationSession, Row, SourceSession, SqlValue};
use crate::error::{Result, SyncError};
use crate::registry::{TableDescriptor, TableRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ConnectSource(String),
    ConnectDestination,
    Extract(String),
    SourceCount(String),
    Begin,
    Truncate(String),
    Insert(String, usize),
    Commit,
    Rollback,
    DestinationCount(String),
    CloseSource,
    CloseDestination,
}

#[derive(Default)]
struct Failures {
    connect_source: HashSet<String>,
    connect_destination: bool,
    extract: HashSet<String>,
    panic_on_extract: HashSet<String>,
    source_count: HashSet<String>,
    truncate: HashSet<String>,
    insert_batch: HashMap<String, usize>,
    commit: HashSet<String>,
    destination_count: HashSet<String>,
    count_skew: HashMap<String, i64>,
}

#[derive(Default)]
struct State {
    source: HashMap<String, Vec<Row>>,
    destination: HashMap<String, Vec<Row>>,
    events: Vec<Event>,
    open_connections: i64,
    failures: Failures,
}

#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<State>>,
}

/// `n` rows of `(I32(i), Text("row-i"))`.
pub fn rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| vec![SqlValue::I32(i as i32), SqlValue::Text(format!("row-{}", i))])
        .collect()
}

/// Two-column registry with tables `a`, `b`, `c` (batch size 2).
pub fn small_registry() -> TableRegistry {
    let table = |name: &str| TableDescriptor {
        name: name.to_string(),
        source_system: "mctm".into(),
        source_database: None,
        source_object: format!("[McTM].[dbo].[{}]", name),
        destination_object: format!("dest_{}", name),
        source_columns: vec!["ID".into(), "Name".into()],
        destination_columns: vec!["id".into(), "name".into()],
        ordering_key: "ID".into(),
        batch_size: 2,
        description: format!("table {}", name),
    };
    TableRegistry::new(vec![table("a"), table("b"), table("c")], None)
        .expect("small registry is valid")
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory connector state poisoned")
    }

    pub fn with_source_rows(self, table: &str, rows: Vec<Row>) -> Self {
        self.lock().source.insert(table.to_string(), rows);
        self
    }

    pub fn with_destination_rows(self, destination: &str, rows: Vec<Row>) -> Self {
        self.lock().destination.insert(destination.to_string(), rows);
        self
    }

    pub fn fail_connect_source(self, source_system: &str) -> Self {
        self.lock()
            .failures
            .connect_source
            .insert(source_system.to_string());
        self
    }

    pub fn fail_connect_destination(self) -> Self {
        self.lock().failures.connect_destination = true;
        self
    }

    pub fn fail_extract(self, table: &str) -> Self {
        self.lock().failures.extract.insert(table.to_string());
        self
    }

    pub fn panic_on_extract(self, table: &str) -> Self {
        self.lock().failures.panic_on_extract.insert(table.to_string());
        self
    }

    pub fn fail_source_count(self, table: &str) -> Self {
        self.lock().failures.source_count.insert(table.to_string());
        self
    }

    pub fn fail_truncate(self, table: &str) -> Self {
        self.lock().failures.truncate.insert(table.to_string());
        self
    }

    /// Fail the insert with this zero-based batch index.
    pub fn fail_insert_batch(self, table: &str, batch: usize) -> Self {
        self.lock()
            .failures
            .insert_batch
            .insert(table.to_string(), batch);
        self
    }

    pub fn fail_commit(self, table: &str) -> Self {
        self.lock().failures.commit.insert(table.to_string());
        self
    }

    pub fn fail_destination_count(self, table: &str) -> Self {
        self.lock()
            .failures
            .destination_count
            .insert(table.to_string());
        self
    }

    /// Add `skew` to every destination count reported for this table.
    pub fn skew_destination_count(self, table: &str, skew: i64) -> Self {
        self.lock().failures.count_skew.insert(table.to_string(), skew);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    pub fn destination_rows(&self, destination: &str) -> Option<Vec<Row>> {
        self.lock().destination.get(destination).cloned()
    }

    pub fn open_connections(&self) -> i64 {
        self.lock().open_connections
    }

    fn record(&self, event: Event) {
        self.lock().events.push(event);
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect_source(&self, table: &TableDescriptor) -> Result<Box<dyn SourceSession>> {
        let mut state = self.lock();
        state.events.push(Event::ConnectSource(table.name.clone()));
        if state.failures.connect_source.contains(&table.source_system) {
            return Err(SyncError::connection(
                "source",
                format!("Login failed for source system {}", table.source_system),
            ));
        }
        state.open_connections += 1;
        Ok(Box::new(MemorySource {
            connector: self.clone(),
        }))
    }

    async fn connect_destination(&self) -> Result<Box<dyn DestinationSession>> {
        let mut state = self.lock();
        state.events.push(Event::ConnectDestination);
        if state.failures.connect_destination {
            return Err(SyncError::connection("destination", "connection refused"));
        }
        state.open_connections += 1;
        Ok(Box::new(MemoryDestination {
            connector: self.clone(),
            staged: None,
            touched: HashSet::new(),
            batches: HashMap::new(),
        }))
    }
}

struct MemorySource {
    connector: MemoryConnector,
}

#[async_trait]
impl SourceSession for MemorySource {
    async fn fetch_all(&mut self, table: &TableDescriptor) -> Result<Vec<Row>> {
        self.connector.record(Event::Extract(table.name.clone()));
        let state = self.connector.lock();
        if state.failures.panic_on_extract.contains(&table.name) {
            drop(state);
            panic!("simulated driver panic for {}", table.name);
        }
        if state.failures.extract.contains(&table.name) {
            return Err(SyncError::extraction(&table.name, "Invalid object name"));
        }
        Ok(state.source.get(&table.name).cloned().unwrap_or_default())
    }

    async fn count_rows(&mut self, table: &TableDescriptor) -> Result<i64> {
        self.connector.record(Event::SourceCount(table.name.clone()));
        let state = self.connector.lock();
        if state.failures.source_count.contains(&table.name) {
            return Err(SyncError::extraction(&table.name, "permission denied"));
        }
        Ok(state.source.get(&table.name).map_or(0, |r| r.len() as i64))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut state = self.connector.lock();
        state.events.push(Event::CloseSource);
        state.open_connections -= 1;
        Ok(())
    }
}

struct MemoryDestination {
    connector: MemoryConnector,
    staged: Option<HashMap<String, Vec<Row>>>,
    touched: HashSet<String>,
    batches: HashMap<String, usize>,
}

#[async_trait]
impl DestinationSession for MemoryDestination {
    async fn begin(&mut self) -> Result<()> {
        self.connector.record(Event::Begin);
        self.staged = Some(HashMap::new());
        Ok(())
    }

    async fn truncate(&mut self, table: &TableDescriptor) -> Result<()> {
        self.connector
            .record(Event::Truncate(table.destination_object.clone()));
        if self.connector.lock().failures.truncate.contains(&table.name) {
            return Err(SyncError::load(&table.name, "relation does not exist"));
        }
        self.touched.insert(table.name.clone());
        if let Some(staged) = self.staged.as_mut() {
            staged.insert(table.destination_object.clone(), Vec::new());
        }
        Ok(())
    }

    async fn insert_rows(&mut self, table: &TableDescriptor, rows: &[Row]) -> Result<u64> {
        self.connector
            .record(Event::Insert(table.destination_object.clone(), rows.len()));
        let batch = self.batches.entry(table.name.clone()).or_insert(0);
        let index = *batch;
        *batch += 1;

        if self.connector.lock().failures.insert_batch.get(&table.name) == Some(&index) {
            return Err(SyncError::load(
                &table.name,
                "null value in column violates not-null constraint",
            ));
        }

        self.touched.insert(table.name.clone());
        let state = self.connector.lock();
        let staged = self.staged.get_or_insert_with(HashMap::new);
        let target = staged
            .entry(table.destination_object.clone())
            .or_insert_with(|| {
                state
                    .destination
                    .get(&table.destination_object)
                    .cloned()
                    .unwrap_or_default()
            });
        target.extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn commit(&mut self) -> Result<()> {
        self.connector.record(Event::Commit);
        let failing = {
            let state = self.connector.lock();
            self.touched
                .iter()
                .any(|t| state.failures.commit.contains(t))
        };
        if failing {
            return Err(SyncError::load("commit", "could not serialize access"));
        }
        if let Some(staged) = self.staged.take() {
            self.connector.lock().destination.extend(staged);
        }
        self.touched.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.connector.record(Event::Rollback);
        self.staged = None;
        self.touched.clear();
        Ok(())
    }

    async fn count_rows(&mut self, table: &TableDescriptor) -> Result<i64> {
        self.connector
            .record(Event::DestinationCount(table.destination_object.clone()));
        let state = self.connector.lock();
        if state.failures.destination_count.contains(&table.name) {
            return Err(SyncError::load(&table.name, "permission denied for table"));
        }
        let count = state
            .destination
            .get(&table.destination_object)
            .map_or(0, |r| r.len() as i64);
        Ok(count + state.failures.count_skew.get(&table.name).copied().unwrap_or(0))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut state = self.connector.lock();
        state.events.push(Event::CloseDestination);
        state.open_connections -= 1;
        Ok(())
    }
}
