//! Scripted native client and recording logger for driver tests

use crate::errors::{Error, Result};
use crate::logger::QueryLogger;
use crate::native::{ClientFactory, NativeClient, QueryResult, Row};
use async_trait::async_trait;
use config::ConnectionOptions;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Fetch(String, Vec<Value>),
    Execute(String, Vec<Value>),
    Pin,
    Release,
    Close,
}

/// Records every call; statements can be scripted to return rows or fail
#[derive(Debug, Default)]
pub(crate) struct ScriptedClient {
    events: Mutex<Vec<Event>>,
    rows: Mutex<Vec<(String, Vec<Row>)>>,
    failures: Mutex<Vec<String>>,
    last_insert_id: Mutex<Option<i64>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Rows returned for statements starting with `prefix`
    pub(crate) fn respond(&self, prefix: &str, rows: Vec<Row>) {
        self.rows.lock().unwrap().push((prefix.to_string(), rows));
    }

    /// Fail statements equal to `sql`
    pub(crate) fn fail_on(&self, sql: &str) {
        self.failures.lock().unwrap().push(sql.to_string());
    }

    pub(crate) fn set_last_insert_id(&self, id: i64) {
        *self.last_insert_id.lock().unwrap() = Some(id);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// SQL text of every statement, fetches and executes alike
    pub(crate) fn statements(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Fetch(sql, _) | Event::Execute(sql, _) => Some(sql),
                _ => None,
            })
            .collect()
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        if self.failures.lock().unwrap().iter().any(|failing| failing == sql) {
            return Err(Error::Database(sqlx::Error::Protocol(format!(
                "scripted failure: {}",
                sql
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl NativeClient for ScriptedClient {
    async fn fetch(&self, sql: &str, values: &[Value]) -> Result<Vec<Row>> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Fetch(sql.to_string(), values.to_vec()));
        self.check_failure(sql)?;

        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn execute(&self, sql: &str, values: &[Value]) -> Result<QueryResult> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Execute(sql.to_string(), values.to_vec()));
        self.check_failure(sql)?;

        Ok(QueryResult::affected(1, *self.last_insert_id.lock().unwrap()))
    }

    async fn pin_session(&self) -> Result<()> {
        self.events.lock().unwrap().push(Event::Pin);
        Ok(())
    }

    async fn release_session(&self) -> Result<()> {
        self.events.lock().unwrap().push(Event::Release);
        Ok(())
    }

    async fn close(&self) {
        self.events.lock().unwrap().push(Event::Close);
    }
}

/// Hands out the same scripted client on every connect
#[derive(Debug)]
pub(crate) struct ScriptedFactory {
    client: Arc<ScriptedClient>,
    connects: AtomicUsize,
}

impl ScriptedFactory {
    pub(crate) fn new(client: Arc<ScriptedClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            connects: AtomicUsize::new(0),
        })
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for ScriptedFactory {
    async fn connect(&self, _options: &ConnectionOptions) -> Result<Arc<dyn NativeClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let client: Arc<dyn NativeClient> = self.client.clone();
        Ok(client)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LogEntry {
    Query(String),
    Error(String),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub(crate) fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl QueryLogger for RecordingLogger {
    fn log_query(&self, sql: &str, _parameters: &[Value]) {
        self.entries
            .lock()
            .unwrap()
            .push(LogEntry::Query(sql.to_string()));
    }

    fn log_query_error(&self, sql: &str, _error: &Error) {
        self.entries
            .lock()
            .unwrap()
            .push(LogEntry::Error(sql.to_string()));
    }
}
