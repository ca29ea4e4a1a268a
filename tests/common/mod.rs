//! In-memory connection source that records every statement it executes.

#![allow(dead_code)]

use async_trait::async_trait;
use pg_mcp_gateway::db::{ConnectionSource, JsonRow, Session};
use pg_mcp_gateway::error::{DbError, DbResult};
use pg_mcp_gateway::mcp::{Dispatcher, GatewayContext};
use pg_mcp_gateway::models::SqlValue;
use pg_mcp_gateway::sql::IdentifierPolicy;
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

type Responder = dyn Fn(&str, &[SqlValue]) -> DbResult<Vec<JsonRow>> + Send + Sync;

pub struct Recorder {
    log: Mutex<Vec<Executed>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    closed: AtomicBool,
    fail_acquire: AtomicBool,
    responder: Box<Responder>,
}

impl Recorder {
    /// Every statement succeeds with no rows.
    pub fn new() -> Arc<Self> {
        Self::with_responder(|_, _| Ok(Vec::new()))
    }

    pub fn with_responder(
        responder: impl Fn(&str, &[SqlValue]) -> DbResult<Vec<JsonRow>> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            fail_acquire: AtomicBool::new(false),
            responder: Box::new(responder),
        })
    }

    pub fn fail_acquire(&self) {
        self.fail_acquire.store(true, Ordering::SeqCst);
    }

    pub fn log(&self) -> Vec<Executed> {
        self.log.lock().unwrap().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.log().into_iter().map(|e| e.sql).collect()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Connection source backed by a shared [`Recorder`].
pub struct RecordingSource(pub Arc<Recorder>);

#[async_trait]
impl ConnectionSource for RecordingSource {
    async fn acquire(&self) -> DbResult<Box<dyn Session>> {
        if self.0.fail_acquire.load(Ordering::SeqCst) {
            return Err(DbError::connection(
                "Timed out waiting for a pooled connection",
                "retry later",
            ));
        }
        self.0.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSession(self.0.clone())))
    }

    async fn close(&self) {
        self.0.closed.store(true, Ordering::SeqCst);
    }
}

struct RecordingSession(Arc<Recorder>);

#[async_trait]
impl Session for RecordingSession {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<JsonRow>> {
        self.0.log.lock().unwrap().push(Executed {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        (self.0.responder)(sql, params)
    }

    async fn release(self: Box<Self>) {
        self.0.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn dispatcher_with(recorder: &Arc<Recorder>, identifiers: IdentifierPolicy) -> Dispatcher {
    let context = GatewayContext::new(
        Arc::new(RecordingSource(recorder.clone())),
        Url::parse("postgres://alice@db.local:5432/shop").unwrap(),
        "public",
        identifiers,
    );
    Dispatcher::new(context)
}

pub fn dispatcher(recorder: &Arc<Recorder>) -> Dispatcher {
    dispatcher_with(recorder, IdentifierPolicy::Trusted)
}

pub fn args(value: JsonValue) -> serde_json::Map<String, JsonValue> {
    value.as_object().cloned().unwrap_or_default()
}

pub fn row(value: JsonValue) -> JsonRow {
    value.as_object().cloned().unwrap_or_default()
}

pub fn statement_error(message: &str, code: &str) -> DbError {
    DbError::database(message, Some(code.to_string()), "check the statement")
}
