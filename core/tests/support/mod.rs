//! Scripted report service for end-to-end tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fightstats_core::client::Upload;
use fightstats_core::{AppConfig, LogId, LogSource, Pipeline, TransportError, UploadsPage};
use serde_json::{Map, Value, json};

pub const TOKEN: &str = "test-token";

#[derive(Default)]
pub struct ScriptedSource {
    uploads: Vec<LogId>,
    logs: HashMap<LogId, Result<Value, TransportError>>,
    pub log_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a log in listing order
    pub fn log(mut self, id: &str, payload: Result<Value, TransportError>) -> Self {
        self.uploads.push(LogId::from(id));
        self.logs.insert(LogId::from(id), payload);
        self
    }

    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }
}

impl LogSource for ScriptedSource {
    fn uploads_page(&self, token: &str, page: u32) -> Result<UploadsPage, TransportError> {
        if token != TOKEN || page != 1 {
            return Err(TransportError::Status {
                url: "https://dps.report/getUploads".into(),
                status: 403,
            });
        }
        Ok(UploadsPage {
            pages: 1,
            uploads: self.uploads.iter().map(|id| Upload { id: id.clone() }).collect(),
        })
    }

    fn log_json(&self, id: &LogId) -> Result<Value, TransportError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        self.logs.get(id).cloned().unwrap_or_else(|| Err(unavailable(id.as_str())))
    }
}

pub fn unavailable(id: &str) -> TransportError {
    TransportError::Request {
        url: format!("https://dps.report/getJson?id={id}"),
        message: "connection reset by peer".into(),
    }
}

pub fn player(name: &str, profession: &str) -> Value {
    json!({
        "name": name,
        "account": format!("{}.1234", name.to_lowercase()),
        "profession": profession,
        "dpsAll": [{ "dps": 1000, "condiDps": 200, "powerDps": 800 }],
        "statsAll": [{ "downContribution": 5000 }],
        "support": [{ "condiCleanse": 3 }],
        "defenses": [{ "evaded": 1 }],
        "groupBuffs": [{ "id": 740, "buffData": [{ "generation": 2.5 }] }],
    })
}

/// `extra_stats` additional numeric fields no category knows about
pub fn player_with_noise(name: &str, profession: &str, extra_stats: usize) -> Value {
    let mut value = player(name, profession);
    let mut noise = Map::new();
    for i in 0..extra_stats {
        noise.insert(format!("mysteryStat{i}"), json!(i as f64));
    }
    value["statsAll"] = json!([noise]);
    value
}

pub fn fight(time_start: &str, players: Vec<Value>) -> Value {
    json!({
        "timeStartStd": time_start,
        "durationMS": 120_000,
        "players": players,
    })
}

pub fn pipeline(source: Arc<ScriptedSource>) -> Pipeline {
    let mut config = AppConfig::default();
    config.workers.queue_idle_timeout_ms = 100;
    config.workers.progress_interval_ms = 10;
    Pipeline::new(config, source)
}
