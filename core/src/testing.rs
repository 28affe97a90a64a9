//! Test fixtures: report payload builders and a scripted [`LogSource`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::client::{LogSource, UploadsPage};
use crate::error::TransportError;
use crate::fetcher::Slot;
use crate::model::{LogId, PlayerIdentity, PlayerRow};

pub fn player_json(name: &str, account: &str, profession: &str, dps: f64) -> Value {
    json!({
        "name": name,
        "account": account,
        "profession": profession,
        "group": 1,
        "dpsAll": [{ "dps": dps, "damage": dps * 60.0, "condiDps": 0, "powerDps": dps }],
        "statsAll": [{ "downContribution": 100, "distToCom": 250.5 }],
        "support": [{ "condiCleanse": 4, "boonStrips": 2 }],
        "defenses": [{ "deadDuration": 0, "damageTaken": 1000 }],
    })
}

pub fn fight_payload(time_start: &str, duration_ms: u64, players: Vec<Value>) -> Value {
    json!({
        "fightName": "World vs World",
        "timeStartStd": time_start,
        "durationMS": duration_ms,
        "players": players,
    })
}

/// `count` players named `<prefix>0..` in one fight
pub fn squad_payload(time_start: &str, prefix: &str, count: usize) -> Value {
    let players = (0..count)
        .map(|i| player_json(&format!("{prefix}{i}"), &format!("{prefix}.{i}"), "Herald", 100.0))
        .collect();
    fight_payload(time_start, 60_000, players)
}

pub fn transport_failure(id: &str) -> TransportError {
    TransportError::Status {
        url: format!("https://dps.report/getJson?id={id}"),
        status: 503,
    }
}

/// In-memory report service with call counters and scripted failures
#[derive(Default)]
pub struct FakeSource {
    pub pages: Mutex<HashMap<(String, u32), Result<UploadsPage, TransportError>>>,
    pub logs: Mutex<HashMap<LogId, Result<Value, TransportError>>>,
    pub delays: Mutex<HashMap<LogId, Duration>>,
    pub page_calls: AtomicUsize,
    pub log_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, token: &str, page: u32, result: Result<UploadsPage, TransportError>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert((token.to_string(), page), result);
        self
    }

    pub fn with_log(self, id: &str, result: Result<Value, TransportError>) -> Self {
        self.logs.lock().unwrap().insert(LogId::from(id), result);
        self
    }

    pub fn with_delay(self, id: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(LogId::from(id), delay);
        self
    }

    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

pub fn page(pages: u32, ids: &[&str]) -> UploadsPage {
    UploadsPage {
        pages,
        uploads: ids.iter().map(|id| crate::client::Upload { id: LogId::from(*id) }).collect(),
    }
}

impl LogSource for FakeSource {
    fn uploads_page(&self, token: &str, page: u32) -> Result<UploadsPage, TransportError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .get(&(token.to_string(), page))
            .cloned()
            .unwrap_or_else(|| {
                Err(TransportError::Status {
                    url: format!("https://dps.report/getUploads?page={page}"),
                    status: 404,
                })
            })
    }

    fn log_json(&self, id: &LogId) -> Result<Value, TransportError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(id).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        self.logs
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| Err(transport_failure(id.as_str())))
    }
}

/// A normalized row built directly, for table and filter tests.
/// `time_start` is RFC 3339.
pub fn stat_row(log_id: &str, time_start: &str, name: &str, account: &str, profession: &str, stats: &[(&str, f64)]) -> PlayerRow {
    PlayerRow {
        identity: PlayerIdentity {
            log_id: LogId::from(log_id),
            time_start: DateTime::parse_from_rfc3339(time_start).unwrap().with_timezone(&Utc),
            profession: profession.to_string(),
            name: name.to_string(),
            account: account.to_string(),
            spec_color: "rgba(128,128,128,1)".to_string(),
        },
        stats: stats.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    }
}

/// Wrap rows as a successful batch slot
pub fn ok_slot(rows: Vec<PlayerRow>) -> Slot {
    Ok(Arc::new(rows))
}
