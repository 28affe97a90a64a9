//! Report payload normalization
//!
//! Turns one report JSON document into one [`PlayerRow`] per squad member.
//! The report schema is an external contract; only the sections listed
//! below are read:
//! - `dpsAll`, `statsAll`, `support`, `defenses`: first (whole-fight) phase entry
//! - `extHealingStats.outgoingHealing`, `extBarrierStats.outgoingBarrier`
//! - `groupBuffs`, `squadBuffs`, `selfBuffs`: boon generation

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::boons::{BOONS, GenerationSource};
use crate::error::FightInvalid;
use crate::keys::display_name;
use crate::model::{LogId, PlayerIdentity, PlayerRow, RowSet};
use fightstats_types::DisplayConfig;

/// Sections whose numeric fields are copied verbatim (first writer wins)
const STAT_SECTIONS: [&str; 4] = ["dpsAll", "statsAll", "support", "defenses"];

/// `(outer, inner)` sections nested one level deeper
const EXTENSION_SECTIONS: [(&str, &str); 2] = [
    ("extHealingStats", "outgoingHealing"),
    ("extBarrierStats", "outgoingBarrier"),
];

const TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S %:z", "%Y-%m-%d %H:%M:%S %z"];

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    display: DisplayConfig,
}

impl Normalizer {
    pub fn new(display: DisplayConfig) -> Self {
        Self { display }
    }

    pub fn normalize(&self, payload: &Value, log_id: &LogId) -> Result<RowSet, FightInvalid> {
        let duration_ms = payload
            .get("durationMS")
            .and_then(Value::as_f64)
            .ok_or(FightInvalid::MissingSection("durationMS"))?;
        if duration_ms <= 0.0 {
            return Err(FightInvalid::ZeroDuration);
        }

        let time_start = payload
            .get("timeStartStd")
            .or_else(|| payload.get("timeStart"))
            .and_then(Value::as_str)
            .ok_or(FightInvalid::MissingSection("timeStart"))
            .and_then(parse_time_start)?;

        let players = payload
            .get("players")
            .and_then(Value::as_array)
            .ok_or(FightInvalid::MissingSection("players"))?;

        let rows: RowSet = players
            .iter()
            .filter(|p| is_tracked(p))
            .filter_map(|p| self.player_row(p, log_id, time_start, duration_ms))
            .collect();

        if rows.is_empty() {
            return Err(FightInvalid::NoPlayers);
        }
        Ok(rows)
    }

    fn player_row(
        &self,
        player: &Value,
        log_id: &LogId,
        time_start: DateTime<Utc>,
        duration_ms: f64,
    ) -> Option<PlayerRow> {
        let name = player.get("name")?.as_str()?;
        let profession = player.get("profession")?.as_str()?;
        let account = player.get("account").and_then(Value::as_str).unwrap_or_default();

        let mut stats = BTreeMap::new();
        for section in STAT_SECTIONS {
            if let Some(entry) = first_entry(player.get(section)) {
                merge_numeric(&mut stats, entry);
            }
        }
        for (outer, inner) in EXTENSION_SECTIONS {
            let nested = player.get(outer).and_then(|o| o.get(inner));
            if let Some(entry) = first_entry(nested) {
                merge_numeric(&mut stats, entry);
            }
        }

        let dead_ms = first_entry(player.get("defenses"))
            .and_then(|d| d.get("deadDuration"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let alive = (100.0 * (duration_ms - dead_ms) / duration_ms).clamp(0.0, 100.0);
        stats.insert(display_name("percentageAlive").to_string(), alive);

        for source in GenerationSource::ALL {
            let generated = boon_generation(player.get(source.section()));
            for boon in &BOONS {
                let raw = generated.get(&boon.id).copied().unwrap_or(0.0);
                stats.insert(boon.column(source), boon.generation_per_second(raw));
            }
        }

        Some(PlayerRow {
            identity: PlayerIdentity {
                log_id: log_id.clone(),
                time_start,
                profession: profession.to_string(),
                name: name.to_string(),
                account: account.to_string(),
                spec_color: self.display.color_for(profession).to_string(),
            },
            stats,
        })
    }
}

/// Squad members only: allies outside the squad and fake entities are skipped.
fn is_tracked(player: &Value) -> bool {
    let flag = |key: &str| player.get(key).and_then(Value::as_bool).unwrap_or(false);
    !flag("notInSquad") && !flag("isFake")
}

/// Report timestamps look like `2024-03-10 20:15:42 +01:00`
pub fn parse_time_start(raw: &str) -> Result<DateTime<Utc>, FightInvalid> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| FightInvalid::BadTimestamp(raw.to_string()))
}

/// First object of a per-phase array (index 0 is the whole fight)
fn first_entry(section: Option<&Value>) -> Option<&Map<String, Value>> {
    section?.as_array()?.first()?.as_object()
}

fn merge_numeric(stats: &mut BTreeMap<String, f64>, entry: &Map<String, Value>) {
    for (key, value) in entry {
        if let Some(n) = value.as_f64() {
            stats.entry(display_name(key).to_string()).or_insert(n);
        }
    }
}

/// Boon id -> whole-fight `generation` for one buff section
fn boon_generation(section: Option<&Value>) -> BTreeMap<u64, f64> {
    let Some(buffs) = section.and_then(Value::as_array) else {
        return BTreeMap::new();
    };
    buffs
        .iter()
        .filter_map(|buff| {
            let id = buff.get("id")?.as_u64()?;
            let generation = first_entry(buff.get("buffData"))?
                .get("generation")?
                .as_f64()?;
            Some((id, generation))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fight_payload, player_json};
    use serde_json::json;

    fn normalizer() -> Normalizer {
        let mut display = DisplayConfig::default();
        display
            .spec_colors
            .insert("Firebrand".to_string(), "rgba(15,143,143,1)".to_string());
        Normalizer::new(display)
    }

    #[test]
    fn test_one_row_per_squad_member() {
        let payload = fight_payload(
            "2024-03-10 20:15:42 +01:00",
            60_000,
            vec![
                player_json("Alice", "alice.1234", "Firebrand", 1200.0),
                player_json("Bob", "bob.5678", "Herald", 800.0),
            ],
        );
        let rows = normalizer().normalize(&payload, &LogId::from("l1")).unwrap();
        assert_eq!(rows.len(), 2);

        let alice = &rows[0].identity;
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.account, "alice.1234");
        assert_eq!(alice.log_id.as_str(), "l1");
        assert_eq!(alice.spec_color, "rgba(15,143,143,1)");
        assert_eq!(rows[1].identity.spec_color, "rgba(128,128,128,1)");
        assert_eq!(
            alice.time_start,
            DateTime::parse_from_rfc3339("2024-03-10T19:15:42Z").unwrap()
        );
        assert_eq!(rows[0].stats["Damage (dps)"], 1200.0);
    }

    #[test]
    fn test_skips_players_outside_squad() {
        let mut outsider = player_json("Eve", "eve.1", "Scourge", 10.0);
        outsider["notInSquad"] = json!(true);
        let mut fake = player_json("Turret", "", "Engineer", 10.0);
        fake["isFake"] = json!(true);
        let payload = fight_payload(
            "2024-03-10 20:15:42 +01:00",
            60_000,
            vec![player_json("Alice", "alice.1234", "Firebrand", 1.0), outsider, fake],
        );
        let rows = normalizer().normalize(&payload, &LogId::from("l1")).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_invalid_fights() {
        let n = normalizer();
        let id = LogId::from("bad");

        let zero = fight_payload("2024-03-10 20:15:42 +01:00", 0, vec![]);
        assert_eq!(n.normalize(&zero, &id), Err(FightInvalid::ZeroDuration));

        let empty = fight_payload("2024-03-10 20:15:42 +01:00", 1000, vec![]);
        assert_eq!(n.normalize(&empty, &id), Err(FightInvalid::NoPlayers));

        let no_players = json!({"durationMS": 1000, "timeStartStd": "2024-03-10 20:15:42 +01:00"});
        assert_eq!(
            n.normalize(&no_players, &id),
            Err(FightInvalid::MissingSection("players"))
        );

        let bad_time = fight_payload("yesterday", 1000, vec![]);
        assert_eq!(
            n.normalize(&bad_time, &id),
            Err(FightInvalid::BadTimestamp("yesterday".to_string()))
        );

        assert_eq!(
            n.normalize(&json!({"players": []}), &id),
            Err(FightInvalid::MissingSection("durationMS"))
        );
    }

    #[test]
    fn test_time_alive_from_dead_duration() {
        let mut player = player_json("Alice", "alice.1234", "Firebrand", 1.0);
        player["defenses"] = json!([{ "deadDuration": 15000, "damageTaken": 5000 }]);
        let payload = fight_payload("2024-03-10 20:15:42 +01:00", 60_000, vec![player]);
        let rows = normalizer().normalize(&payload, &LogId::from("l1")).unwrap();
        assert_eq!(rows[0].stats["Time Alive (%)"], 75.0);
        assert_eq!(rows[0].stats["damageTaken"], 5000.0);
    }

    #[test]
    fn test_boon_generation_columns() {
        let mut player = player_json("Alice", "alice.1234", "Firebrand", 1.0);
        player["groupBuffs"] = json!([
            { "id": 1187, "buffData": [{ "generation": 50.0 }] },
            { "id": 740, "buffData": [{ "generation": 3.5 }] },
            { "id": 99999, "buffData": [{ "generation": 10.0 }] }
        ]);
        let payload = fight_payload("2024-03-10 20:15:42 +01:00", 60_000, vec![player]);
        let rows = normalizer().normalize(&payload, &LogId::from("l1")).unwrap();
        let stats = &rows[0].stats;
        assert_eq!(stats["Quickness (Group Generation/s)"], 0.5);
        assert_eq!(stats["Might (Group Generation/s)"], 3.5);
        assert_eq!(stats["Alacrity (Group Generation/s)"], 0.0);
        assert_eq!(stats["Quickness (Squad Generation/s)"], 0.0);
        assert!(!stats.keys().any(|k| k.contains("99999")));
    }

    #[test]
    fn test_unknown_numeric_fields_are_kept_raw() {
        let mut player = player_json("Alice", "alice.1234", "Firebrand", 1.0);
        player["statsAll"] = json!([{ "brandNewStat": 7, "swapCount": 3, "label": "x", "flag": true }]);
        let payload = fight_payload("2024-03-10 20:15:42 +01:00", 60_000, vec![player]);
        let rows = normalizer().normalize(&payload, &LogId::from("l1")).unwrap();
        let stats = &rows[0].stats;
        assert_eq!(stats["brandNewStat"], 7.0);
        assert_eq!(stats["Weapon Swaps"], 3.0);
        assert!(!stats.contains_key("label"));
        assert!(!stats.contains_key("flag"));
    }

    #[test]
    fn test_parse_time_start_formats() {
        let expected = DateTime::parse_from_rfc3339("2024-03-10T19:15:42Z").unwrap();
        assert_eq!(parse_time_start("2024-03-10 20:15:42 +01:00").unwrap(), expected);
        assert_eq!(parse_time_start("2024-03-10 20:15:42 +0100").unwrap(), expected);
        assert_eq!(parse_time_start("2024-03-10T20:15:42+01:00").unwrap(), expected);
    }
}
