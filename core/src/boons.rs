//! Boon definitions and generation column naming.

use std::sync::LazyLock;

/// How a boon accumulates on its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stacking {
    /// Stacks in duration; generation is reported as percent uptime produced
    Duration,
    /// Stacks in intensity; generation is reported as average stacks produced
    Intensity,
}

#[derive(Debug, Clone, Copy)]
pub struct Boon {
    pub id: u64,
    pub name: &'static str,
    pub stacking: Stacking,
}

pub const BOONS: [Boon; 12] = [
    Boon { id: 740, name: "Might", stacking: Stacking::Intensity },
    Boon { id: 725, name: "Fury", stacking: Stacking::Duration },
    Boon { id: 1187, name: "Quickness", stacking: Stacking::Duration },
    Boon { id: 30328, name: "Alacrity", stacking: Stacking::Duration },
    Boon { id: 717, name: "Protection", stacking: Stacking::Duration },
    Boon { id: 718, name: "Regeneration", stacking: Stacking::Duration },
    Boon { id: 726, name: "Vigor", stacking: Stacking::Duration },
    Boon { id: 743, name: "Aegis", stacking: Stacking::Duration },
    Boon { id: 1122, name: "Stability", stacking: Stacking::Intensity },
    Boon { id: 719, name: "Swiftness", stacking: Stacking::Duration },
    Boon { id: 26980, name: "Resistance", stacking: Stacking::Duration },
    Boon { id: 873, name: "Resolution", stacking: Stacking::Duration },
];

/// Who received the generated boon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationSource {
    Group,
    Squad,
    Own,
}

impl GenerationSource {
    pub const ALL: [GenerationSource; 3] =
        [GenerationSource::Group, GenerationSource::Squad, GenerationSource::Own];

    /// Player section in the report JSON holding this generation
    pub fn section(self) -> &'static str {
        match self {
            GenerationSource::Group => "groupBuffs",
            GenerationSource::Squad => "squadBuffs",
            GenerationSource::Own => "selfBuffs",
        }
    }

    /// Column-name suffix, including the leading space
    pub fn suffix(self) -> &'static str {
        match self {
            GenerationSource::Group => " (Group Generation/s)",
            GenerationSource::Squad => " (Squad Generation/s)",
            GenerationSource::Own => " (Self Generation/s)",
        }
    }
}

impl Boon {
    pub fn column(&self, source: GenerationSource) -> String {
        format!("{}{}", self.name, source.suffix())
    }

    /// Convert a raw `generation` value into boon-seconds (or stacks) per second
    pub fn generation_per_second(&self, generation: f64) -> f64 {
        match self.stacking {
            Stacking::Duration => generation / 100.0,
            Stacking::Intensity => generation,
        }
    }
}

static BOON_KEYS: LazyLock<Vec<String>> = LazyLock::new(|| {
    BOONS
        .iter()
        .flat_map(|boon| GenerationSource::ALL.into_iter().map(|source| boon.column(source)))
        .collect()
});

/// Every boon generation column, boon-major
pub fn boon_keys() -> &'static [String] {
    &BOON_KEYS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boon_keys_cover_every_boon_and_source() {
        let keys = boon_keys();
        assert_eq!(keys.len(), BOONS.len() * GenerationSource::ALL.len());
        assert_eq!(keys[0], "Might (Group Generation/s)");
        assert!(keys.contains(&"Alacrity (Self Generation/s)".to_string()));
    }

    #[test]
    fn test_generation_scaling() {
        let boon = |id| BOONS.iter().find(|b: &&Boon| b.id == id).unwrap();
        assert!((boon(1187).generation_per_second(45.0) - 0.45).abs() < 1e-9);
        assert!((boon(740).generation_per_second(4.2) - 4.2).abs() < 1e-9);
    }
}
