// Versioned serialization of the save record. Anything that fails strict
// validation is discarded wholesale; a partially repaired record could
// break the totals invariant.
use crate::{
    error::GachaError,
    ledger::{
        Inventory,
        Ledger,
        Stats,
    },
    store::SaveStore,
};
use color_eyre::eyre::Result;
use serde::{
    Deserialize,
    Serialize,
};

pub const SAVE_KEY: &str = "gacha-inventory-v1";
pub const DEBUG_KEY: &str = "gacha-debug";
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub v: u32,
    pub inventory: Inventory,
    pub stats: Stats,
}

impl Default for SaveRecord {
    fn default() -> Self {
        Self {
            v: SCHEMA_VERSION,
            inventory: Inventory::new(),
            stats: Stats::default(),
        }
    }
}

impl SaveRecord {
    pub fn of(ledger: &Ledger) -> Self {
        Self {
            v: SCHEMA_VERSION,
            inventory: ledger.inventory().clone(),
            stats: ledger.stats().clone(),
        }
    }

    pub fn into_ledger(self) -> Ledger {
        Ledger::new(self.inventory, self.stats)
    }
}

pub fn decode_save(bytes: &[u8]) -> Result<SaveRecord, GachaError> {
    let record: SaveRecord = serde_json::from_slice(bytes)
        .map_err(|e| GachaError::StorageCorrupt(e.to_string()))?;
    if record.v != SCHEMA_VERSION {
        return Err(GachaError::StorageCorrupt(format!(
            "unsupported schema version {}",
            record.v
        )));
    }
    Ok(record)
}

/// Load the save record, falling back to an empty default on any missing,
/// unreadable, or version-mismatched record. Corruption is a warning here,
/// never an error to the caller.
pub fn load_or_default<S: SaveStore>(store: &S) -> SaveRecord {
    let bytes = match store.read(SAVE_KEY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return SaveRecord::default(),
        Err(error) => {
            tracing::warn!(%error, "save store unreadable, starting empty");
            return SaveRecord::default();
        }
    };
    match decode_save(&bytes) {
        Ok(record) => record,
        Err(error) => {
            tracing::warn!(%error, "discarding corrupt save record");
            SaveRecord::default()
        }
    }
}

/// Serialize the ledger and write it out immediately. Invoked after every
/// accumulator mutation; write volume is bounded by the user's click rate.
pub fn persist<S: SaveStore>(store: &mut S, ledger: &Ledger) -> Result<()> {
    let bytes = serde_json::to_vec(&SaveRecord::of(ledger))?;
    store.write(SAVE_KEY, &bytes)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::{
        pool::{
            PoolItem,
            Rarity,
        },
        store::InMemorySaveStore,
    };

    fn ledger_with_one_roll() -> Ledger {
        let mut ledger = Ledger::default();
        ledger.record(&PoolItem {
            name: "Buddha".to_string(),
            rarity: Rarity::Legendary,
            tradable: true,
        });
        ledger
    }

    #[test]
    fn load_or_default__returns_what_was_last_persisted() {
        // given
        let mut store = InMemorySaveStore::new();
        let ledger = ledger_with_one_roll();

        // when
        persist(&mut store, &ledger).unwrap();

        // then
        let loaded = load_or_default(&store);
        assert_eq!(loaded, SaveRecord::of(&ledger));
    }

    #[test]
    fn load_or_default__empty_store_yields_default_record() {
        let store = InMemorySaveStore::new();

        let loaded = load_or_default(&store);

        assert_eq!(loaded, SaveRecord::default());
        assert_eq!(loaded.stats.total_rolls, 0);
    }

    #[test]
    fn load_or_default__version_mismatch_discards_the_whole_record() {
        // given: a well-formed record at a future schema version
        let mut store = InMemorySaveStore::new();
        let payload =
            br#"{"v":2,"inventory":{"Dough":3},"stats":{"totalRolls":3,"byRarity":{"Mythical":3}}}"#;
        store.write(SAVE_KEY, payload).unwrap();

        // when
        let loaded = load_or_default(&store);

        // then: no partial merge of the recognizable fields
        assert_eq!(loaded, SaveRecord::default());
    }

    #[test]
    fn load_or_default__parse_failure_yields_default_record() {
        let mut store = InMemorySaveStore::new();
        store.write(SAVE_KEY, b"{not json").unwrap();

        assert_eq!(load_or_default(&store), SaveRecord::default());
    }

    #[test]
    fn decode_save__missing_keys_are_corrupt() {
        let result = decode_save(br#"{"v":1,"inventory":{}}"#);

        assert!(matches!(result, Err(GachaError::StorageCorrupt(_))));
    }

    #[test]
    fn persist__wire_shape_matches_the_published_schema() {
        // given
        let mut store = InMemorySaveStore::new();
        let ledger = ledger_with_one_roll();

        // when
        persist(&mut store, &ledger).unwrap();

        // then
        let raw = store.read(SAVE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["v"], 1);
        assert_eq!(value["inventory"]["Buddha"], 1);
        assert_eq!(value["stats"]["totalRolls"], 1);
        assert_eq!(value["stats"]["byRarity"]["Legendary"], 1);
    }
}
