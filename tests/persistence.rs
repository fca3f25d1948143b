#![allow(non_snake_case)]

use fruit_gacha::{
    GachaEngine,
    Pool,
    SledSaveStore,
    persist::{
        SAVE_KEY,
        SaveRecord,
        load_or_default,
        persist,
    },
    pool::fallback_items,
    store::SaveStore,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use tempdir::TempDir;

fn sled_engine(path: &std::path::Path, seed: u64) -> GachaEngine<SledSaveStore> {
    let store = SledSaveStore::open(path).unwrap();
    let pool = Pool::new(fallback_items(), false);
    GachaEngine::with_pool(pool, store, StdRng::seed_from_u64(seed)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn sut__when_process_restarts_then_rolls_survive_on_disk() {
    // given
    let temp_dir = TempDir::new("gacha_restart").unwrap();
    let inventory_before = {
        let mut sut = sled_engine(temp_dir.path(), 1);
        sut.run_roll(7).await.unwrap();
        sut.inventory().clone()
    };

    // when: a fresh engine opens the same database
    let sut = sled_engine(temp_dir.path(), 2);

    // then
    assert_eq!(sut.stats().total_rolls, 7);
    assert_eq!(sut.inventory(), &inventory_before);
}

#[tokio::test(start_paused = true)]
async fn sut__when_save_is_corrupt_then_engine_starts_empty_without_failing() {
    // given: garbage under the save key
    let temp_dir = TempDir::new("gacha_corrupt").unwrap();
    {
        let mut store = SledSaveStore::open(temp_dir.path()).unwrap();
        store.write(SAVE_KEY, b"\xff\xfenot json at all").unwrap();
    }

    // when
    let sut = sled_engine(temp_dir.path(), 3);

    // then
    assert_eq!(sut.stats().total_rolls, 0);
    assert!(sut.inventory().is_empty());
}

#[tokio::test(start_paused = true)]
async fn sut__when_schema_version_is_foreign_then_record_is_wholly_discarded() {
    // given: a structurally valid record from some future version
    let temp_dir = TempDir::new("gacha_version").unwrap();
    {
        let mut store = SledSaveStore::open(temp_dir.path()).unwrap();
        let payload = br#"{"v":9,"inventory":{"Dough":42},"stats":{"totalRolls":42,"byRarity":{"Mythical":42}}}"#;
        store.write(SAVE_KEY, payload).unwrap();
    }

    // when
    let sut = sled_engine(temp_dir.path(), 4);

    // then: no partial merge of the recognizable pieces
    assert_eq!(sut.stats().total_rolls, 0);
    assert!(sut.inventory().get("Dough").is_none());
}

#[test]
fn load__immediately_after_save_returns_a_deep_equal_record() {
    // given
    let temp_dir = TempDir::new("gacha_roundtrip").unwrap();
    let mut store = SledSaveStore::open(temp_dir.path()).unwrap();
    let mut ledger = SaveRecord::default().into_ledger();
    ledger.adjust("Buddha", 2);

    // when
    persist(&mut store, &ledger).unwrap();
    let loaded = load_or_default(&store);

    // then
    assert_eq!(loaded, SaveRecord::of(&ledger));
}
