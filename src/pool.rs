use color_eyre::eyre::Result;
use itertools::Itertools;
use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;
use url::Url;

/// Rarity tiers in ascending order. Declaration order is the stable walk
/// order for weighted sampling and the sort order for display.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
    Mythical,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Legendary,
        Rarity::Mythical,
    ];

    pub fn parse(raw: &str) -> Option<Rarity> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "common" => Some(Rarity::Common),
            "uncommon" => Some(Rarity::Uncommon),
            "rare" => Some(Rarity::Rare),
            "legendary" => Some(Rarity::Legendary),
            "mythical" => Some(Rarity::Mythical),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
            Rarity::Mythical => "Mythical",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolItem {
    pub name: String,
    pub rarity: Rarity,
    pub tradable: bool,
}

/// One entry as the upstream API serves it. Historical API variants disagree
/// on the spelling of the tradable flag and ship rarity as a free string, so
/// everything is normalized into `PoolItem` right here and the raw shape
/// never leaves this module.
#[derive(Debug, Deserialize)]
pub struct RawPoolEntry {
    pub name: String,
    pub rarity: String,
    #[serde(default, alias = "tradeable", alias = "isTradable")]
    pub tradable: Option<bool>,
}

// Legacy upstream names mapped to their current canonical spelling. The
// first matching entry wins; unlisted names are already canonical.
const NAME_ALIASES: [(&str, &str); 3] = [
    ("Rumble", "Lightning"),
    ("Door", "Portal"),
    ("String", "Blade"),
];

fn canonical_name(raw: &str) -> String {
    let trimmed = raw.trim();
    for (legacy, canonical) in NAME_ALIASES {
        if trimmed.eq_ignore_ascii_case(legacy) {
            return canonical.to_string();
        }
    }
    trimmed.to_string()
}

pub fn normalize(entries: Vec<RawPoolEntry>) -> Vec<PoolItem> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let name = canonical_name(&entry.name);
            if name.is_empty() {
                return None;
            }
            let Some(rarity) = Rarity::parse(&entry.rarity) else {
                tracing::warn!(%name, rarity = %entry.rarity, "dropping unknown rarity");
                return None;
            };
            Some(PoolItem {
                name,
                rarity,
                tradable: entry.tradable.unwrap_or(true),
            })
        })
        .unique_by(|item| item.name.clone())
        .collect()
}

/// The current set of drawable items, sorted by rarity then name so each
/// tier is a contiguous slice. Items are borrowed by the sampler and the
/// UI; only names are copied into long-lived state.
#[derive(Clone, Debug)]
pub struct Pool {
    items: Vec<PoolItem>,
    degraded: bool,
}

impl Pool {
    pub fn new(mut items: Vec<PoolItem>, degraded: bool) -> Self {
        items.sort_by(|a, b| a.rarity.cmp(&b.rarity).then_with(|| a.name.cmp(&b.name)));
        Self { items, degraded }
    }

    pub fn items(&self) -> &[PoolItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the built-in fallback replaced a failed fetch.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    pub fn tier(&self, rarity: Rarity) -> &[PoolItem] {
        let start = self.items.partition_point(|item| item.rarity < rarity);
        let end = self.items.partition_point(|item| item.rarity <= rarity);
        &self.items[start..end]
    }
}

pub trait PoolSource {
    fn fetch(&self) -> impl Future<Output = Result<Vec<RawPoolEntry>>>;
}

pub struct HttpPoolSource {
    client: Client,
    url: Url,
}

impl HttpPoolSource {
    pub fn new(url: Url) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

impl PoolSource for HttpPoolSource {
    async fn fetch(&self) -> Result<Vec<RawPoolEntry>> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Fetch the pool, substituting the built-in fallback when the source is
/// unreachable. Fetch failures are logged, never raised; the degraded flag
/// tells the caller which pool it got.
pub async fn load_pool(source: &impl PoolSource) -> Pool {
    match source.fetch().await {
        Ok(raw) => Pool::new(normalize(raw), false),
        Err(error) => {
            tracing::warn!(%error, "pool fetch failed, using fallback pool");
            Pool::new(fallback_items(), true)
        }
    }
}

/// Fixed offline pool with at least one item per tier.
pub fn fallback_items() -> Vec<PoolItem> {
    let fixed = [
        ("Smoke", Rarity::Common),
        ("Flame", Rarity::Uncommon),
        ("Light", Rarity::Rare),
        ("Buddha", Rarity::Legendary),
        ("Dough", Rarity::Mythical),
        ("Dragon", Rarity::Mythical),
    ];
    fixed
        .into_iter()
        .map(|(name, rarity)| PoolItem {
            name: name.to_string(),
            rarity,
            tradable: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    fn raw(name: &str, rarity: &str) -> RawPoolEntry {
        RawPoolEntry {
            name: name.to_string(),
            rarity: rarity.to_string(),
            tradable: None,
        }
    }

    #[test]
    fn normalize__drops_unknown_rarities_and_duplicate_names() {
        // given
        let entries = vec![
            raw("Smoke", "Common"),
            raw("Smoke", "Common"),
            raw("Glitch", "Secret"),
            raw("Dough", "Mythical"),
        ];

        // when
        let items = normalize(entries);

        // then
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Smoke", "Dough"]);
    }

    #[test]
    fn normalize__resolves_legacy_name_aliases() {
        // given
        let entries = vec![raw("Rumble", "Legendary"), raw(" Dragon ", "Mythical")];

        // when
        let items = normalize(entries);

        // then
        assert_eq!(items[0].name, "Lightning");
        assert_eq!(items[1].name, "Dragon");
    }

    #[test]
    fn normalize__accepts_any_spelling_of_the_tradable_flag() {
        // given
        let payload = r#"[
            {"name": "Smoke", "rarity": "Common", "tradable": false},
            {"name": "Flame", "rarity": "Uncommon", "tradeable": false},
            {"name": "Light", "rarity": "Rare", "isTradable": false},
            {"name": "Dough", "rarity": "Mythical"}
        ]"#;
        let entries: Vec<RawPoolEntry> = serde_json::from_str(payload).unwrap();

        // when
        let items = normalize(entries);

        // then
        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(|i| !i.tradable));
        assert!(items[3].tradable);
    }

    #[test]
    fn pool__sorts_by_rarity_then_name_and_groups_tiers() {
        // given
        let pool = Pool::new(fallback_items(), false);

        // then
        let names: Vec<&str> = pool.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Smoke", "Flame", "Light", "Buddha", "Dough", "Dragon"]
        );
        assert_eq!(pool.tier(Rarity::Mythical).len(), 2);
        assert!(pool.tier(Rarity::Common).iter().all(|i| i.rarity == Rarity::Common));
    }

    #[test]
    fn fallback_items__covers_every_tier() {
        let pool = Pool::new(fallback_items(), true);
        for rarity in Rarity::ALL {
            assert!(!pool.tier(rarity).is_empty(), "no fallback item for {rarity}");
        }
    }

    struct FailingSource;

    impl PoolSource for FailingSource {
        async fn fetch(&self) -> Result<Vec<RawPoolEntry>> {
            Err(color_eyre::eyre::eyre!("connection refused"))
        }
    }

    #[tokio::test]
    async fn load_pool__substitutes_fallback_when_fetch_fails() {
        // when
        let pool = load_pool(&FailingSource).await;

        // then
        assert!(pool.degraded());
        assert!(!pool.is_empty());
    }
}
