//! Treatment matching
//!
//! Free-text treatment fields are resolved against the catalog in three steps:
//! alias canonicalization, exact normalized-name match, then substring search.
//! A substring search with several hits only succeeds when one name is strictly
//! the longest and contains every other hit ("resina" inside "resina compuesta");
//! anything else is reported as ambiguous so the record can be reviewed.

use crate::models::{MatchQuality, Treatment, TreatmentCost};
use crate::normalize::normalize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Versioned mapping from spelling variants to catalog names
///
/// Both sides are stored normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasTable {
    version: u32,
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub const BUILTIN_VERSION: u32 = 1;

    /// Empty table with the given version
    pub fn new(version: u32) -> Self {
        Self {
            version,
            entries: BTreeMap::new(),
        }
    }

    /// Variants seen in reception notes and in the external system
    pub fn builtin() -> Self {
        [
            ("limpieza", "profilaxis"),
            ("limpieza dental", "profilaxis"),
            ("destartraje", "profilaxis"),
            ("calza", "resina"),
            ("obturacion", "resina"),
            ("restauracion", "resina"),
            ("extraccion", "exodoncia"),
            ("extraccion simple", "exodoncia"),
            ("blanqueamiento dental", "blanqueamiento"),
            ("control brackets", "control de ortodoncia"),
            ("control ortodoncia", "control de ortodoncia"),
            ("diseno sonrisa", "diseno de sonrisa"),
            ("carillas", "carilla"),
            ("rx", "radiografia"),
            ("radiografia periapical", "radiografia"),
            ("consulta", "valoracion"),
            ("implante dental", "implante"),
        ]
        .into_iter()
        .fold(Self::new(Self::BUILTIN_VERSION), |table, (variant, canonical)| {
            table.with_alias(variant, canonical)
        })
    }

    pub fn with_alias(mut self, variant: &str, canonical: &str) -> Self {
        self.entries.insert(normalize(variant), normalize(canonical));
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical name for an already-normalized input, if it is a known variant
    pub fn canonicalize(&self, normalized: &str) -> Option<&str> {
        self.entries.get(normalized).map(String::as_str)
    }

    /// Normalize and canonicalize; the lookup key used for treatments and cost overrides
    pub fn key_for(&self, name: &str) -> String {
        let normalized = normalize(name);
        match self.canonicalize(&normalized) {
            Some(canonical) => canonical.to_string(),
            None => normalized,
        }
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Catalog treatment with its cost override merged in
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTreatment {
    pub key: String,
    pub treatment: Treatment,
    pub cost: Option<TreatmentCost>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentMatch<'a> {
    pub treatment: Option<&'a CatalogTreatment>,
    pub quality: MatchQuality,
    /// Competing catalog names when the match is ambiguous
    pub candidates: Vec<String>,
}

impl<'a> TreatmentMatch<'a> {
    fn found(entry: &'a CatalogTreatment, quality: MatchQuality) -> Self {
        Self {
            treatment: Some(entry),
            quality,
            candidates: Vec::new(),
        }
    }

    fn unmatched() -> Self {
        Self {
            treatment: None,
            quality: MatchQuality::Unmatched,
            candidates: Vec::new(),
        }
    }
}

/// Resolves free-text treatment fields against the catalog
#[derive(Debug, Clone)]
pub struct TreatmentMatcher {
    aliases: AliasTable,
    entries: Vec<CatalogTreatment>,
}

impl TreatmentMatcher {
    /// Build the catalog, merging cost overrides by normalized (aliased) name
    pub fn new(treatments: Vec<Treatment>, costs: Vec<TreatmentCost>, aliases: AliasTable) -> Self {
        let mut costs_by_key: BTreeMap<String, TreatmentCost> = BTreeMap::new();
        for cost in costs {
            costs_by_key.insert(aliases.key_for(&cost.key), cost);
        }

        let mut entries: Vec<CatalogTreatment> = Vec::with_capacity(treatments.len());
        for treatment in treatments {
            let key = aliases.key_for(&treatment.name);
            if key.is_empty() {
                warn!(name = %treatment.name, "Skipping catalog treatment with blank name");
                continue;
            }
            if entries.iter().any(|e| e.key == key) {
                warn!(name = %treatment.name, key = %key, "Duplicate catalog treatment ignored");
                continue;
            }
            let cost = costs_by_key.remove(&key);
            entries.push(CatalogTreatment { key, treatment, cost });
        }

        for orphan in costs_by_key.keys() {
            debug!(key = %orphan, "Cost override has no catalog treatment");
        }

        Self { aliases, entries }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn entries(&self) -> &[CatalogTreatment] {
        &self.entries
    }

    pub fn find(&self, text: &str) -> TreatmentMatch<'_> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return TreatmentMatch::unmatched();
        }

        let (lookup, aliased) = match self.aliases.canonicalize(&normalized) {
            Some(canonical) => (canonical.to_string(), true),
            None => (normalized, false),
        };

        if let Some(entry) = self.entries.iter().find(|e| e.key == lookup) {
            let quality = if aliased { MatchQuality::Alias } else { MatchQuality::Exact };
            return TreatmentMatch::found(entry, quality);
        }

        let hits: Vec<&CatalogTreatment> = self
            .entries
            .iter()
            .filter(|e| lookup.contains(e.key.as_str()))
            .collect();

        match hits.as_slice() {
            [] => TreatmentMatch::unmatched(),
            [only] => TreatmentMatch::found(only, MatchQuality::Substring),
            _ => match dominant_hit(&hits) {
                Some(entry) => TreatmentMatch::found(entry, MatchQuality::Substring),
                None => TreatmentMatch {
                    treatment: None,
                    quality: MatchQuality::Ambiguous,
                    candidates: hits.iter().map(|e| e.treatment.name.clone()).collect(),
                },
            },
        }
    }
}

/// The strictly longest hit, provided it contains every other hit
fn dominant_hit<'a>(hits: &[&'a CatalogTreatment]) -> Option<&'a CatalogTreatment> {
    let longest = *hits.iter().max_by_key(|e| e.key.chars().count())?;
    let longest_len = longest.key.chars().count();
    let dominates = hits
        .iter()
        .filter(|e| !std::ptr::eq(**e, longest))
        .all(|e| e.key.chars().count() < longest_len && longest.key.contains(e.key.as_str()));
    dominates.then_some(longest)
}
