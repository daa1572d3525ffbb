//! Per-key bounded, insertion-ordered and deduplicated example storage

use std::fmt::Display;
use std::str::FromStr;

use fnv::FnvHashSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::annotation::Occurrence;

/// Identity used to bucket example occurrences
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModificationKey {
    /// `None` when keying on mass alone
    pub residue: Option<char>,
    pub mass_label: String,
}

impl Display for ModificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.residue {
            Some(r) => write!(f, "{}[{}]", r, self.mass_label),
            None => write!(f, "[{}]", self.mass_label),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// Bucket by residue and mass, so `N[203]` and `S[203]` are distinct
    #[default]
    ResidueMass,
    /// Bucket by mass alone
    Mass,
}

impl KeyMode {
    pub fn key(&self, occurrence: &Occurrence) -> ModificationKey {
        ModificationKey {
            residue: match self {
                KeyMode::ResidueMass => Some(occurrence.residue),
                KeyMode::Mass => None,
            },
            mass_label: occurrence.mass_label.clone(),
        }
    }
}

impl FromStr for KeyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "residue_mass" | "residue-mass" => Ok(KeyMode::ResidueMass),
            "mass" => Ok(KeyMode::Mass),
            _ => Err(format!("unrecognized key mode: {}", s)),
        }
    }
}

/// What makes an entry a duplicate of one already stored under the same key
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dedup {
    /// Same annotation string, regardless of which record it came from
    #[default]
    Annotation,
    /// Every field of the entry is equal
    Entry,
}

impl FromStr for Dedup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "annotation" => Ok(Dedup::Annotation),
            "entry" => Ok(Dedup::Entry),
            _ => Err(format!("unrecognized dedup policy: {}", s)),
        }
    }
}

/// A concrete, fully identified occurrence of a modification
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ExampleEntry {
    pub residue: char,
    pub mass_label: String,
    pub project_name: String,
    pub file_name: String,
    pub external_id: String,
    pub record_index: usize,
    pub annotation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Fingerprint {
    Annotation(String),
    Entry(ExampleEntry),
}

#[derive(Clone, Debug, Default)]
struct Bucket {
    entries: Vec<ExampleEntry>,
    seen: FnvHashSet<Fingerprint>,
}

/// Mapping of [`ModificationKey`] to at most `limit` distinct [`ExampleEntry`]s.
///
/// Keys are kept in the order they were first registered, and entries within a
/// key in the order they were successfully added. Membership checks go through
/// a hash set of fingerprints, so registration is O(1) amortized regardless of
/// `limit`.
#[derive(Clone, Debug)]
pub struct ExampleRegistry {
    limit: usize,
    dedup: Dedup,
    buckets: IndexMap<ModificationKey, Bucket>,
}

impl ExampleRegistry {
    pub fn new(limit: usize, dedup: Dedup) -> Self {
        Self {
            limit,
            dedup,
            buckets: IndexMap::new(),
        }
    }

    fn fingerprint(&self, entry: &ExampleEntry) -> Fingerprint {
        match self.dedup {
            Dedup::Annotation => Fingerprint::Annotation(entry.annotation.clone()),
            Dedup::Entry => Fingerprint::Entry(entry.clone()),
        }
    }

    /// Try to store `entry` under `key`. Returns `true` if the entry was added,
    /// and `false` (leaving the registry untouched) if the key is already full
    /// or the entry duplicates a stored one.
    pub fn register(&mut self, key: ModificationKey, entry: ExampleEntry) -> bool {
        let fingerprint = self.fingerprint(&entry);
        match self.buckets.get_mut(&key) {
            Some(bucket) => {
                if bucket.entries.len() >= self.limit || bucket.seen.contains(&fingerprint) {
                    return false;
                }
                bucket.seen.insert(fingerprint);
                bucket.entries.push(entry);
                true
            }
            None => {
                if self.limit == 0 {
                    return false;
                }
                let mut bucket = Bucket::default();
                bucket.seen.insert(fingerprint);
                bucket.entries.push(entry);
                self.buckets.insert(key, bucket);
                true
            }
        }
    }

    pub fn get(&self, key: &ModificationKey) -> Option<&[ExampleEntry]> {
        self.buckets.get(key).map(|b| b.entries.as_slice())
    }

    /// Number of distinct keys with at least one stored example
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of stored examples, across all keys
    pub fn examples(&self) -> usize {
        self.buckets.values().map(|b| b.entries.len()).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModificationKey> {
        self.buckets.keys()
    }

    /// Flatten into `(key, entry)` pairs, keys in first-seen order and entries
    /// in insertion order
    pub fn export(&self) -> impl Iterator<Item = (&ModificationKey, &ExampleEntry)> {
        self.buckets
            .iter()
            .flat_map(|(key, bucket)| bucket.entries.iter().map(move |entry| (key, entry)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn key(mass: &str) -> ModificationKey {
        ModificationKey {
            residue: None,
            mass_label: mass.into(),
        }
    }

    fn entry(annotation: &str, record_index: usize) -> ExampleEntry {
        ExampleEntry {
            residue: 'N',
            mass_label: "123".into(),
            project_name: "PROJECT1".into(),
            file_name: "file1.csv".into(),
            external_id: record_index.to_string(),
            record_index,
            annotation: annotation.into(),
        }
    }

    #[test]
    fn limit_enforced() {
        let mut registry = ExampleRegistry::new(2, Dedup::Annotation);
        assert!(registry.register(key("123"), entry("A[123]", 0)));
        assert!(registry.register(key("123"), entry("B[123]", 1)));
        assert!(!registry.register(key("123"), entry("C[123]", 2)));

        let stored = registry.get(&key("123")).unwrap();
        assert_eq!(stored, &[entry("A[123]", 0), entry("B[123]", 1)]);
    }

    #[test]
    fn identical_entry_skipped() {
        for dedup in [Dedup::Annotation, Dedup::Entry] {
            let mut registry = ExampleRegistry::new(5, dedup);
            assert!(registry.register(key("123"), entry("PEPN[123]K", 0)));
            assert!(!registry.register(key("123"), entry("PEPN[123]K", 0)));
            assert_eq!(registry.get(&key("123")).unwrap().len(), 1);
        }
    }

    #[test]
    fn annotation_dedup_ignores_record_identity() {
        let mut registry = ExampleRegistry::new(5, Dedup::Annotation);
        assert!(registry.register(key("123"), entry("PEPN[123]K", 0)));
        assert!(!registry.register(key("123"), entry("PEPN[123]K", 1)));
        assert!(registry.register(key("123"), entry("ANOTHERN[123]", 2)));
        assert_eq!(
            registry.get(&key("123")).unwrap(),
            &[entry("PEPN[123]K", 0), entry("ANOTHERN[123]", 2)]
        );

        let mut registry = ExampleRegistry::new(5, Dedup::Entry);
        assert!(registry.register(key("123"), entry("PEPN[123]K", 0)));
        assert!(registry.register(key("123"), entry("PEPN[123]K", 1)));
    }

    #[test]
    fn same_annotation_under_different_keys() {
        let mut registry = ExampleRegistry::new(5, Dedup::Annotation);
        assert!(registry.register(key("123"), entry("N[123]S[80]", 0)));
        assert!(registry.register(key("80"), entry("N[123]S[80]", 0)));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.examples(), 2);
    }

    #[test]
    fn zero_limit_creates_no_keys() {
        let mut registry = ExampleRegistry::new(0, Dedup::Annotation);
        assert!(!registry.register(key("123"), entry("A[123]", 0)));
        assert!(registry.is_empty());
        assert!(registry.get(&key("123")).is_none());
    }

    #[test]
    fn export_order() {
        let mut registry = ExampleRegistry::new(3, Dedup::Annotation);
        registry.register(key("2"), entry("X[2]", 0));
        registry.register(key("1"), entry("X[1]", 1));
        registry.register(key("2"), entry("Y[2]", 2));
        registry.register(key("1"), entry("Y[1]", 3));
        registry.register(key("3"), entry("X[3]", 4));

        let rows = registry
            .export()
            .map(|(k, e)| (k.mass_label.as_str(), e.record_index))
            .collect::<Vec<_>>();
        assert_eq!(rows, vec![("2", 0), ("2", 2), ("1", 1), ("1", 3), ("3", 4)]);
        assert_eq!(
            registry.keys().map(|k| k.to_string()).collect::<Vec<_>>(),
            vec!["[2]", "[1]", "[3]"]
        );
    }

    #[test]
    fn key_modes() {
        let occ = Occurrence {
            residue: 'N',
            mass_label: "1152".into(),
        };
        assert_eq!(KeyMode::ResidueMass.key(&occ).to_string(), "N[1152]");
        assert_eq!(KeyMode::Mass.key(&occ).to_string(), "[1152]");
        assert_eq!("mass".parse::<KeyMode>(), Ok(KeyMode::Mass));
        assert_eq!("residue_mass".parse::<KeyMode>(), Ok(KeyMode::ResidueMass));
        assert!("residue".parse::<KeyMode>().is_err());
    }

    /// Replay a random sequence of registrations, drawn from a small pool of
    /// keys and annotations so that collisions are frequent
    fn replay(ops: &[(u8, u8, u8)], limit: usize, dedup: Dedup) -> (ExampleRegistry, Vec<bool>) {
        let mut registry = ExampleRegistry::new(limit, dedup);
        let added = ops
            .iter()
            .map(|&(k, a, r)| {
                let mut e = entry(&format!("PEP[{}]", a % 4), (r % 3) as usize);
                e.mass_label = (k % 5).to_string();
                let k = key(&e.mass_label);
                registry.register(k, e)
            })
            .collect();
        (registry, added)
    }

    #[quickcheck]
    fn bounded_and_distinct(ops: Vec<(u8, u8, u8)>, limit: u8, entry_dedup: bool) -> bool {
        let limit = (limit % 6) as usize;
        let dedup = if entry_dedup { Dedup::Entry } else { Dedup::Annotation };
        let (registry, _) = replay(&ops, limit, dedup);

        let valid = registry.keys().all(|k| {
            let stored = registry.get(k).unwrap();
            let unique = stored.iter().collect::<std::collections::HashSet<_>>();
            stored.len() <= limit && unique.len() == stored.len()
        });
        valid
    }

    #[quickcheck]
    fn insertion_order_preserved(ops: Vec<(u8, u8, u8)>, limit: u8) -> bool {
        let limit = (limit % 6) as usize;
        let (registry, added) = replay(&ops, limit, Dedup::Entry);

        // Rebuild the expected per-key order from the successful registrations
        let mut expected: IndexMap<String, Vec<(String, usize)>> = IndexMap::new();
        for (&(k, a, r), ok) in ops.iter().zip(added.iter()) {
            if *ok {
                expected
                    .entry((k % 5).to_string())
                    .or_default()
                    .push((format!("PEP[{}]", a % 4), (r % 3) as usize));
            }
        }

        let exported = registry
            .export()
            .map(|(k, e)| (k.mass_label.clone(), (e.annotation.clone(), e.record_index)))
            .collect::<Vec<_>>();
        let flattened = expected
            .into_iter()
            .flat_map(|(k, v)| v.into_iter().map(move |x| (k.clone(), x)))
            .collect::<Vec<_>>();

        exported == flattened && registry.examples() == added.iter().filter(|&&x| x).count()
    }
}
