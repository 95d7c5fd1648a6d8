//! Three name-keyed dictionaries — CONTIG, ID (the union of INFO/FILTER/
//! FORMAT declarations) and SAMPLE — each assigning a dense, stable integer
//! id in insertion order. `IndexMap` already gives O(1) id->entry lookup by
//! construction (its iteration order is insertion order), but the spec
//! calls for an explicit post-parse `sync` step that materializes the
//! reverse-lookup tables, so `sync` snapshots into plain `Vec`s rather than
//! reaching into the live maps on every lookup.

use indexmap::IndexMap;

/// Which of the three possible declaration sites an ID dictionary entry's
/// `info` word occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Filter = 0,
    Info = 1,
    Format = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Flag = 0,
    Int = 1,
    Float = 2,
    String = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Fixed = 0,
    PerAlt = 1,
    PerGenotype = 2,
    Variable = 3,
}

/// Sentinel `info[site]` value meaning "no declaration in this site": the
/// site field holds all ones (15), every other field zero.
pub const NO_DECLARATION: u32 = 0x0000_000F;
const VARIABLE_COUNT_SENTINEL: u32 = 0xFFFFF;

/// One packed declaration, normalized per the bit-layout invariants: a FLAG
/// always has count 0 and FIXED cardinality; a declared count of 0 forces
/// the value type to FLAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub site: Site,
    pub value_type: ValueType,
    pub cardinality: Cardinality,
    /// `None` for non-FIXED cardinality kinds (the count field carries the
    /// sentinel on the wire).
    pub count: Option<u32>,
}

impl Declaration {
    pub fn new(
        site: Site,
        value_type: ValueType,
        cardinality: Cardinality,
        count: Option<u32>,
    ) -> Self {
        let mut value_type = value_type;
        let mut count = count;
        if value_type == ValueType::Flag {
            count = Some(0);
        }
        if count == Some(0) {
            value_type = ValueType::Flag;
        }
        let cardinality = if value_type == ValueType::Flag {
            Cardinality::Fixed
        } else {
            cardinality
        };
        Declaration {
            site,
            value_type,
            cardinality,
            count,
        }
    }

    pub fn pack(self) -> u32 {
        let site = self.site as u32;
        let value_type = self.value_type as u32;
        let cardinality = self.cardinality as u32;
        let count = match self.cardinality {
            Cardinality::Fixed => self.count.unwrap_or(0),
            _ => VARIABLE_COUNT_SENTINEL,
        };
        site | (value_type << 4) | (cardinality << 8) | (count << 12)
    }

    pub fn unpack(word: u32) -> Option<Declaration> {
        if word == NO_DECLARATION {
            return None;
        }
        let site = match word & 0xF {
            0 => Site::Filter,
            1 => Site::Info,
            2 => Site::Format,
            _ => return None,
        };
        let value_type = match (word >> 4) & 0xF {
            0 => ValueType::Flag,
            1 => ValueType::Int,
            2 => ValueType::Float,
            3 => ValueType::String,
            _ => return None,
        };
        let cardinality = match (word >> 8) & 0xF {
            0 => Cardinality::Fixed,
            1 => Cardinality::PerAlt,
            2 => Cardinality::PerGenotype,
            _ => Cardinality::Variable,
        };
        let raw_count = word >> 12;
        let count = if cardinality == Cardinality::Fixed {
            Some(raw_count)
        } else {
            None
        };
        Some(Declaration {
            site,
            value_type,
            cardinality,
            count,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContigMeta {
    pub length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMeta {
    /// Indexed by `Site as usize`; `NO_DECLARATION` when absent.
    pub info: [u32; 3],
}

impl IdMeta {
    fn empty() -> Self {
        IdMeta {
            info: [NO_DECLARATION; 3],
        }
    }

    pub fn declaration(&self, site: Site) -> Option<Declaration> {
        Declaration::unpack(self.info[site as usize])
    }
}

#[derive(Debug, Default)]
pub struct Dictionary {
    contigs: IndexMap<String, ContigMeta>,
    ids: IndexMap<String, IdMeta>,
    samples: IndexMap<String, ()>,
    contig_rev: Vec<(String, ContigMeta)>,
    id_rev: Vec<(String, IdMeta)>,
    sample_rev: Vec<String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_contig(&mut self, name: &str, length: u32) -> (u32, bool) {
        if let Some(idx) = self.contigs.get_index_of(name) {
            log::warn!("duplicate contig {name:?}, first occurrence wins");
            return (idx as u32, false);
        }
        self.contigs.insert(name.to_string(), ContigMeta { length });
        ((self.contigs.len() - 1) as u32, true)
    }

    pub fn put_id(&mut self, name: &str, declaration: Declaration) -> (u32, bool) {
        if let Some(idx) = self.ids.get_index_of(name) {
            let (_, meta) = self.ids.get_index_mut(idx).expect("idx came from get_index_of");
            meta.info[declaration.site as usize] = declaration.pack();
            return (idx as u32, false);
        }
        let mut meta = IdMeta::empty();
        meta.info[declaration.site as usize] = declaration.pack();
        self.ids.insert(name.to_string(), meta);
        ((self.ids.len() - 1) as u32, true)
    }

    pub fn put_sample(&mut self, name: &str) -> (u32, bool) {
        if let Some(idx) = self.samples.get_index_of(name) {
            log::warn!("duplicate sample {name:?}, first occurrence wins");
            return (idx as u32, false);
        }
        self.samples.insert(name.to_string(), ());
        ((self.samples.len() - 1) as u32, true)
    }

    pub fn get_contig(&self, name: &str) -> Option<(u32, ContigMeta)> {
        self.contigs
            .get_index_of(name)
            .map(|idx| (idx as u32, self.contigs[idx]))
    }

    pub fn get_id(&self, name: &str) -> Option<(u32, IdMeta)> {
        self.ids
            .get_index_of(name)
            .map(|idx| (idx as u32, self.ids[idx]))
    }

    pub fn get_sample(&self, name: &str) -> Option<u32> {
        self.samples.get_index_of(name).map(|idx| idx as u32)
    }

    pub fn n_contigs(&self) -> usize {
        self.contigs.len()
    }

    pub fn n_ids(&self) -> usize {
        self.ids.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Ensures the FILTER entry `PASS` exists, inserting it (with whatever
    /// id that leaves it at) if absent. Must run before samples are added,
    /// so its id is predictable relative to declared INFO/FORMAT entries.
    pub fn insert_pass_if_missing(&mut self) {
        if self.get_id("PASS").is_none() {
            self.put_id(
                "PASS",
                Declaration::new(Site::Filter, ValueType::Flag, Cardinality::Fixed, Some(0)),
            );
        }
    }

    /// Rebuilds the id-indexed reverse-lookup tables. Idempotent: calling
    /// this twice in a row without intervening `put`s yields identical
    /// tables.
    pub fn sync(&mut self) {
        self.contig_rev = self
            .contigs
            .iter()
            .map(|(name, meta)| (name.clone(), *meta))
            .collect();
        self.id_rev = self
            .ids
            .iter()
            .map(|(name, meta)| (name.clone(), *meta))
            .collect();
        self.sample_rev = self.samples.keys().cloned().collect();
    }

    pub fn contig_name(&self, id: u32) -> Option<&str> {
        self.contig_rev.get(id as usize).map(|(n, _)| n.as_str())
    }

    pub fn contig_meta(&self, id: u32) -> Option<ContigMeta> {
        self.contig_rev.get(id as usize).map(|(_, m)| *m)
    }

    pub fn id_name(&self, id: u32) -> Option<&str> {
        self.id_rev.get(id as usize).map(|(n, _)| n.as_str())
    }

    pub fn id_meta(&self, id: u32) -> Option<IdMeta> {
        self.id_rev.get(id as usize).map(|(_, m)| *m)
    }

    pub fn sample_name(&self, id: u32) -> Option<&str> {
        self.sample_rev.get(id as usize).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_after_sync() {
        let mut dict = Dictionary::new();
        dict.put_id(
            "DP",
            Declaration::new(Site::Info, ValueType::Int, Cardinality::Fixed, Some(1)),
        );
        dict.insert_pass_if_missing();
        dict.put_sample("S1");
        dict.put_sample("S2");
        dict.sync();

        assert_eq!(dict.id_name(0), Some("DP"));
        assert_eq!(dict.id_name(1), Some("PASS"));
        assert_eq!(dict.sample_name(0), Some("S1"));
        assert_eq!(dict.sample_name(1), Some("S2"));
    }

    #[test]
    fn duplicate_contig_first_wins() {
        let mut dict = Dictionary::new();
        let (id1, inserted1) = dict.put_contig("chr1", 100);
        let (id2, inserted2) = dict.put_contig("chr1", 200);
        assert!(inserted1);
        assert!(!inserted2);
        assert_eq!(id1, id2);
        assert_eq!(dict.get_contig("chr1").unwrap().1.length, 100);
    }

    #[test]
    fn duplicate_sample_first_wins() {
        let mut dict = Dictionary::new();
        let (id1, _) = dict.put_sample("S1");
        let (id2, inserted) = dict.put_sample("S1");
        assert!(!inserted);
        assert_eq!(id1, id2);
    }

    #[test]
    fn id_sites_merge_rather_than_skip() {
        let mut dict = Dictionary::new();
        dict.put_id(
            "DP",
            Declaration::new(Site::Info, ValueType::Int, Cardinality::Fixed, Some(1)),
        );
        dict.put_id(
            "DP",
            Declaration::new(Site::Format, ValueType::Int, Cardinality::Fixed, Some(1)),
        );
        let (_, meta) = dict.get_id("DP").unwrap();
        assert!(meta.declaration(Site::Info).is_some());
        assert!(meta.declaration(Site::Format).is_some());
        assert!(meta.declaration(Site::Filter).is_none());
    }

    #[test]
    fn pass_implicitly_inserted() {
        let mut dict = Dictionary::new();
        dict.insert_pass_if_missing();
        let (_, meta) = dict.get_id("PASS").unwrap();
        let decl = meta.declaration(Site::Filter).unwrap();
        assert_eq!(decl.value_type, ValueType::Flag);
    }

    #[test]
    fn pass_not_duplicated_if_declared() {
        let mut dict = Dictionary::new();
        dict.put_id(
            "PASS",
            Declaration::new(Site::Filter, ValueType::Flag, Cardinality::Fixed, Some(0)),
        );
        dict.insert_pass_if_missing();
        assert_eq!(dict.n_ids(), 1);
    }

    #[test]
    fn sync_is_idempotent() {
        let mut dict = Dictionary::new();
        dict.put_contig("chr1", 100);
        dict.sync();
        let first: Vec<_> = dict.contig_rev.clone();
        dict.sync();
        let second: Vec<_> = dict.contig_rev.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn flag_forces_zero_count_and_fixed_cardinality() {
        let decl = Declaration::new(Site::Info, ValueType::Flag, Cardinality::Variable, Some(3));
        assert_eq!(decl.count, Some(0));
        assert_eq!(decl.cardinality, Cardinality::Fixed);
    }

    #[test]
    fn zero_count_forces_flag() {
        let decl = Declaration::new(Site::Info, ValueType::Int, Cardinality::Fixed, Some(0));
        assert_eq!(decl.value_type, ValueType::Flag);
    }

    #[test]
    fn declaration_pack_unpack_roundtrip() {
        let decl = Declaration::new(Site::Format, ValueType::Float, Cardinality::PerAlt, None);
        let packed = decl.pack();
        assert_eq!(Declaration::unpack(packed), Some(decl));
    }

    #[test]
    fn no_declaration_sentinel_unpacks_to_none() {
        assert_eq!(Declaration::unpack(NO_DECLARATION), None);
    }
}
