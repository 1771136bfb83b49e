//! The immutable subset lattice.
//!
//! Sets and collections are stored in flat `Vec`s indexed by newtype ids,
//! with parent/member links forming the lattice. A set may appear in more
//! than one collection (e.g. a domain set grouped both under "domains" and
//! under an assembly), which is what makes this a lattice rather than a tree.

use std::collections::HashMap;
use std::fmt;

/// Index into `Sil::sets`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SetId(pub u32);

impl SetId {
    pub const INVALID: SetId = SetId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "SetId(INVALID)")
        } else {
            write!(f, "SetId({})", self.0)
        }
    }
}

/// Index into `Sil::collections`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CollectionId(pub u32);

impl CollectionId {
    pub const INVALID: CollectionId = CollectionId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "CollectionId(INVALID)")
        } else {
            write!(f, "CollectionId({})", self.0)
        }
    }
}

/// Semantic role of a collection: how its member sets partition the superset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionRole {
    Domain,
    Material,
    Species,
    Assembly,
    Boundary,
    Processor,
    Block,
}

/// A named subset in the lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct SilSet {
    pub id: SetId,
    pub name: String,
    /// Collections this set is a member of ("maps in"). Empty for the top set.
    pub maps_in: Vec<CollectionId>,
    /// Collections this set is the superset of ("maps out").
    pub maps_out: Vec<CollectionId>,
    /// Concrete domain index, for sets that designate one domain.
    pub domain: Option<usize>,
}

/// A named group of sets sharing a common superset and a semantic role.
#[derive(Debug, Clone, PartialEq)]
pub struct SilCollection {
    pub id: CollectionId,
    pub name: String,
    pub role: CollectionRole,
    pub superset: SetId,
    pub members: Vec<SetId>,
}

/// The immutable lattice. Built once at database-open time.
///
/// Construction API: `Sil::new` creates the top set, `add_collection` hangs
/// a collection off an existing set, `add_set` creates a member set, and
/// `link_set` adds an existing set to a further collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Sil {
    sets: Vec<SilSet>,
    collections: Vec<SilCollection>,
    top: SetId,
    name_index: HashMap<String, SetId>,
}

impl Sil {
    /// Create a lattice containing only the top set.
    pub fn new(top_name: impl Into<String>) -> Self {
        let name = top_name.into();
        let top = SetId(0);
        let mut name_index = HashMap::new();
        name_index.insert(name.clone(), top);
        Self {
            sets: vec![SilSet {
                id: top,
                name,
                maps_in: Vec::new(),
                maps_out: Vec::new(),
                domain: None,
            }],
            collections: Vec::new(),
            top,
            name_index,
        }
    }

    /// Add a collection under `superset`.
    ///
    /// Panics if `superset` is out of range — a graph-construction bug.
    pub fn add_collection(
        &mut self,
        superset: SetId,
        name: impl Into<String>,
        role: CollectionRole,
    ) -> CollectionId {
        assert!(
            superset.index() < self.sets.len(),
            "add_collection: superset {:?} out of range",
            superset
        );
        let id = CollectionId(self.collections.len() as u32);
        self.collections.push(SilCollection {
            id,
            name: name.into(),
            role,
            superset,
            members: Vec::new(),
        });
        self.sets[superset.index()].maps_out.push(id);
        id
    }

    /// Add a new set as a member of `collection`.
    pub fn add_set(
        &mut self,
        collection: CollectionId,
        name: impl Into<String>,
        domain: Option<usize>,
    ) -> SetId {
        assert!(
            collection.index() < self.collections.len(),
            "add_set: collection {:?} out of range",
            collection
        );
        let id = SetId(self.sets.len() as u32);
        let name = name.into();
        self.name_index.insert(name.clone(), id);
        self.sets.push(SilSet {
            id,
            name,
            maps_in: vec![collection],
            maps_out: Vec::new(),
            domain,
        });
        self.collections[collection.index()].members.push(id);
        id
    }

    /// Add an existing set to a further collection (multiple maps-in).
    pub fn link_set(&mut self, collection: CollectionId, set: SetId) {
        assert!(
            collection.index() < self.collections.len() && set.index() < self.sets.len(),
            "link_set: {:?} / {:?} out of range",
            collection,
            set
        );
        self.collections[collection.index()].members.push(set);
        self.sets[set.index()].maps_in.push(collection);
    }

    #[inline]
    pub fn top(&self) -> SetId {
        self.top
    }

    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn num_collections(&self) -> usize {
        self.collections.len()
    }

    #[inline]
    pub fn set(&self, id: SetId) -> Option<&SilSet> {
        if id.is_valid() {
            self.sets.get(id.index())
        } else {
            None
        }
    }

    #[inline]
    pub fn collection(&self, id: CollectionId) -> Option<&SilCollection> {
        if id.is_valid() {
            self.collections.get(id.index())
        } else {
            None
        }
    }

    pub fn find_set(&self, name: &str) -> Option<SetId> {
        self.name_index.get(name).copied()
    }

    pub fn sets(&self) -> impl Iterator<Item = &SilSet> {
        self.sets.iter()
    }

    pub fn collections(&self) -> impl Iterator<Item = &SilCollection> {
        self.collections.iter()
    }

    /// Collections with the given role, in id order.
    pub fn collections_with_role(
        &self,
        role: CollectionRole,
    ) -> impl Iterator<Item = &SilCollection> {
        self.collections.iter().filter(move |c| c.role == role)
    }

    /// Sub-collections of `set` with the given role.
    pub fn sub_collections(
        &self,
        set: SetId,
        role: CollectionRole,
    ) -> impl Iterator<Item = &SilCollection> + '_ {
        let maps_out: &[CollectionId] = self
            .set(set)
            .map(|s| s.maps_out.as_slice())
            .unwrap_or(&[]);
        maps_out
            .iter()
            .filter_map(|&cid| self.collection(cid))
            .filter(move |c| c.role == role)
    }

    /// Collect `set` and every set reachable below it, deduplicated.
    ///
    /// The traversal is a fixed top-down order so that restriction cascades
    /// are deterministic even when sets have multiple maps-in.
    pub fn collect_descendants(&self, set: SetId, out: &mut Vec<SetId>) {
        let Some(s) = self.set(set) else {
            return;
        };
        if out.contains(&s.id) {
            return;
        }
        out.push(s.id);
        for &cid in &s.maps_out {
            if let Some(coll) = self.collection(cid) {
                for &member in &coll.members {
                    self.collect_descendants(member, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_lattice() -> Sil {
        let mut sil = Sil::new("whole");
        let domains = sil.add_collection(sil.top(), "domains", CollectionRole::Domain);
        let d0 = sil.add_set(domains, "domain0", Some(0));
        let d1 = sil.add_set(domains, "domain1", Some(1));
        let m0 = sil.add_collection(d0, "materials", CollectionRole::Material);
        sil.add_set(m0, "domain0/steel", None);
        let m1 = sil.add_collection(d1, "materials", CollectionRole::Material);
        sil.add_set(m1, "domain1/air", None);
        sil
    }

    #[test]
    fn test_build_and_lookup() {
        let sil = small_lattice();
        assert_eq!(sil.num_sets(), 5);
        assert_eq!(sil.num_collections(), 3);

        let d0 = sil.find_set("domain0").unwrap();
        assert_eq!(sil.set(d0).unwrap().domain, Some(0));
        assert!(sil.find_set("nonexistent").is_none());
    }

    #[test]
    fn test_roles() {
        let sil = small_lattice();
        let domain_colls: Vec<_> = sil.collections_with_role(CollectionRole::Domain).collect();
        assert_eq!(domain_colls.len(), 1);
        assert_eq!(domain_colls[0].members.len(), 2);

        let d0 = sil.find_set("domain0").unwrap();
        let mats: Vec<_> = sil.sub_collections(d0, CollectionRole::Material).collect();
        assert_eq!(mats.len(), 1);
        assert_eq!(mats[0].members.len(), 1);
    }

    #[test]
    fn test_collect_descendants() {
        let sil = small_lattice();
        let mut out = Vec::new();
        sil.collect_descendants(sil.top(), &mut out);
        assert_eq!(out.len(), sil.num_sets());

        let d0 = sil.find_set("domain0").unwrap();
        out.clear();
        sil.collect_descendants(d0, &mut out);
        // domain0 and its one material set
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_multiple_maps_in() {
        let mut sil = Sil::new("whole");
        let domains = sil.add_collection(sil.top(), "domains", CollectionRole::Domain);
        let d0 = sil.add_set(domains, "domain0", Some(0));
        let assemblies = sil.add_collection(sil.top(), "assemblies", CollectionRole::Assembly);
        let wing = sil.add_set(assemblies, "wing", None);
        let wing_domains = sil.add_collection(wing, "wing domains", CollectionRole::Domain);
        sil.link_set(wing_domains, d0);

        assert_eq!(sil.set(d0).unwrap().maps_in.len(), 2);

        // Descendants of the assembly reach the shared domain set exactly once.
        let mut out = Vec::new();
        sil.collect_descendants(wing, &mut out);
        assert_eq!(out, vec![wing, d0]);
    }
}
