//! Restriction overlay over a shared lattice.
//!
//! `SilRestriction` is the mutable on/off state layered on an immutable
//! `Sil`. Cloning is cheap (one `Arc` bump plus a bit vector), which is how
//! contracts snapshot the selection at build time: GUI-driven toggles on the
//! live overlay never affect an update already in flight.

use crate::sil::lattice::{CollectionRole, SetId, Sil};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// On/off selection state for every set in a lattice.
#[derive(Debug, Clone)]
pub struct SilRestriction {
    sil: Arc<Sil>,
    enabled: Vec<bool>,
}

impl SilRestriction {
    /// All sets enabled.
    pub fn new(sil: Arc<Sil>) -> Self {
        let n = sil.num_sets();
        Self {
            sil,
            enabled: vec![true; n],
        }
    }

    /// All sets disabled.
    pub fn all_off(sil: Arc<Sil>) -> Self {
        let n = sil.num_sets();
        Self {
            sil,
            enabled: vec![false; n],
        }
    }

    #[inline]
    pub fn sil(&self) -> &Arc<Sil> {
        &self.sil
    }

    /// Whether a set is currently enabled. Out-of-range ids read as off.
    #[inline]
    pub fn is_on(&self, id: SetId) -> bool {
        id.is_valid() && self.enabled.get(id.index()).copied().unwrap_or(false)
    }

    /// Enable a set and everything below it.
    ///
    /// Out-of-range ids are a silent no-op: selection is GUI-driven and
    /// exploratory, so a stale id must not take the pipeline down.
    pub fn turn_on_set(&mut self, id: SetId) {
        self.set_state(id, true);
    }

    /// Disable a set and everything below it. Same no-op policy.
    pub fn turn_off_set(&mut self, id: SetId) {
        self.set_state(id, false);
    }

    pub fn turn_on_all(&mut self) {
        self.enabled.fill(true);
    }

    pub fn turn_off_all(&mut self) {
        self.enabled.fill(false);
    }

    fn set_state(&mut self, id: SetId, on: bool) {
        if !id.is_valid() || id.index() >= self.enabled.len() {
            return;
        }
        let mut affected = Vec::new();
        self.sil.collect_descendants(id, &mut affected);
        for set in affected {
            self.enabled[set.index()] = on;
        }
    }

    /// Whether every set is enabled (the unrestricted selection).
    pub fn uses_all_sets(&self) -> bool {
        self.enabled.iter().all(|&b| b)
    }

    /// The concrete, deduplicated, ascending list of domains implied by the
    /// current selection.
    ///
    /// A domain is listed iff its domain set is on AND, when material
    /// sub-collections exist beneath it, at least one of their member sets is
    /// on: domain and material restrictions intersect, alternatives within a
    /// category union.
    pub fn domain_list(&self) -> Vec<usize> {
        let mut domains = Vec::new();
        for coll in self.sil.collections_with_role(CollectionRole::Domain) {
            for &member in &coll.members {
                let Some(set) = self.sil.set(member) else {
                    continue;
                };
                let Some(domain) = set.domain else {
                    continue;
                };
                if !self.is_on(member) {
                    continue;
                }
                if self.material_rule_passes(member) {
                    domains.push(domain);
                }
            }
        }
        domains.sort_unstable();
        domains.dedup();
        domains
    }

    /// Names of the enabled material sets beneath `domain_set`, or `None`
    /// when the domain carries no material decomposition.
    pub fn enabled_materials(&self, domain_set: SetId) -> Option<Vec<String>> {
        let mut found_collection = false;
        let mut names = Vec::new();
        for coll in self
            .sil
            .sub_collections(domain_set, CollectionRole::Material)
        {
            found_collection = true;
            for &member in &coll.members {
                if self.is_on(member) {
                    if let Some(set) = self.sil.set(member) {
                        names.push(set.name.clone());
                    }
                }
            }
        }
        if found_collection {
            Some(names)
        } else {
            None
        }
    }

    fn material_rule_passes(&self, domain_set: SetId) -> bool {
        match self.enabled_materials(domain_set) {
            None => true,
            Some(names) => !names.is_empty(),
        }
    }

    /// Structural equality: same lattice, same on/off bits. Used by the
    /// update protocol to decide whether a re-execution can be skipped.
    pub fn identical(&self, other: &SilRestriction) -> bool {
        (Arc::ptr_eq(&self.sil, &other.sil) || self.sil == other.sil)
            && self.enabled == other.enabled
    }

    /// Most restrictive combination: a set survives only if both selections
    /// enable it. Requires the same underlying lattice.
    pub fn intersect(&self, other: &SilRestriction) -> Option<SilRestriction> {
        if !Arc::ptr_eq(&self.sil, &other.sil) && self.sil != other.sil {
            return None;
        }
        let enabled = self
            .enabled
            .iter()
            .zip(other.enabled.iter())
            .map(|(&a, &b)| a && b)
            .collect();
        Some(SilRestriction {
            sil: Arc::clone(&self.sil),
            enabled,
        })
    }
}

impl PartialEq for SilRestriction {
    fn eq(&self, other: &Self) -> bool {
        self.identical(other)
    }
}

impl Eq for SilRestriction {}

impl Hash for SilRestriction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sil.num_sets().hash(state);
        self.sil.num_collections().hash(state);
        self.enabled.hash(state);
    }
}
