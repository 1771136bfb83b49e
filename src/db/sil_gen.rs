//! One-shot SIL generation from database metadata.
//!
//! Naming convention: domain sets are `"domain<N>"`; material sets are
//! `"domain<N>/<material>"` so the same material name can be toggled across
//! every domain that contains it. Assembly sets reuse the existing domain
//! sets through additional maps-in links.

use crate::db::DatabaseMetadata;
use crate::sil::{CollectionRole, Sil, SilRestriction};

/// Build the subset lattice for a dataset.
pub fn sil_from_metadata(md: &DatabaseMetadata) -> Sil {
    let mut sil = Sil::new(md.mesh_name.clone());
    let domains = sil.add_collection(sil.top(), "domains", CollectionRole::Domain);

    let mut domain_sets = Vec::with_capacity(md.domain_count);
    for d in 0..md.domain_count {
        let set = sil.add_set(domains, format!("domain{}", d), Some(d));
        domain_sets.push(set);

        let present = md.domain_materials.get(d).map(Vec::as_slice).unwrap_or(&[]);
        if !present.is_empty() {
            let mats = sil.add_collection(set, "materials", CollectionRole::Material);
            for &mat in present {
                let mat_name = md
                    .materials
                    .get(mat)
                    .cloned()
                    .unwrap_or_else(|| mat.to_string());
                sil.add_set(mats, format!("domain{}/{}", d, mat_name), None);
            }
        }
    }

    if !md.assemblies.is_empty() {
        let assemblies = sil.add_collection(sil.top(), "assemblies", CollectionRole::Assembly);
        for asm in &md.assemblies {
            let asm_set = sil.add_set(assemblies, asm.name.clone(), None);
            let asm_domains =
                sil.add_collection(asm_set, format!("{} domains", asm.name), CollectionRole::Domain);
            for &d in &asm.domains {
                if let Some(&set) = domain_sets.get(d) {
                    sil.link_set(asm_domains, set);
                }
            }
        }
    }

    sil
}

/// Restrict a selection to the named materials: every material set whose
/// name (the part after `/`) is not listed gets turned off. Domains without
/// a material decomposition are untouched.
pub fn restrict_to_materials(restriction: &mut SilRestriction, materials: &[&str]) {
    let sil = std::sync::Arc::clone(restriction.sil());
    for coll in sil.collections_with_role(CollectionRole::Material) {
        for &member in &coll.members {
            let Some(set) = sil.set(member) else {
                continue;
            };
            let mat_name = set.name.rsplit('/').next().unwrap_or(&set.name);
            if !materials.contains(&mat_name) {
                restriction.turn_off_set(member);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AssemblyInfo;
    use crate::types::Extents;
    use std::sync::Arc;

    fn metadata() -> DatabaseMetadata {
        DatabaseMetadata {
            mesh_name: "mesh".to_string(),
            domain_count: 2,
            variables: Vec::new(),
            materials: vec!["0".into(), "1".into(), "2".into(), "3".into()],
            domain_materials: vec![vec![0, 1], vec![2, 3]],
            domain_bounds: vec![
                Extents::new([0.0; 3], [1.0; 3]),
                Extents::new([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]),
            ],
            assemblies: vec![AssemblyInfo {
                name: "upper".to_string(),
                domains: vec![1],
            }],
        }
    }

    #[test]
    fn test_generated_structure() {
        let sil = sil_from_metadata(&metadata());
        assert!(sil.find_set("domain0").is_some());
        assert!(sil.find_set("domain1/2").is_some());
        assert!(sil.find_set("upper").is_some());

        // The assembly links the existing domain set, not a copy.
        let d1 = sil.find_set("domain1").unwrap();
        assert_eq!(sil.set(d1).unwrap().maps_in.len(), 2);
    }

    #[test]
    fn test_restrict_to_materials() {
        let sil = Arc::new(sil_from_metadata(&metadata()));
        let mut r = SilRestriction::new(Arc::clone(&sil));
        restrict_to_materials(&mut r, &["2"]);
        // Material 2 lives only in domain 1.
        assert_eq!(r.domain_list(), vec![1]);
    }

    #[test]
    fn test_assembly_toggle_cascades_to_domains() {
        let sil = Arc::new(sil_from_metadata(&metadata()));
        let mut r = SilRestriction::new(Arc::clone(&sil));
        let upper = sil.find_set("upper").unwrap();
        r.turn_off_set(upper);
        assert_eq!(r.domain_list(), vec![0]);
    }
}
