//! Content hashing of GDS geometry.
//!
//! GDSII files embed modification timestamps, so two byte-identical
//! geometries written at different times produce different files. The
//! regression hash therefore digests the *parsed* geometry: struct names and
//! elements, with structs visited in name order and the library timestamps
//! never fed to the digest. Re-exporting unchanged geometry always produces
//! the same hash.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{ErrorSource, Result};
use crate::layout::error::LayoutError;

/// Computes the geometry hash of the GDS file at `path`.
///
/// Returns the SHA-256 digest as a lowercase hex string.
pub fn gds_hash(path: impl AsRef<Path>) -> Result<String> {
    let lib = gds21::GdsLibrary::load(path)
        .map_err(LayoutError::from)
        .map_err(ErrorSource::Layout)?;
    gds_lib_hash(&lib)
}

/// Computes the geometry hash of an in-memory GDS library.
pub fn gds_lib_hash(lib: &gds21::GdsLibrary) -> Result<String> {
    let mut hasher = Sha256::new();

    // Units change the physical meaning of every coordinate, so they are
    // part of the hash even though they are library metadata.
    serde_json::to_writer(&mut hasher, &lib.units).map_err(ErrorSource::Json)?;

    let mut structs: Vec<&gds21::GdsStruct> = lib.structs.iter().collect();
    structs.sort_by(|a, b| a.name.cmp(&b.name));
    for strukt in structs {
        hasher.update(strukt.name.as_bytes());
        hasher.update([0u8]);
        for elem in &strukt.elems {
            serde_json::to_writer(&mut hasher, elem).map_err(ErrorSource::Json)?;
        }
        hasher.update([0u8]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lib(layer: i16) -> gds21::GdsLibrary {
        let mut lib = gds21::GdsLibrary::new("TOP");
        lib.units = gds21::GdsUnits::new(1e-3, 1e-9);
        let mut strukt = gds21::GdsStruct::new("cell_a");
        strukt.elems.push(
            gds21::GdsBoundary {
                layer,
                datatype: 0,
                xy: vec![
                    gds21::GdsPoint::new(0, 0),
                    gds21::GdsPoint::new(100, 0),
                    gds21::GdsPoint::new(100, 50),
                    gds21::GdsPoint::new(0, 50),
                    gds21::GdsPoint::new(0, 0),
                ],
                ..Default::default()
            }
            .into(),
        );
        lib.structs.push(strukt);
        lib
    }

    #[test]
    fn identical_geometry_hashes_identically() {
        let a = gds_lib_hash(&sample_lib(1)).unwrap();
        let b = gds_lib_hash(&sample_lib(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_geometry_hashes_differently() {
        let a = gds_lib_hash(&sample_lib(1)).unwrap();
        let b = gds_lib_hash(&sample_lib(2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn struct_order_does_not_matter() {
        let mut forward = sample_lib(1);
        let mut second = gds21::GdsStruct::new("cell_b");
        second.elems.push(
            gds21::GdsBoundary {
                layer: 3,
                datatype: 0,
                xy: vec![
                    gds21::GdsPoint::new(0, 0),
                    gds21::GdsPoint::new(10, 0),
                    gds21::GdsPoint::new(10, 10),
                    gds21::GdsPoint::new(0, 10),
                    gds21::GdsPoint::new(0, 0),
                ],
                ..Default::default()
            }
            .into(),
        );
        forward.structs.push(second.clone());

        let mut reversed = sample_lib(1);
        reversed.structs.insert(0, second);

        assert_eq!(
            gds_lib_hash(&forward).unwrap(),
            gds_lib_hash(&reversed).unwrap()
        );
    }
}
