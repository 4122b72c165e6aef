use lumen::components::mmi2x2::{Mmi2x2, Mmi2x2Params};
use lumen::components::straight::{Straight, StraightParams};
use lumen::layout::layers::LayerPurpose;

mod common;
use common::{out_path, setup_ctx};

#[test]
fn test_gds_export_units() {
    let ctx = setup_ctx();
    ctx.instantiate::<Straight>(&StraightParams::default())
        .unwrap();
    let lib = ctx.to_gds_lib().unwrap();
    assert!((lib.units.db_unit() - 1e-9).abs() < 1e-15);
    assert_eq!(lib.structs.len(), 1);
    assert_eq!(lib.structs[0].name, "straight_l10000_w500");
}

#[test]
fn test_gds_export_reimport() {
    let gds_path = out_path("test_gds_export_reimport", "layout.gds");
    let params = Mmi2x2Params::default();

    let ctx_original = setup_ctx();
    ctx_original
        .write_layout::<Mmi2x2>(&params, &gds_path)
        .expect("failed to write layout");

    let inst = ctx_original.instantiate::<Mmi2x2>(&params).unwrap();
    let name = inst.cell().name().clone();

    let ctx_new = setup_ctx();
    let cell_map = ctx_new.from_gds(&gds_path).expect("failed to import GDS");

    // Top cell plus the two distinct children (body, taper).
    assert_eq!(cell_map.len(), 3);
    let top = cell_map.get(&name).expect("top cell missing after import");

    // One body and four taper instances survive the round trip.
    assert_eq!(top.insts().count(), 5);

    // Ports come back as pin rectangles and labels on the port layer.
    let pins = top
        .elems()
        .filter(|e| e.layer.purpose() == LayerPurpose::Pin)
        .count();
    assert_eq!(pins, 4);
    let labels: Vec<String> = top
        .annotations()
        .map(|a| a.string.to_string())
        .collect();
    for port in ["E0", "E1", "W0", "W1"] {
        assert!(
            labels.iter().any(|l| l == port),
            "missing port label {port} in {labels:?}"
        );
    }
}

#[test]
fn test_gds_import_geometry_shapes() {
    let gds_path = out_path("test_gds_import_shapes", "layout.gds");
    let ctx = setup_ctx();
    ctx.write_layout::<Straight>(&StraightParams::default(), &gds_path)
        .unwrap();

    let ctx_new = setup_ctx();
    let cell_map = ctx_new.from_gds(&gds_path).unwrap();
    let cell = cell_map.get("straight_l10000_w500").unwrap();

    // The drawn waveguide boundary reimports as an axis-aligned rectangle.
    let drawing: Vec<_> = cell
        .elems()
        .filter(|e| e.layer.purpose() == LayerPurpose::Drawing)
        .collect();
    assert_eq!(drawing.len(), 1);
    let rect = drawing[0]
        .inner
        .as_rect()
        .expect("waveguide should import as a rectangle");
    assert_eq!(rect.width(), 10_000);
    assert_eq!(rect.height(), 500);
}

#[test]
fn test_gds_import_rejects_wrong_units() {
    let gds_path = out_path("test_gds_import_units", "layout.gds");
    let mut lib = gds21::GdsLibrary::new("TOP");
    lib.units = gds21::GdsUnits::new(1e-3, 1e-6);
    lib.structs.push(gds21::GdsStruct::new("empty"));
    std::fs::create_dir_all(gds_path.parent().unwrap()).unwrap();
    lib.save(&gds_path).unwrap();

    let ctx = setup_ctx();
    ctx.from_gds(&gds_path)
        .expect_err("import should fail on non-nanometer units");
}
