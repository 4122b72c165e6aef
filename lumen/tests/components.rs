use lumen::components::coupler90::{Coupler90, Coupler90Params};
use lumen::components::mmi2x2::{Mmi2x2, Mmi2x2Params};
use lumen::library::hash::gds_hash;
use lumen::registry::ComponentRegistry;

mod common;
use common::{out_path, setup_ctx};

#[test]
fn test_coupler90_spec_scenario() {
    let ctx = setup_ctx();
    let inst = ctx
        .instantiate::<Coupler90>(&Coupler90Params {
            bend_radius: 10.0,
            width: 0.45,
            gap: 0.3,
        })
        .expect("failed to generate coupler90");

    let cell = inst.cell();
    let names: Vec<String> = cell
        .ports_sorted()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["E0", "N0", "W0"]);

    let w0 = cell.port("W0").unwrap();
    assert_eq!(w0.width(), 1200, "W0 width should be 2 * 0.45 + 0.3 um");
    assert_eq!(w0.orientation(), 180.0);
}

#[test]
fn test_identical_params_share_a_cell() {
    let ctx = setup_ctx();
    let a = ctx
        .instantiate::<Coupler90>(&Coupler90Params::default())
        .unwrap();
    let b = ctx
        .instantiate::<Coupler90>(&Coupler90Params::default())
        .unwrap();
    assert!(
        std::sync::Arc::ptr_eq(a.cell(), b.cell()),
        "identical parameters should reuse the generated cell"
    );

    let c = ctx
        .instantiate::<Coupler90>(&Coupler90Params {
            gap: 0.25,
            ..Default::default()
        })
        .unwrap();
    assert!(!std::sync::Arc::ptr_eq(a.cell(), c.cell()));
    assert_ne!(a.cell().name(), c.cell().name());
}

#[test]
fn test_builds_are_deterministic_across_contexts() {
    let params = Mmi2x2Params::default();

    let ctx_a = setup_ctx();
    let ctx_b = setup_ctx();
    let a = ctx_a.instantiate::<Mmi2x2>(&params).unwrap();
    let b = ctx_b.instantiate::<Mmi2x2>(&params).unwrap();

    // Identical port sets.
    let ports_a: Vec<_> = a
        .cell()
        .ports_sorted()
        .iter()
        .map(|p| (p.name().to_string(), p.midpoint(), p.width(), p.orientation()))
        .collect();
    let ports_b: Vec<_> = b
        .cell()
        .ports_sorted()
        .iter()
        .map(|p| (p.name().to_string(), p.midpoint(), p.width(), p.orientation()))
        .collect();
    assert_eq!(ports_a, ports_b);

    // Identical geometry hashes.
    let path_a = out_path("test_determinism", "a.gds");
    let path_b = out_path("test_determinism", "b.gds");
    ctx_a.write_layout::<Mmi2x2>(&params, &path_a).unwrap();
    ctx_b.write_layout::<Mmi2x2>(&params, &path_b).unwrap();
    assert_eq!(gds_hash(&path_a).unwrap(), gds_hash(&path_b).unwrap());
}

#[test]
fn test_every_standard_component_is_deterministic() {
    let registry = ComponentRegistry::standard().unwrap();

    for name in registry.names() {
        let ctx_a = setup_ctx();
        let ctx_b = setup_ctx();
        let a = registry.build(&ctx_a, &name).unwrap();
        let b = registry.build(&ctx_b, &name).unwrap();

        assert_eq!(a.name(), b.name(), "cell names differ for {name}");
        let ports_a: Vec<_> = a
            .ports_sorted()
            .iter()
            .map(|p| (p.name().to_string(), p.midpoint(), p.width(), p.orientation()))
            .collect();
        let ports_b: Vec<_> = b
            .ports_sorted()
            .iter()
            .map(|p| (p.name().to_string(), p.midpoint(), p.width(), p.orientation()))
            .collect();
        assert_eq!(ports_a, ports_b, "ports differ for {name}");

        let path_a = out_path("test_standard_determinism", &format!("{name}_a.gds"));
        let path_b = out_path("test_standard_determinism", &format!("{name}_b.gds"));
        ctx_a.write_cell(a, &path_a).unwrap();
        ctx_b.write_cell(b, &path_b).unwrap();
        assert_eq!(
            gds_hash(&path_a).unwrap(),
            gds_hash(&path_b).unwrap(),
            "geometry hash differs for {name}"
        );
    }
}
