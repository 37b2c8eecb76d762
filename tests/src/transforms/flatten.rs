use rand::rngs::StdRng;
use rand::SeedableRng;
use tangle_core::seed::Seed;
use tangle_core::{scan_source, split_method, BlockKind, Method};
use tangle_transform::flatten::plan::{DispatchPlan, NextCase};
use tangle_transform::flatten::{Flatten, FlattenConfig};
use tangle_transform::validator::replay_dispatch;
use tangle_transform::{Error, Transform};

const FIXTURE: &str = include_str!("../../fixtures/MainActivity.smali");

fn fixture_method(index: usize) -> Method {
    let source = scan_source(FIXTURE).unwrap();
    let method = split_method(source.methods().nth(index).unwrap()).unwrap();
    method
}

fn flatten(method: &Method, rng: &mut StdRng) -> Method {
    let mut flattened = method.clone();
    assert!(Flatten::new().apply(&mut flattened, rng).unwrap());
    flattened
}

/// Non-blank lines that the flattener did not synthesize, `.locals` excluded.
fn original_content(method: &Method, dispatch: Option<&str>) -> Vec<String> {
    let mut lines: Vec<String> = method
        .body_lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(".locals"))
        .filter(|line| {
            let Some(reg) = dispatch else { return true };
            !(line.contains(":flat_")
                || line.starts_with(&format!("const/16 {reg}, "))
                || line.starts_with(&format!("const {reg}, "))
                || *line == ".packed-switch 0x0"
                || *line == ".end packed-switch")
        })
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}

/// Case numbers in physical layout order.
fn physical_cases(method: &Method) -> Vec<usize> {
    method
        .blocks
        .iter()
        .filter(|block| block.kind == BlockKind::Body)
        .map(|block| {
            block.lines[0]
                .trim()
                .strip_prefix(":flat_case_")
                .unwrap()
                .parse()
                .unwrap()
        })
        .collect()
}

#[test]
fn test_scenario_three_free_blocks() {
    tangle_tests::init_tracing();
    let original = fixture_method(2);
    let seed = Seed::generate();
    let mut rng = seed.rng();
    let flattened = flatten(&original, &mut rng);

    assert_eq!(flattened.blocks[0].lines[0], "    .locals 3");
    assert!(flattened.mentions("    packed-switch v2, :flat_switch"));

    let table = flattened.blocks.last().unwrap();
    assert_eq!(table.kind, BlockKind::SwitchTable);
    let entries: Vec<&str> = table.lines[3..table.lines.len() - 1]
        .iter()
        .map(|line| line.trim())
        .collect();
    assert_eq!(
        entries,
        vec![":flat_case_0", ":flat_case_1", ":flat_case_2", ":flat_case_3"]
    );

    assert_eq!(physical_cases(&flattened), vec![0, 1, 2, 3]);

    let replay = replay_dispatch(&flattened, &FlattenConfig::default().labels()).unwrap();
    assert_eq!(replay.order.len(), 4);
    assert_eq!(replay.order[0], 0);
    let markers: Vec<&str> = replay.blocks.iter().map(|b| b[0].trim()).collect();
    assert_eq!(markers, vec![".line 14", ".line 15", ".line 16", ".line 17"]);
}

#[test]
fn test_scenario_method_without_markers() {
    let original = fixture_method(1);
    let mut rng = StdRng::seed_from_u64(7);
    let flattened = flatten(&original, &mut rng);

    assert_eq!(flattened.blocks[0].lines, vec!["    .locals 1"]);
    assert!(!flattened.mentions("goto :flat_dispatch"));

    let table = flattened.blocks.last().unwrap();
    let entries = table
        .lines
        .iter()
        .filter(|line| line.trim().starts_with(":flat_case_"))
        .count();
    assert_eq!(entries, 1);

    let replay = replay_dispatch(&flattened, &FlattenConfig::default().labels()).unwrap();
    assert_eq!(replay.order, vec![0]);
    assert_eq!(replay.lines().last().unwrap().trim(), "return p0");
}

#[test]
fn test_single_marker_method_is_degenerate() {
    let original = fixture_method(0);
    let mut rng = StdRng::seed_from_u64(7);
    let flattened = flatten(&original, &mut rng);

    assert_eq!(flattened.blocks[0].lines[0], "    .locals 1");
    assert_eq!(physical_cases(&flattened), vec![0]);
    assert!(!flattened.mentions("goto :flat_dispatch"));
}

#[test]
fn test_flattening_is_lossless() {
    for index in [0, 1, 2, 4] {
        let original = fixture_method(index);
        let mut rng = StdRng::seed_from_u64(index as u64);
        let mut flattened = original.clone();
        let register = tangle_core::registers::find_locals(&original).unwrap().count;
        assert!(Flatten::new().apply(&mut flattened, &mut rng).unwrap());

        let reg = format!("v{register}");
        assert_eq!(
            original_content(&original, None),
            original_content(&flattened, Some(&reg)),
            "{}",
            original.name()
        );
    }
}

#[test]
fn test_chain_replays_original_order_for_many_seeds() {
    let original = fixture_method(4);
    let expected: Vec<&str> = original
        .blocks
        .iter()
        .skip(1)
        .flat_map(|block| block.lines.iter().map(String::as_str))
        .filter(|line| !line.trim().is_empty())
        .collect();

    let mut layouts = Vec::new();
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let flattened = flatten(&original, &mut rng);
        let replay = replay_dispatch(&flattened, &FlattenConfig::default().labels()).unwrap();

        let mut visited = replay.order.clone();
        visited.sort_unstable();
        assert_eq!(visited, vec![0, 1, 2, 3]);
        assert_eq!(replay.lines().collect::<Vec<_>>(), expected);
        layouts.push(replay.order);
    }
    layouts.sort();
    layouts.dedup();
    assert!(layouts.len() > 1, "case assignment should depend on the seed");
}

#[test]
fn test_same_seed_same_layout() {
    let original = fixture_method(2);
    let seed = Seed::from_hex("0xabababababababababababababababababababababababababababababababab")
        .unwrap();

    let a = flatten(&original, &mut seed.rng());
    let b = flatten(&original, &mut seed.rng());
    assert_eq!(a.render(), b.render());
}

#[test]
fn test_plan_bijection_and_chain() {
    let mut rng = StdRng::seed_from_u64(11);
    let plan = DispatchPlan::build(tangle_core::Register(4), 5, &mut rng).unwrap();

    let mut cases: Vec<usize> = (0..5).map(|i| plan.case_of(i).unwrap()).collect();
    cases.sort_unstable();
    assert_eq!(cases, vec![1, 2, 3, 4, 5]);
    for case in 1..=5 {
        let original = plan.original_of(case).unwrap();
        assert_eq!(plan.case_of(original), Some(case));
    }

    assert_eq!(plan.chain()[0], 0);
    assert_eq!(plan.next_case(5).unwrap(), NextCase::End);
    assert!(matches!(
        plan.next_case(6),
        Err(Error::ChainLookup { position: 6, cases: 6 })
    ));

    assert!(matches!(
        DispatchPlan::from_permutation(tangle_core::Register(0), vec![0, 0]),
        Err(Error::InvalidPlan(_))
    ));
}

#[test]
fn test_custom_label_prefix() {
    let original = fixture_method(2);
    let config = FlattenConfig {
        label_prefix: "cf_".into(),
        ..FlattenConfig::default()
    };
    let transform = Flatten::with_config(config.clone()).unwrap();
    let mut method = original.clone();
    let mut rng = StdRng::seed_from_u64(2);
    assert!(transform.apply(&mut method, &mut rng).unwrap());

    assert!(method.mentions(":cf_dispatch"));
    assert!(!method.mentions(":flat_"));
    let replay = replay_dispatch(&method, &config.labels()).unwrap();
    assert_eq!(replay.order.len(), 4);
}

#[test]
fn test_label_prefix_in_string_literal_is_accepted() {
    let original = tangle_tests::method(
        ".method a()V\n    .locals 1\n\n    .line 1\n    const-string v0, \"a:flat_b\"\n\n    .line 2\n    return-void\n.end method",
    );
    let mut rng = StdRng::seed_from_u64(5);
    let flattened = flatten(&original, &mut rng);

    let replay = replay_dispatch(&flattened, &FlattenConfig::default().labels()).unwrap();
    assert_eq!(
        replay.lines().map(str::trim).collect::<Vec<_>>(),
        vec![".line 1", "const-string v0, \"a:flat_b\"", ".line 2", "return-void"]
    );
}

#[test]
fn test_structural_errors_surface() {
    let mut rng = StdRng::seed_from_u64(0);

    let mut registers = tangle_tests::method(
        ".method a()V\n    .registers 2\n    .line 1\n    return-void\n.end method",
    );
    assert!(matches!(
        Flatten::new().apply(&mut registers, &mut rng),
        Err(Error::Core(_))
    ));

    let mut missing = tangle_tests::method(".method a()V\n    .line 1\n    return-void\n.end method");
    assert!(matches!(
        Flatten::new().apply(&mut missing, &mut rng),
        Err(Error::Core(tangle_core::result::Error::MissingRegisterDirective { .. }))
    ));

    let mut colliding = tangle_tests::method(
        ".method a()V\n    .locals 0\n    .line 1\n    goto :flat_dispatch\n.end method",
    );
    assert!(matches!(
        Flatten::new().apply(&mut colliding, &mut rng),
        Err(Error::LabelCollision { .. })
    ));
}
