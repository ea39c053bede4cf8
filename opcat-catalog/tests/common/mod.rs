pub use opcat_common::testing::init_test_logging;

#[allow(dead_code)]
pub fn fixture(name: &str) -> &'static str {
    match name {
        "catalog_def.json" => include_str!("../fixtures/catalog_def.json"),
        "catalog_def_2.json" => include_str!("../fixtures/catalog_def_2.json"),
        "catalog_def_broken.json" => include_str!("../fixtures/catalog_def_broken.json"),
        other => panic!("unknown fixture: {other}"),
    }
}
