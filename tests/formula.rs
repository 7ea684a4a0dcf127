//! Integration tests for formula discovery and pillar persistence.
//!
//! NOTE: These tests avoid extra dev-dependencies by using std-only temp
//! paths.

use std::fs;
use std::path::PathBuf;

use serde_yaml::Value;

use formula_forms::{Formula, Pillar};

fn unique_temp_dir(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    path.push(format!("formula_forms_test_{name}_{nanos}"));
    path
}

const FORM: &str = r#"
color:
  $type: select
  $values: [blue, red]
  $default: blue
"#;

fn write_formula(root: &PathBuf, id: &str, metadata: Option<&str>) {
    let dir = root.join(id);
    fs::create_dir_all(&dir).expect("create formula dir");
    fs::write(dir.join("form.yml"), FORM).expect("write form");
    if let Some(metadata) = metadata {
        fs::write(dir.join("metadata.yml"), metadata).expect("write metadata");
    }
}

#[test]
fn discovers_formulas_sorted_by_id() {
    let root = unique_temp_dir("discovery");
    write_formula(&root, "zebra", None);
    write_formula(&root, "apache", Some("description: Apache web server\n"));
    // directories without a form description are not formulas
    fs::create_dir_all(root.join("not-a-formula")).expect("create noise dir");

    let formulas = Formula::all(&root).expect("scan formulas");
    let ids: Vec<&str> = formulas.iter().map(|f| f.id()).collect();
    assert_eq!(ids, vec!["apache", "zebra"]);

    let apache = &formulas[0];
    assert_eq!(apache.description(), "Apache web server");
    // missing metadata only costs the description
    assert_eq!(formulas[1].description(), "");

    fs::remove_dir_all(&root).ok();
}

#[test]
fn malformed_forms_are_skipped() {
    let root = unique_temp_dir("malformed");
    write_formula(&root, "good", None);
    let bad = root.join("bad");
    fs::create_dir_all(&bad).expect("create bad dir");
    fs::write(bad.join("form.yml"), "- this\n- is\n- a list\n").expect("write bad form");

    let formulas = Formula::all(&root).expect("scan formulas");
    assert_eq!(formulas.len(), 1);
    assert_eq!(formulas[0].id(), "good");

    fs::remove_dir_all(&root).ok();
}

#[test]
fn write_pillar_reports_whether_one_is_attached() {
    let root = unique_temp_dir("write_pillar");
    write_formula(&root, "test-formula", None);

    let mut formula = Formula::from_dir(root.join("test-formula")).expect("read formula");
    assert!(!formula.write_pillar().expect("write without pillar"));

    let pillar_path = root.join("pillar").join("test-formula.sls");
    let mut pillar = Pillar::from_file(&pillar_path).expect("open fresh pillar");
    pillar.set_data(formula.form_data().to_pillar_data());
    formula.set_pillar(pillar);
    assert!(formula.write_pillar().expect("write with pillar"));

    // the persisted document round-trips, defaults included
    let reloaded = Pillar::from_file(&pillar_path).expect("reload pillar");
    assert_eq!(
        reloaded.data(),
        &serde_yaml::from_str::<Value>("color: blue").unwrap()
    );

    fs::remove_dir_all(&root).ok();
}

#[test]
fn form_data_uses_the_attached_pillar() {
    let root = unique_temp_dir("form_data");
    write_formula(&root, "test-formula", None);

    let mut formula = Formula::from_dir(root.join("test-formula")).expect("read formula");
    assert_eq!(
        formula.form_data().get(&".color".parse().unwrap()),
        Value::String("blue".into())
    );

    formula.set_pillar(Pillar::new(serde_yaml::from_str("color: red").unwrap()));
    assert_eq!(
        formula.form_data().get(&".color".parse().unwrap()),
        Value::String("red".into())
    );

    fs::remove_dir_all(&root).ok();
}
