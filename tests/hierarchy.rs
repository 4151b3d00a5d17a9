use std::sync::Arc;

use ncflat::{
    config::Config,
    data_type::ElementType,
    source::{ArrayDimension, AttributeValue, Attributes, Dataset, Group, Variable},
    target::{MemoryTarget, TargetValues, UsageLogTarget},
    transform::{TransformDriver, TransformOptions, TransformState},
};
use parking_lot::Mutex;

fn int_array(name: &str, dimension: &str, size: u64) -> Variable {
    Variable::array(
        name,
        ElementType::Int32,
        vec![ArrayDimension::new(dimension, size)],
        (0..i32::try_from(size).unwrap()).collect::<Vec<_>>(),
    )
}

fn dataset() -> Dataset {
    Dataset::new(
        Group::new("")
            .with_group(
                Group::new("A")
                    .with_attributes(Attributes::new().with("title", AttributeValue::text("a")))
                    .with_variable(int_array("a", "x", 2)),
            )
            .with_group(Group::new("B").with_group(Group::new("C").with_variable(int_array(
                "c", "y", 3,
            ))))
            .with_group(Group::new("D").with_variable(int_array("d", "z", 4).with_selected(false))),
    )
}

#[test]
fn hierarchy_tree() {
    let dataset = dataset();
    let mut target = MemoryTarget::new();
    let summary = TransformDriver::new(
        &dataset,
        &mut target,
        Config::default(),
        TransformOptions::new(),
    )
    .transform()
    .unwrap();
    let tree = target.hierarchy_tree();
    println!("{tree}");
    assert_eq!(
        tree,
        "/
  A
    a [2] int
  B
    C
      c [3] int
"
    );
    assert_eq!(summary.variables(), ["a", "c"]);
    assert_eq!(target.group_dimensions("/A"), [("x".to_string(), 2)]);
    assert_eq!(target.group_dimensions("/B/C"), [("y".to_string(), 3)]);
    assert!(target.group_dimensions("/B").is_empty());
    assert_eq!(
        target.group_attribute("/A", "title"),
        Some(&TargetValues::text("a"))
    );
    assert!(target.group("/B").unwrap().attributes.is_empty());
    assert!(target.group("/D").is_none());
    assert_eq!(
        target.variable("/B/C", "c").unwrap().values,
        Some(TargetValues::Int(vec![0, 1, 2]))
    );
}

#[test]
fn declared_dimensions_are_shared_with_descendants() {
    let dataset = Dataset::new(
        Group::new("")
            .with_dimension("time", 4)
            .with_variable(int_array("t", "time", 4))
            .with_group(
                Group::new("inner")
                    .with_variable(int_array("u", "time", 4))
                    .with_variable(int_array("v", "time", 2)),
            ),
    );
    let mut target = MemoryTarget::new();
    TransformDriver::new(
        &dataset,
        &mut target,
        Config::default(),
        TransformOptions::new(),
    )
    .transform()
    .unwrap();

    assert_eq!(target.group_dimensions("/"), [("time".to_string(), 4)]);
    assert_eq!(target.group_dimensions("/inner"), [("v_time".to_string(), 2)]);
    let u = target.variable("/inner", "u").unwrap();
    assert_eq!(target.variable_dimension_names(u), ["time"]);
    let v = target.variable("/inner", "v").unwrap();
    assert_eq!(target.variable_dimension_names(v), ["v_time"]);
}

#[test]
fn unconstrained_datasets_map_every_group() {
    let dataset = Dataset::new(
        Group::new("")
            .with_variable(int_array("r", "x", 1))
            .with_group(Group::new("empty").with_dimension("unused", 7)),
    );
    assert!(dataset.is_unconstrained());
    let mut target = MemoryTarget::new();
    TransformDriver::new(
        &dataset,
        &mut target,
        Config::default(),
        TransformOptions::new(),
    )
    .transform()
    .unwrap();
    assert_eq!(
        target.group_dimensions("/empty"),
        [("unused".to_string(), 7)]
    );
}

#[test]
fn usage_log() {
    let dataset = dataset();
    let directory = tempfile::TempDir::new().unwrap();
    let path = directory.path().join("usage.log");
    let file = std::fs::File::create(&path).unwrap();
    let mut target = UsageLogTarget::new(MemoryTarget::new(), Arc::new(Mutex::new(file)), || {
        "[ncflat] ".to_string()
    });
    let mut driver = TransformDriver::new(
        &dataset,
        &mut target,
        Config::default(),
        TransformOptions::new(),
    );
    driver.transform().unwrap();
    assert_eq!(driver.state(), TransformState::Closed);
    assert!(target.inner().is_closed());

    let log = std::fs::read_to_string(&path).unwrap();
    let lines = log.lines().collect::<Vec<_>>();
    assert_eq!(lines.first(), Some(&"[ncflat] create(netCDF-4) -> Ok(NcGroupId(0))"));
    assert_eq!(lines.last(), Some(&"[ncflat] close() -> Ok(())"));
    assert!(lines.iter().any(|line| line.contains("define_group(0, A)")));
}
