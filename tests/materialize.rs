//! Object materialization tests

use std::sync::Arc;

use cascade_config::{
    Buildable, ClassRef, Config, ConfigError, Factory, FromConfig, Module, Populator, Result,
    Value,
};

#[derive(Debug, PartialEq)]
struct Linear {
    in_features: i64,
    out_features: i64,
}

impl FromConfig for Linear {
    fn from_config(config: &Config) -> Result<Value> {
        let in_features = config.get("in_features")?.as_i64().unwrap_or(0);
        let out_features = config.get_or("out_features", in_features)?.as_i64().unwrap_or(0);
        Ok(Value::Module(Module::new(Linear {
            in_features,
            out_features,
        })))
    }
}

/// Builds a stack of layers from the `layers` list under its own path.
#[derive(Debug)]
struct Sequential;

impl Buildable for Sequential {
    fn from_config(&self, config: &Config) -> Result<Value> {
        let layers = config.get("layers")?;
        config.select("layers").build_object(&layers)
    }
}

fn linear_of(value: &Value) -> &Linear {
    value
        .as_module()
        .and_then(|m| m.downcast_ref::<Linear>())
        .expect("a built Linear module")
}

#[test]
fn test_class_builds_from_its_own_path() {
    let mut config = Config::new();
    config.set("encoder", ClassRef::of::<Linear>()).unwrap();
    config.set("encoder.in_features", 4).unwrap();

    let template = config.get("encoder").unwrap();
    let built = config.select("encoder").build_object(&template).unwrap();
    assert_eq!(
        linear_of(&built),
        &Linear {
            in_features: 4,
            out_features: 4
        }
    );
}

#[test]
fn test_get_parameters_builds_children() {
    let mut config = Config::new();
    config.set("model.head", ClassRef::of::<Linear>()).unwrap();
    config.set("model.head.in_features", 8).unwrap();
    config.set("model.head.out_features", 2).unwrap();
    config.set("model.name", "tiny").unwrap();

    let params = config.select("model").get_parameters().unwrap();
    assert_eq!(params["name"], Value::from("tiny"));
    assert_eq!(
        linear_of(&params["head"]),
        &Linear {
            in_features: 8,
            out_features: 2
        }
    );
}

#[test]
fn test_list_of_classes_builds_per_index() {
    let config = Config::new()
        .select("net")
        .assign(Value::Template(Arc::new(Sequential)))
        .unwrap()
        .select("net")
        .select("layers")
        .assign(vec![
            Value::Class(ClassRef::of::<Linear>()),
            Value::Class(ClassRef::of::<Linear>()),
        ])
        .unwrap()
        .select("net")
        .select("layers")
        .populate("in_features", Populator::values([16, 8]), None)
        .unwrap();

    let net = config.get("net").unwrap();
    let built = config.select("net").build_object(&net).unwrap();
    let layers = built.as_list().unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(linear_of(&layers[0]).in_features, 16);
    assert_eq!(linear_of(&layers[1]).in_features, 8);
}

#[test]
fn test_built_modules_pass_through() {
    let module = Module::new(Linear {
        in_features: 1,
        out_features: 1,
    });
    let mut config = Config::new();
    config.set("layer", module.clone()).unwrap();

    let value = config.get("layer").unwrap();
    let built = config.select("layer").build_object(&value).unwrap();
    assert!(built.as_module().unwrap().ptr_eq(&module));
}

#[test]
fn test_factory_arguments_are_built_recursively() {
    let pair = Factory::new("pair", &["left", "right"], |args| {
        Ok(Value::List(vec![
            args.require("left")?.clone(),
            args.require("right")?.clone(),
        ]))
    });

    let mut config = Config::new();
    config.set("pair", pair).unwrap();
    config.set("pair.left", ClassRef::of::<Linear>()).unwrap();
    config.set("pair.left.in_features", 3).unwrap();
    config.set("pair.right", 9).unwrap();
    config.set("pair.unused", 0).unwrap();

    let factory = config.get("pair").unwrap();
    let built = config.select("pair").build_object(&factory).unwrap();
    let items = built.as_list().unwrap();
    assert_eq!(linear_of(&items[0]).in_features, 3);
    assert_eq!(items[1], Value::Int(9));
}

#[test]
fn test_variadic_factory_receives_everything() {
    let count = Factory::variadic("count", |args| Ok(Value::from(args.len())));
    let config = Config::new()
        .select("c")
        .configure([("a", 1), ("b", 2), ("c", 3)])
        .unwrap();
    let built = config
        .select("c")
        .build_object(&Value::Factory(count))
        .unwrap();
    assert_eq!(built, Value::Int(3));
}

#[test]
fn test_missing_required_parameter_fails() {
    let config = Config::new()
        .select("encoder")
        .assign(ClassRef::of::<Linear>())
        .unwrap();
    let template = config.get("encoder").unwrap();
    assert!(matches!(
        config.select("encoder").build_object(&template),
        Err(ConfigError::NoMatch { .. })
    ));
}
