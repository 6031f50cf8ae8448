//! Object materialization

use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::object::{match_signature, Arguments};
use crate::value::Value;
use crate::Config;

impl Config {
    /// Turn a resolved value into a built object, using this configuration
    /// (rooted at the value's own path) for its parameters.
    ///
    /// - lists build element-wise, each element under its index,
    /// - templates and classes build themselves from the configuration,
    /// - modules pass through unchanged,
    /// - factories get their declared parameters resolved, built and bound
    ///   by name, then are called,
    /// - anything else is returned as is.
    pub fn build_object(&self, value: &Value) -> Result<Value> {
        match value {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.index(i as i64)?.build_object(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Value::Template(template) => template.from_config(self),
            Value::Class(class) => class.from_config(self),
            Value::Module(_) => Ok(value.clone()),
            Value::Factory(factory) => {
                let available = self.get_parameters_raw()?;
                let bound = match_signature(factory.signature(), available);
                debug!(
                    context = %self.context,
                    factory = factory.name(),
                    arguments = ?bound.keys().collect::<Vec<_>>(),
                    "calling factory"
                );
                let arguments = self.initialize(bound)?;
                factory.call(Arguments::new(arguments))
            }
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => {
                Ok(value.clone())
            }
        }
    }

    /// Build every value under its own key.
    pub(crate) fn initialize(&self, values: IndexMap<String, Value>) -> Result<IndexMap<String, Value>> {
        values
            .into_iter()
            .map(|(key, value)| {
                let built = self.select(&key).build_object(&value)?;
                Ok((key, built))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Buildable, ClassRef, Factory, FromConfig, Module};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Width;

    impl FromConfig for Width {
        fn from_config(config: &Config) -> Result<Value> {
            config.get_or("width", 1)
        }
    }

    #[derive(Debug)]
    struct Doubled;

    impl Buildable for Doubled {
        fn from_config(&self, config: &Config) -> Result<Value> {
            let width = config.get("width")?.as_i64().unwrap_or(0);
            Ok(Value::Int(width * 2))
        }
    }

    #[test]
    fn test_literals_pass_through() {
        let config = Config::new();
        assert_eq!(config.build_object(&Value::Int(3)).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_module_passes_through() {
        let module = Module::new(7u32);
        let built = Config::new()
            .build_object(&Value::Module(module.clone()))
            .unwrap();
        assert!(built.as_module().unwrap().ptr_eq(&module));
    }

    #[test]
    fn test_class_and_template_build_from_config() {
        let config = Config::new()
            .select("layer")
            .configure([("width", 4)])
            .unwrap()
            .select("layer");
        let class = Value::Class(ClassRef::of::<Width>());
        assert_eq!(config.build_object(&class).unwrap(), Value::Int(4));

        let template: Arc<dyn Buildable> = Arc::new(Doubled);
        assert_eq!(
            config.build_object(&Value::Template(template)).unwrap(),
            Value::Int(8)
        );
    }

    #[test]
    fn test_factory_binds_declared_parameters() {
        let add = Factory::new("add", &["a", "b"], |args| {
            Ok(Value::Int(args.require_i64("a")? + args.require_i64("b")?))
        });
        let config = Config::new()
            .select("sum")
            .configure([("a", 2), ("b", 3), ("c", 100)])
            .unwrap()
            .select("sum");
        assert_eq!(config.build_object(&Value::Factory(add)).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_list_builds_under_each_index() {
        let config = Config::new()
            .select("layers")
            .populate("width", crate::Populator::values([2, 3]), None)
            .unwrap()
            .select("layers");
        let items = Value::List(vec![
            Value::Class(ClassRef::of::<Width>()),
            Value::Class(ClassRef::of::<Width>()),
        ]);
        assert_eq!(
            config.build_object(&items).unwrap(),
            Value::List(vec![Value::Int(2), Value::Int(3)])
        );
    }
}
