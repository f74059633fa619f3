//! Parameter slots for one rendered statement.
//!
//! The registry decides, while SQL text is being written, which placeholder a
//! parameter node uses. The resulting [`ParameterPlan`] turns the host's
//! named values into driver parameters at execution time.

use std::collections::{HashMap, HashSet};

use glacier_types::{DbParameter, StoreValue, TypeMapping, TypeMappingSource};
use smol_str::SmolStr;

use crate::error::{QueryError, QueryResult};
use crate::expr::ParameterKind;

/// A parameter slot in rendered SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    name: String,
    host_name: SmolStr,
    kind: ParameterKind,
    type_mapping: Option<TypeMapping>,
}

impl QueryParameter {
    /// The name used in SQL, without the placeholder prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name the host knows the value by.
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// How the value is obtained.
    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    /// The type mapping the value is bound with, if known.
    pub fn type_mapping(&self) -> Option<&TypeMapping> {
        self.type_mapping.as_ref()
    }

    fn can_share(&self, host_name: &str, kind: &ParameterKind, mapping: Option<&TypeMapping>) -> bool {
        if matches!(kind, ParameterKind::User) || matches!(self.kind, ParameterKind::User) {
            return false;
        }
        self.host_name == host_name && self.kind == *kind && same_binding(self.type_mapping.as_ref(), mapping)
    }
}

/// Two mappings bind the same way when store type and converter match exactly.
fn same_binding(a: Option<&TypeMapping>, b: Option<&TypeMapping>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.store_type().eq_ignore_ascii_case(b.store_type()) && a.converter() == b.converter()
        }
        _ => false,
    }
}

/// Collects parameter slots while a statement is rendered.
#[derive(Debug, Default)]
pub(crate) struct ParameterRegistry {
    parameters: Vec<QueryParameter>,
    used_names: HashSet<String>,
}

impl ParameterRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a parameter node and return its SQL name.
    pub(crate) fn register(
        &mut self,
        host_name: &str,
        kind: &ParameterKind,
        mapping: Option<&TypeMapping>,
    ) -> String {
        if let Some(existing) = self
            .parameters
            .iter()
            .find(|p| p.can_share(host_name, kind, mapping))
        {
            return existing.name.clone();
        }

        let name = self.unique_name(host_name);
        self.used_names.insert(name.clone());
        self.parameters.push(QueryParameter {
            name: name.clone(),
            host_name: SmolStr::new(host_name),
            kind: kind.clone(),
            type_mapping: mapping.cloned(),
        });
        name
    }

    fn unique_name(&self, host_name: &str) -> String {
        if !self.used_names.contains(host_name) {
            return host_name.to_string();
        }
        (1..)
            .map(|n| format!("{}_{}", host_name, n))
            .find(|candidate| !self.used_names.contains(candidate))
            .unwrap_or_else(|| host_name.to_string())
    }

    pub(crate) fn into_plan(self) -> ParameterPlan {
        ParameterPlan {
            parameters: self.parameters,
        }
    }
}

/// The ordered parameters of a rendered statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterPlan {
    parameters: Vec<QueryParameter>,
}

impl ParameterPlan {
    /// The parameter slots in placeholder order.
    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if the statement has no parameters.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Build driver parameters from the host's named values.
    ///
    /// Derived LIKE parameters are computed from their source value; a null
    /// source yields a null pattern.
    pub fn materialize(&self, values: &HashMap<String, StoreValue>) -> QueryResult<Vec<DbParameter>> {
        let types = TypeMappingSource::shared();
        self.parameters
            .iter()
            .map(|parameter| {
                let value = match &parameter.kind {
                    ParameterKind::Derived { source, affix, escape } => {
                        match values.get(source.as_str()) {
                            None => return Err(QueryError::missing_parameter(source)),
                            Some(StoreValue::Null) => StoreValue::Null,
                            Some(StoreValue::String(text)) => {
                                StoreValue::String(affix.apply(text, *escape))
                            }
                            Some(other) => {
                                return Err(QueryError::invalid_parameter(
                                    source,
                                    format!("pattern must be text, got {:?}", other),
                                ));
                            }
                        }
                    }
                    ParameterKind::Anonymous | ParameterKind::User => values
                        .get(parameter.host_name.as_str())
                        .cloned()
                        .ok_or_else(|| QueryError::missing_parameter(&parameter.host_name))?,
                };

                let mapping = match &parameter.type_mapping {
                    Some(mapping) => mapping.clone(),
                    None => types.find_for_value(&value).ok_or_else(|| {
                        QueryError::invalid_parameter(&parameter.name, "no type mapping for value")
                    })?,
                };
                Ok(mapping.create_parameter(parameter.name.clone(), value, true))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::expr::LikeAffix;
    use glacier_types::{BindingType, ValueConverter};
    use pretty_assertions::assert_eq;

    fn varchar() -> TypeMapping {
        TypeMappingSource::shared().find_store_type("VARCHAR(50)").unwrap()
    }

    #[test]
    fn test_anonymous_parameters_are_shared() {
        let mut registry = ParameterRegistry::new();
        let a = registry.register("city", &ParameterKind::Anonymous, Some(&varchar()));
        let b = registry.register("city", &ParameterKind::Anonymous, Some(&varchar()));
        assert_eq!(a, "city");
        assert_eq!(b, "city");
        assert_eq!(registry.into_plan().len(), 1);
    }

    #[test]
    fn test_different_binding_gets_new_slot() {
        let mut registry = ParameterRegistry::new();
        let text = varchar();
        let converted = text.with_converter(ValueConverter::named("upper"));
        let a = registry.register("city", &ParameterKind::Anonymous, Some(&text));
        let b = registry.register("city", &ParameterKind::Anonymous, Some(&converted));
        assert_eq!(a, "city");
        assert_eq!(b, "city_1");
    }

    #[test]
    fn test_user_parameters_never_merge() {
        let mut registry = ParameterRegistry::new();
        let a = registry.register("id", &ParameterKind::User, None);
        let b = registry.register("id", &ParameterKind::User, None);
        let c = registry.register("id", &ParameterKind::User, None);
        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("id", "id_1", "id_2"));
    }

    #[test]
    fn test_materialize_derived_pattern() {
        let mut registry = ParameterRegistry::new();
        let kind = ParameterKind::Derived {
            source: SmolStr::new("prefix"),
            affix: LikeAffix::StartsWith,
            escape: '\\',
        };
        registry.register("prefix_startswith", &kind, Some(&varchar()));
        let plan = registry.into_plan();

        let mut values = HashMap::new();
        values.insert("prefix".to_string(), StoreValue::from("50%"));
        let params = plan.materialize(&values).unwrap();
        assert_eq!(params[0].name, "prefix_startswith");
        assert_eq!(params[0].value, StoreValue::from("50\\%%"));
        assert_eq!(params[0].binding, BindingType::Text);

        values.insert("prefix".to_string(), StoreValue::Null);
        assert_eq!(plan.materialize(&values).unwrap()[0].value, StoreValue::Null);
    }

    #[test]
    fn test_materialize_infers_mapping() {
        let mut registry = ParameterRegistry::new();
        registry.register("n", &ParameterKind::Anonymous, None);
        let plan = registry.into_plan();

        let mut values = HashMap::new();
        values.insert("n".to_string(), StoreValue::from(7i64));
        let params = plan.materialize(&values).unwrap();
        assert_eq!(params[0].binding, BindingType::Fixed);
    }

    #[test]
    fn test_materialize_missing_value() {
        let mut registry = ParameterRegistry::new();
        registry.register("n", &ParameterKind::Anonymous, None);
        let err = registry.into_plan().materialize(&HashMap::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingParameter);
    }
}
