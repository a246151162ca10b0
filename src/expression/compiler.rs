use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::expression::{AttributePath, KeyCondition, Predicate, SortCondition};

/// Expression attribute names and values collected while compiling
pub type AttributeMaps = (
    Option<HashMap<String, String>>,
    Option<HashMap<String, AttributeValue>>,
);

/// Renders key conditions, filters, projections and updates into DynamoDB's
/// expression language
///
/// Every attribute name segment goes through a `#n*` placeholder and every
/// operand through a `:v*` placeholder, so reserved words and nested paths need
/// no special handling. Placeholders already present in the seeded maps are
/// never overwritten.
#[derive(Debug, Default)]
pub struct ExpressionCompiler {
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
    next_name: usize,
    next_value: usize,
}

impl ExpressionCompiler {
    /// Compiler with empty placeholder maps
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler seeded with the names and values a request already carries
    pub fn with_existing(names: HashMap<String, String>, values: HashMap<String, AttributeValue>) -> Self {
        Self {
            names,
            values,
            ..Self::default()
        }
    }

    /// Placeholder for one attribute name segment, reused when the segment was already mapped
    fn name(&mut self, segment: &str) -> String {
        if let Some((placeholder, _)) = self.names.iter().find(|(_, name)| name.as_str() == segment) {
            return placeholder.clone();
        }

        loop {
            let placeholder = format!("#n{}", self.next_name);
            self.next_name += 1;
            if !self.names.contains_key(&placeholder) {
                let _ = self.names.insert(placeholder.clone(), segment.to_string());
                return placeholder;
            }
        }
    }

    fn path(&mut self, path: &AttributePath) -> String {
        path.segments()
            .iter()
            .map(|segment| self.name(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn value(&mut self, value: AttributeValue) -> String {
        loop {
            let placeholder = format!(":v{}", self.next_value);
            self.next_value += 1;
            if !self.values.contains_key(&placeholder) {
                let _ = self.values.insert(placeholder.clone(), value);
                return placeholder;
            }
        }
    }

    /// `#pk = :v` optionally followed by the sort-key condition
    pub fn key_condition(&mut self, condition: &KeyCondition) -> String {
        let partition_key = self.name(&condition.partition_key);
        let partition_value = self.value(condition.partition_value.clone());
        let mut expression = format!("{partition_key} = {partition_value}");

        match &condition.sort {
            None => {}
            Some(SortCondition::Equal(name, value)) => {
                let name = self.name(name);
                let value = self.value(value.clone());
                expression.push_str(&format!(" AND {name} = {value}"));
            }
            Some(SortCondition::Between(name, start, end)) => {
                let name = self.name(name);
                let start = self.value(start.clone());
                let end = self.value(end.clone());
                expression.push_str(&format!(" AND {name} BETWEEN {start} AND {end}"));
            }
        }

        expression
    }

    /// AND-joined filter expression, `None` when there is nothing to filter on
    pub fn filter(&mut self, predicates: &[Predicate]) -> Option<String> {
        if predicates.is_empty() {
            return None;
        }

        let conditions: Vec<String> = predicates
            .iter()
            .map(|predicate| match predicate {
                Predicate::Equal(path, value) => {
                    let path = self.path(path);
                    format!("{path} = {}", self.value(value.clone()))
                }
                Predicate::NotEqual(path, value) => {
                    let path = self.path(path);
                    format!("{path} <> {}", self.value(value.clone()))
                }
                Predicate::Contains(path, value) => {
                    let path = self.path(path);
                    format!("contains({path}, {})", self.value(value.clone()))
                }
                Predicate::Exists(path) => format!("attribute_exists({})", self.path(path)),
                Predicate::NotExists(path) => format!("attribute_not_exists({})", self.path(path)),
            })
            .collect();

        Some(conditions.join(" AND "))
    }

    /// Comma-separated projection expression, `None` to fetch every attribute
    pub fn projection(&mut self, paths: &[AttributePath]) -> Option<String> {
        if paths.is_empty() {
            return None;
        }

        Some(
            paths
                .iter()
                .map(|path| self.path(path))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    /// `SET #a = :v, ...` update expression
    pub fn update(&mut self, assignments: &[(String, AttributeValue)]) -> String {
        let assignments: Vec<String> = assignments
            .iter()
            .map(|(field, value)| {
                let field = self.name(field);
                format!("{field} = {}", self.value(value.clone()))
            })
            .collect();

        format!("SET {}", assignments.join(", "))
    }

    /// Placeholder maps to attach to the request, `None` when empty
    pub fn into_attribute_maps(self) -> AttributeMaps {
        let names = (!self.names.is_empty()).then_some(self.names);
        let values = (!self.values.is_empty()).then_some(self.values);
        (names, values)
    }
}
