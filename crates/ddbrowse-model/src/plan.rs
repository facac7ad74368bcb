//! Query execution plans.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

/// How a query expression should be run against the table.
///
/// A plan with `can_query` set carries a key condition and no filter; a scan
/// plan carries a filter and no key condition. Conditions reference attribute
/// names through `#n` placeholders and values through `:n` placeholders, bound
/// in `name_bindings` and `value_bindings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExecutionPlan {
    /// Whether the plan is a keyed Query rather than a Scan.
    pub can_query: bool,
    /// The secondary index to query, when not the table itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// The key condition expression of a Query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_condition: Option<String>,
    /// The filter expression of a Scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_condition: Option<String>,
    /// `#n` placeholder to attribute name.
    #[serde(default)]
    pub name_bindings: BTreeMap<String, String>,
    /// `:n` placeholder to attribute value.
    #[serde(default)]
    pub value_bindings: BTreeMap<String, AttributeValue>,
}

impl QueryExecutionPlan {
    /// The attribute name bound to a `#n` placeholder.
    #[must_use]
    pub fn name(&self, placeholder: &str) -> Option<&str> {
        self.name_bindings.get(placeholder).map(String::as_str)
    }

    /// The value bound to a `:n` placeholder.
    #[must_use]
    pub fn value(&self, placeholder: &str) -> Option<&AttributeValue> {
        self.value_bindings.get(placeholder)
    }

    /// The condition that drives the plan: the key condition of a Query or
    /// the filter of a Scan.
    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        if self.can_query {
            self.key_condition.as_deref()
        } else {
            self.filter_condition.as_deref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_plan_as_camel_case() {
        let mut plan = QueryExecutionPlan {
            can_query: true,
            key_condition: Some("#0 = :0".to_owned()),
            ..Default::default()
        };
        plan.name_bindings.insert("#0".to_owned(), "pk".to_owned());
        plan.value_bindings.insert(":0".to_owned(), AttributeValue::string("x"));

        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(
            json,
            r##"{"canQuery":true,"keyCondition":"#0 = :0","nameBindings":{"#0":"pk"},"valueBindings":{":0":{"S":"x"}}}"##
        );
        assert_eq!(plan.condition(), Some("#0 = :0"));
        assert_eq!(plan.name("#0"), Some("pk"));
    }
}
