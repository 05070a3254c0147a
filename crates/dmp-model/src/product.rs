//! Data product records
//!
//! [`ProductInput`] is what callers send; [`Product`] is what the catalog
//! stores and returns. Both share [`ProductAttributes`], the descriptive
//! string fields. Inbound parsing is lenient: missing or `null` optional
//! fields become `""`, and `tags` that are absent or not a list become an
//! empty list.

use crate::error::ValidationError;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Number of descriptive string columns, `name` included
pub const ATTRIBUTE_COUNT: usize = 20;

/// Descriptive column names in storage order
pub const ATTRIBUTE_COLUMNS: [&str; ATTRIBUTE_COUNT] = [
    "name",
    "description",
    "purpose",
    "type",
    "domain",
    "region",
    "owner",
    "certified",
    "classification",
    "gxp",
    "interval_of_change",
    "last_updated_date",
    "first_publish_date",
    "next_reassessment_date",
    "security_considerations",
    "sub_domain",
    "databricks_url",
    "tableau_url",
    "qlik_url",
    "data_contract_url",
];

/// Descriptive fields shared by inbound and stored products
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductAttributes {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub purpose: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub product_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub domain: String,
    #[serde(deserialize_with = "lenient_string")]
    pub region: String,
    #[serde(deserialize_with = "lenient_string")]
    pub owner: String,
    #[serde(deserialize_with = "lenient_string")]
    pub certified: String,
    #[serde(deserialize_with = "lenient_string")]
    pub classification: String,
    #[serde(deserialize_with = "lenient_string")]
    pub gxp: String,
    #[serde(deserialize_with = "lenient_string")]
    pub interval_of_change: String,
    #[serde(deserialize_with = "lenient_string")]
    pub last_updated_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub first_publish_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub next_reassessment_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub security_considerations: String,
    #[serde(alias = "business_function", deserialize_with = "lenient_string")]
    pub sub_domain: String,
    #[serde(deserialize_with = "lenient_string")]
    pub databricks_url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tableau_url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub qlik_url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub data_contract_url: String,
}

impl ProductAttributes {
    /// Attributes with only a name set
    #[inline]
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Values in [`ATTRIBUTE_COLUMNS`] order
    #[must_use]
    pub fn column_values(&self) -> [&str; ATTRIBUTE_COUNT] {
        [
            self.name.as_str(),
            self.description.as_str(),
            self.purpose.as_str(),
            self.product_type.as_str(),
            self.domain.as_str(),
            self.region.as_str(),
            self.owner.as_str(),
            self.certified.as_str(),
            self.classification.as_str(),
            self.gxp.as_str(),
            self.interval_of_change.as_str(),
            self.last_updated_date.as_str(),
            self.first_publish_date.as_str(),
            self.next_reassessment_date.as_str(),
            self.security_considerations.as_str(),
            self.sub_domain.as_str(),
            self.databricks_url.as_str(),
            self.tableau_url.as_str(),
            self.qlik_url.as_str(),
            self.data_contract_url.as_str(),
        ]
    }

    /// Rebuild from values in [`ATTRIBUTE_COLUMNS`] order
    #[must_use]
    pub fn from_column_values(values: [String; ATTRIBUTE_COUNT]) -> Self {
        let [
            name,
            description,
            purpose,
            product_type,
            domain,
            region,
            owner,
            certified,
            classification,
            gxp,
            interval_of_change,
            last_updated_date,
            first_publish_date,
            next_reassessment_date,
            security_considerations,
            sub_domain,
            databricks_url,
            tableau_url,
            qlik_url,
            data_contract_url,
        ] = values;
        Self {
            name,
            description,
            purpose,
            product_type,
            domain,
            region,
            owner,
            certified,
            classification,
            gxp,
            interval_of_change,
            last_updated_date,
            first_publish_date,
            next_reassessment_date,
            security_considerations,
            sub_domain,
            databricks_url,
            tableau_url,
            qlik_url,
            data_contract_url,
        }
    }

    /// Whether the required name is present
    #[inline]
    #[must_use]
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Product as submitted by a caller; `id` is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub attributes: ProductAttributes,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
}

impl ProductInput {
    /// Input with only a name
    #[inline]
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            attributes: ProductAttributes::named(name),
            tags: Vec::new(),
        }
    }

    /// With explicit id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// With tags (normalized)
    #[inline]
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// Caller-supplied id, if any; blank ids count as absent
    #[inline]
    #[must_use]
    pub fn explicit_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Check required fields for the record at `index`
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingName`] when `name` is blank
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if self.attributes.has_name() {
            Ok(())
        } else {
            Err(ValidationError::MissingName { index })
        }
    }

    /// Stored form under the final `id`
    #[must_use]
    pub fn into_product(self, id: impl Into<String>) -> Product {
        Product {
            id: id.into(),
            attributes: self.attributes,
            tags: normalize_tags(self.tags),
        }
    }

    /// Parse a replace-all payload
    ///
    /// # Errors
    /// Rejects non-array payloads, non-object elements, and elements whose
    /// fields cannot be coerced. Does not check `name`; see [`validate_batch`].
    pub fn batch_from_json(payload: Value) -> Result<Vec<Self>, ValidationError> {
        let Value::Array(items) = payload else {
            return Err(ValidationError::NotAnArray);
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| Self::from_json(index, item))
            .collect()
    }

    /// Parse a single product object reported at `index`
    ///
    /// # Errors
    /// Rejects non-object values and uncoercible fields
    pub fn from_json(index: usize, item: Value) -> Result<Self, ValidationError> {
        if !item.is_object() {
            return Err(ValidationError::NotAnObject { index });
        }
        serde_json::from_value(item).map_err(|e| ValidationError::Malformed {
            index,
            reason: e.to_string(),
        })
    }
}

impl From<Product> for ProductInput {
    fn from(product: Product) -> Self {
        Self {
            id: Some(product.id),
            attributes: product.attributes,
            tags: product.tags,
        }
    }
}

/// Stored catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(flatten)]
    pub attributes: ProductAttributes,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
}

impl Product {
    /// Product name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    /// Check the stored-record invariants (non-blank id and name)
    ///
    /// # Errors
    /// Returns a description of the first broken invariant
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("empty id".to_string());
        }
        if !self.attributes.has_name() {
            return Err(format!("product {} has empty name", self.id));
        }
        Ok(())
    }
}

/// Reject the whole batch if any record fails validation
///
/// # Errors
/// Returns the first failing record's [`ValidationError`]
pub fn validate_batch(inputs: &[ProductInput]) -> Result<(), ValidationError> {
    inputs
        .iter()
        .enumerate()
        .try_for_each(|(index, input)| input.validate(index))
}

/// Trim, drop blanks, and deduplicate tags keeping first occurrence order
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter_map(|tag| {
            let trimmed = tag.as_ref().trim();
            (!trimmed.is_empty() && seen.insert(trimmed.to_string()))
                .then(|| trimmed.to_string())
        })
        .collect()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(de::Error::custom(format!(
            "expected string, found {}",
            kind_of(&other)
        ))),
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = lenient_string(deserializer)?;
    Ok((!id.trim().is_empty()).then_some(id))
}

fn lenient_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    Ok(normalize_tags(tags))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn missing_fields_default_to_empty() {
        let input = ProductInput::from_json(0, json!({"name": "Sales Analytics"})).unwrap();
        assert_eq!(input.id, None);
        assert_eq!(input.attributes.name, "Sales Analytics");
        assert_eq!(input.attributes.description, "");
        assert_eq!(input.attributes.data_contract_url, "");
        assert!(input.tags.is_empty());
    }

    #[test]
    fn nulls_become_empty_strings() {
        let input = ProductInput::from_json(
            0,
            json!({"id": null, "name": "A", "owner": null, "tags": null}),
        )
        .unwrap();
        assert_eq!(input.id, None);
        assert_eq!(input.attributes.owner, "");
        assert!(input.tags.is_empty());
    }

    #[test]
    fn blank_id_counts_as_absent() {
        let input = ProductInput::from_json(0, json!({"id": "   ", "name": "A"})).unwrap();
        assert_eq!(input.explicit_id(), None);
    }

    #[test]
    fn non_pattern_id_is_kept_verbatim() {
        let input = ProductInput::from_json(0, json!({"id": "legacy-7", "name": "A"})).unwrap();
        assert_eq!(input.explicit_id(), Some("legacy-7"));
    }

    #[test]
    fn non_list_tags_normalize_to_empty() {
        let input =
            ProductInput::from_json(0, json!({"name": "A", "tags": "sales, finance"})).unwrap();
        assert!(input.tags.is_empty());
    }

    #[test]
    fn tags_are_trimmed_deduplicated_and_blank_dropped() {
        let input = ProductInput::from_json(
            0,
            json!({"name": "A", "tags": [" sales ", "", "  ", "sales", 7, "finance"]}),
        )
        .unwrap();
        assert_eq!(input.tags, vec!["sales".to_string(), "finance".to_string()]);
    }

    #[test]
    fn type_field_and_legacy_alias() {
        let input = ProductInput::from_json(
            0,
            json!({"name": "A", "type": "Dataset", "business_function": "Finance"}),
        )
        .unwrap();
        assert_eq!(input.attributes.product_type, "Dataset");
        assert_eq!(input.attributes.sub_domain, "Finance");
    }

    #[test]
    fn numbers_coerce_to_strings() {
        let input = ProductInput::from_json(0, json!({"name": "A", "certified": 1})).unwrap();
        assert_eq!(input.attributes.certified, "1");
    }

    #[test]
    fn nested_values_are_malformed() {
        let err = ProductInput::from_json(2, json!({"name": {"first": "A"}})).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { index: 2, .. }));
    }

    #[test]
    fn batch_requires_array_of_objects() {
        assert_eq!(
            ProductInput::batch_from_json(json!({"name": "A"})).unwrap_err(),
            ValidationError::NotAnArray
        );
        assert_eq!(
            ProductInput::batch_from_json(json!([{"name": "A"}, "B"])).unwrap_err(),
            ValidationError::NotAnObject { index: 1 }
        );
    }

    #[test]
    fn validate_batch_reports_first_missing_name() {
        let batch = vec![
            ProductInput::named("A"),
            ProductInput::named("  "),
            ProductInput::named(""),
        ];
        assert_eq!(
            validate_batch(&batch).unwrap_err(),
            ValidationError::MissingName { index: 1 }
        );
    }

    #[test]
    fn stored_form_serializes_every_field() {
        let product = ProductInput::named("A")
            .with_tags(["x"])
            .into_product("DP0001");
        let value = serde_json::to_value(&product).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object["id"], "DP0001");
        assert_eq!(object["type"], "");
        assert_eq!(object["tags"], json!(["x"]));
        for column in ATTRIBUTE_COLUMNS {
            assert!(object.contains_key(column), "missing {column}");
        }
        assert_eq!(object.len(), ATTRIBUTE_COUNT + 2);
    }

    #[test]
    fn column_values_round_trip() {
        let mut attrs = ProductAttributes::named("A");
        attrs.gxp = "GxP".to_string();
        attrs.qlik_url = "https://qlik.example/app".to_string();
        let values = attrs.column_values().map(str::to_string);
        assert_eq!(ProductAttributes::from_column_values(values), attrs);
    }

    #[test]
    fn invariants_reject_blank_name() {
        let product = ProductInput::named(" ").into_product("DP0001");
        assert!(product.check_invariants().is_err());
        let product = ProductInput::named("A").into_product("");
        assert!(product.check_invariants().is_err());
    }
}
