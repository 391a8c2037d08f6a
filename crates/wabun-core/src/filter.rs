//! Metadata filter composition.
//!
//! [`FilterComposer`] turns field → constraint entries into a
//! [`FilterPredicate`] tree, checking every field against the collection
//! schema and every value against the field's kind. Composition is pure;
//! the predicate is evaluated later by the vector index.
//!
//! Two front ends produce the same predicates: the typed builder
//!
//! ```text
//! FilterComposer::new(CollectionKind::Interactions)
//!     .eq("invoked_actor", "ARESK")
//!     .at_least("importance", 4)
//!     .build()?
//! ```
//!
//! and a JSON object mapping, where a literal means equality, `{"in": [...]}`
//! means membership and `{"min": .., "max": ..}` an inclusive range.

use serde::Serialize;
use serde_json::Value;

use crate::errors::{Result, SchemaError};
use crate::schema::{
    CollectionKind, CyclePhase, DecisionStatus, FieldKind, MetadataMap, MetadataValue, Role,
};

/// A composed metadata predicate.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum FilterPredicate {
    /// Field equals value.
    Eq {
        /// Field name.
        field: String,
        /// Expected value.
        value: MetadataValue,
    },
    /// Numeric field within inclusive bounds.
    Range {
        /// Field name.
        field: String,
        /// Inclusive lower bound.
        min: Option<MetadataValue>,
        /// Inclusive upper bound.
        max: Option<MetadataValue>,
    },
    /// Field equals one of the values.
    In {
        /// Field name.
        field: String,
        /// Accepted values.
        values: Vec<MetadataValue>,
    },
    /// Every clause holds. An empty conjunction matches everything.
    And {
        /// Conjoined clauses.
        clauses: Vec<FilterPredicate>,
    },
}

impl FilterPredicate {
    /// Evaluate against one fragment's flat metadata. A missing field never
    /// matches.
    pub fn matches(&self, metadata: &MetadataMap) -> bool {
        match self {
            Self::Eq { field, value } => metadata.get(field).is_some_and(|v| v.loosely_eq(value)),
            Self::Range { field, min, max } => {
                let Some(actual) = metadata.get(field).and_then(MetadataValue::as_f64) else {
                    return false;
                };
                let above = min
                    .as_ref()
                    .and_then(MetadataValue::as_f64)
                    .is_none_or(|lo| actual >= lo);
                let below = max
                    .as_ref()
                    .and_then(MetadataValue::as_f64)
                    .is_none_or(|hi| actual <= hi);
                above && below
            }
            Self::In { field, values } => metadata
                .get(field)
                .is_some_and(|v| values.iter().any(|candidate| v.loosely_eq(candidate))),
            Self::And { clauses } => clauses.iter().all(|c| c.matches(metadata)),
        }
    }

    /// Conjoin `self` with `other`, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut clauses = match self {
            Self::And { clauses } => clauses,
            single => vec![single],
        };
        match other {
            Self::And { clauses: more } => clauses.extend(more),
            single => clauses.push(single),
        }
        Self::And { clauses }
    }
}

/// Constraint on one field.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    /// Equality with a literal.
    Equals(MetadataValue),
    /// Inclusive numeric range; at least one bound required.
    Range {
        /// Lower bound.
        min: Option<MetadataValue>,
        /// Upper bound.
        max: Option<MetadataValue>,
    },
    /// Membership in a non-empty set.
    OneOf(Vec<MetadataValue>),
}

/// Builder for [`FilterPredicate`]s over one collection's schema.
#[derive(Clone, Debug)]
pub struct FilterComposer {
    collection: CollectionKind,
    entries: Vec<(String, Constraint)>,
}

impl FilterComposer {
    /// Start an empty filter for `collection`.
    pub fn new(collection: CollectionKind) -> Self {
        Self {
            collection,
            entries: Vec::new(),
        }
    }

    /// Add an arbitrary constraint.
    #[must_use]
    pub fn constraint(mut self, field: impl Into<String>, constraint: Constraint) -> Self {
        self.entries.push((field.into(), constraint));
        self
    }

    /// `field == value`.
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.constraint(field, Constraint::Equals(value.into()))
    }

    /// `field >= min`.
    #[must_use]
    pub fn at_least(self, field: impl Into<String>, min: impl Into<MetadataValue>) -> Self {
        self.constraint(
            field,
            Constraint::Range {
                min: Some(min.into()),
                max: None,
            },
        )
    }

    /// `field <= max`.
    #[must_use]
    pub fn at_most(self, field: impl Into<String>, max: impl Into<MetadataValue>) -> Self {
        self.constraint(
            field,
            Constraint::Range {
                min: None,
                max: Some(max.into()),
            },
        )
    }

    /// `min <= field <= max`.
    #[must_use]
    pub fn between(
        self,
        field: impl Into<String>,
        min: impl Into<MetadataValue>,
        max: impl Into<MetadataValue>,
    ) -> Self {
        self.constraint(
            field,
            Constraint::Range {
                min: Some(min.into()),
                max: Some(max.into()),
            },
        )
    }

    /// `field ∈ values`.
    #[must_use]
    pub fn one_of<V: Into<MetadataValue>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.constraint(
            field,
            Constraint::OneOf(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Parse a JSON object mapping into a composer.
    pub fn from_json(collection: CollectionKind, filter: &Value) -> Result<Self> {
        let Value::Object(entries) = filter else {
            return Err(SchemaError::validation("filter must be a JSON object"));
        };
        let mut composer = Self::new(collection);
        for (field, spec) in entries {
            composer = composer.constraint(field.clone(), constraint_from_json(field, spec)?);
        }
        Ok(composer)
    }

    /// Validate every entry and compose the predicate.
    ///
    /// A single entry yields its own predicate; several are conjoined; none
    /// yields the empty conjunction.
    pub fn build(self) -> Result<FilterPredicate> {
        let collection = self.collection;
        let mut clauses = self
            .entries
            .into_iter()
            .map(|(field, constraint)| compose(collection, field, constraint))
            .collect::<Result<Vec<_>>>()?;
        if clauses.len() == 1 {
            if let Some(single) = clauses.pop() {
                return Ok(single);
            }
        }
        Ok(FilterPredicate::And { clauses })
    }
}

fn constraint_from_json(field: &str, spec: &Value) -> Result<Constraint> {
    let scalar = |v: &Value| {
        MetadataValue::from_json(v).ok_or_else(|| {
            SchemaError::validation(format!("`{field}`: {v} is not a scalar value"))
        })
    };
    match spec {
        Value::Object(obj) if obj.contains_key("in") => {
            if obj.len() != 1 {
                return Err(SchemaError::validation(format!(
                    "`{field}`: `in` cannot be combined with other keys"
                )));
            }
            let Some(Value::Array(items)) = obj.get("in") else {
                return Err(SchemaError::validation(format!("`{field}`: `in` must be an array")));
            };
            Ok(Constraint::OneOf(
                items.iter().map(scalar).collect::<Result<Vec<_>>>()?,
            ))
        }
        Value::Object(obj) => {
            if let Some(extra) = obj.keys().find(|k| *k != "min" && *k != "max") {
                return Err(SchemaError::validation(format!(
                    "`{field}`: unsupported constraint key `{extra}`"
                )));
            }
            Ok(Constraint::Range {
                min: obj.get("min").map(scalar).transpose()?,
                max: obj.get("max").map(scalar).transpose()?,
            })
        }
        other => Ok(Constraint::Equals(scalar(other)?)),
    }
}

fn compose(collection: CollectionKind, field: String, constraint: Constraint) -> Result<FilterPredicate> {
    let Some(kind) = collection.field_kind(&field) else {
        return Err(SchemaError::UnknownField {
            field,
            collection: collection.name().to_owned(),
        });
    };
    match constraint {
        Constraint::Equals(value) => {
            let value = check_value(&field, kind, value)?;
            Ok(FilterPredicate::Eq { field, value })
        }
        Constraint::OneOf(values) => {
            if values.is_empty() {
                return Err(SchemaError::validation(format!(
                    "`{field}`: membership set must not be empty"
                )));
            }
            let values = values
                .into_iter()
                .map(|v| check_value(&field, kind, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(FilterPredicate::In { field, values })
        }
        Constraint::Range { min, max } => {
            if !kind.is_numeric() {
                return Err(SchemaError::validation(format!(
                    "`{field}`: range constraint on non-numeric field"
                )));
            }
            if min.is_none() && max.is_none() {
                return Err(SchemaError::validation(format!(
                    "`{field}`: range needs `min` or `max`"
                )));
            }
            let min = min.map(|v| check_value(&field, kind, v)).transpose()?;
            let max = max.map(|v| check_value(&field, kind, v)).transpose()?;
            if let (Some(lo), Some(hi)) = (
                min.as_ref().and_then(MetadataValue::as_f64),
                max.as_ref().and_then(MetadataValue::as_f64),
            ) {
                if lo > hi {
                    return Err(SchemaError::validation(format!(
                        "`{field}`: range min {lo} exceeds max {hi}"
                    )));
                }
            }
            Ok(FilterPredicate::Range { field, min, max })
        }
    }
}

/// Check `value` against the field kind, normalizing enum spellings to
/// their stored names.
fn check_value(field: &str, kind: FieldKind, value: MetadataValue) -> Result<MetadataValue> {
    let accepted = match kind {
        FieldKind::Integer => matches!(value, MetadataValue::Int(_)),
        FieldKind::Float => value.is_numeric(),
        FieldKind::Text | FieldKind::TextList => value.as_str().is_some(),
        FieldKind::Phase | FieldKind::Role | FieldKind::Status => {
            return normalize_enum(field, kind, &value);
        }
    };
    if accepted {
        Ok(value)
    } else {
        Err(mistyped(field, &value))
    }
}

fn normalize_enum(field: &str, kind: FieldKind, value: &MetadataValue) -> Result<MetadataValue> {
    let raw = value.as_str().ok_or_else(|| mistyped(field, value))?;
    let stored = match kind {
        FieldKind::Phase => raw.parse::<CyclePhase>()?.as_str().to_owned(),
        FieldKind::Role => raw.parse::<Role>()?.as_str().to_owned(),
        _ => DecisionStatus::from_stored(raw).as_str().to_owned(),
    };
    Ok(MetadataValue::Text(stored))
}

fn mistyped(field: &str, value: &MetadataValue) -> SchemaError {
    SchemaError::validation(format!("`{field}`: value `{value}` has the wrong type"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn interactions() -> FilterComposer {
        FilterComposer::new(CollectionKind::Interactions)
    }

    fn row(pairs: &[(&str, MetadataValue)]) -> MetadataMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    // ── Composition ─────────────────────────────────────────────────────────

    #[test]
    fn single_entry_is_not_wrapped() {
        let p = interactions().eq(fields::INVOKED_ACTOR, "ARESK").build().unwrap();
        assert_eq!(
            p,
            FilterPredicate::Eq {
                field: fields::INVOKED_ACTOR.into(),
                value: "ARESK".into()
            }
        );
    }

    #[test]
    fn entries_are_conjoined_in_order() {
        let p = interactions()
            .eq(fields::INVOKED_ACTOR, "ARESK")
            .at_least(fields::IMPORTANCE, 4)
            .build()
            .unwrap();
        assert_matches!(p, FilterPredicate::And { ref clauses } if clauses.len() == 2);
    }

    #[test]
    fn empty_composer_matches_everything() {
        let p = interactions().build().unwrap();
        assert!(p.matches(&MetadataMap::new()));
    }

    #[test]
    fn unknown_field_rejected() {
        let err = interactions().eq("mood", "calm").build().unwrap_err();
        assert_matches!(err, SchemaError::UnknownField { ref field, .. } if field == "mood");
    }

    #[test]
    fn field_from_other_collection_rejected() {
        let err = FilterComposer::new(CollectionKind::Decrees)
            .eq(fields::IMPORTANCE, 3)
            .build()
            .unwrap_err();
        assert_matches!(err, SchemaError::UnknownField { ref collection, .. } if collection == "decrees");
    }

    #[test]
    fn range_on_text_field_rejected() {
        let err = interactions().at_least(fields::PROJECT, 3).build().unwrap_err();
        assert_matches!(err, SchemaError::Validation(_));
    }

    #[test]
    fn wrong_value_type_rejected() {
        let err = interactions().eq(fields::IMPORTANCE, "high").build().unwrap_err();
        assert_matches!(err, SchemaError::Validation(_));
    }

    #[test]
    fn inverted_range_rejected() {
        let err = interactions().between(fields::TIMESTAMP, 10, 5).build().unwrap_err();
        assert_matches!(err, SchemaError::Validation(_));
    }

    #[test]
    fn empty_membership_rejected() {
        let err = interactions()
            .one_of(fields::PROJECT, Vec::<String>::new())
            .build()
            .unwrap_err();
        assert_matches!(err, SchemaError::Validation(_));
    }

    #[test]
    fn enum_values_normalized() {
        let p = interactions()
            .eq(fields::DECISION_STATUS, "Propuesta")
            .eq(fields::ROLE, "Fundador")
            .eq(fields::PHASE, "observación")
            .build()
            .unwrap();
        let FilterPredicate::And { clauses } = p else {
            panic!("expected conjunction");
        };
        let values: Vec<_> = clauses
            .iter()
            .map(|c| match c {
                FilterPredicate::Eq { value, .. } => value.to_string(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(values, ["Proposed", "Requester", "Observacion"]);
    }

    #[test]
    fn invalid_role_rejected() {
        let err = interactions().eq(fields::ROLE, "Observer").build().unwrap_err();
        assert_matches!(err, SchemaError::Validation(_));
    }

    #[test]
    fn float_field_accepts_integers() {
        assert!(
            FilterComposer::new(CollectionKind::Decrees)
                .at_least(fields::VERSION, 1)
                .build()
                .is_ok()
        );
    }

    // ── JSON mapping ────────────────────────────────────────────────────────

    #[test]
    fn json_mapping_matches_builder() {
        let from_json = FilterComposer::from_json(
            CollectionKind::Interactions,
            &json!({
                "importance": {"min": 4},
                "project": {"in": ["CAELION", "General"]},
                "role": "Requester"
            }),
        )
        .unwrap()
        .build()
        .unwrap();
        let typed = interactions()
            .at_least(fields::IMPORTANCE, 4)
            .one_of(fields::PROJECT, ["CAELION", "General"])
            .eq(fields::ROLE, "Requester")
            .build()
            .unwrap();
        assert_eq!(from_json, typed);
    }

    #[test]
    fn json_rejects_non_object_and_unknown_keys() {
        assert_matches!(
            FilterComposer::from_json(CollectionKind::Interactions, &json!([1, 2])),
            Err(SchemaError::Validation(_))
        );
        assert_matches!(
            FilterComposer::from_json(CollectionKind::Interactions, &json!({"importance": {"gt": 1}})),
            Err(SchemaError::Validation(_))
        );
        assert_matches!(
            FilterComposer::from_json(CollectionKind::Interactions, &json!({"project": null})),
            Err(SchemaError::Validation(_))
        );
    }

    #[test]
    fn json_unknown_field_surfaces_at_build() {
        let composer =
            FilterComposer::from_json(CollectionKind::Interactions, &json!({"mood": "calm"})).unwrap();
        assert_matches!(composer.build(), Err(SchemaError::UnknownField { .. }));
    }

    // ── Evaluation ──────────────────────────────────────────────────────────

    #[test]
    fn range_is_inclusive() {
        let p = interactions().between(fields::IMPORTANCE, 3, 4).build().unwrap();
        for (level, expected) in [(2, false), (3, true), (4, true), (5, false)] {
            let r = row(&[(fields::IMPORTANCE, MetadataValue::Int(level))]);
            assert_eq!(p.matches(&r), expected, "level {level}");
        }
    }

    #[test]
    fn missing_field_never_matches() {
        let p = interactions().eq(fields::PROJECT, "X").build().unwrap();
        assert!(!p.matches(&MetadataMap::new()));
    }

    #[test]
    fn membership_and_conjunction() {
        let p = interactions()
            .one_of(fields::INVOKED_ACTOR, ["ARESK", "LIANG"])
            .eq(fields::ROLE, "Requester")
            .build()
            .unwrap();
        let hit = row(&[
            (fields::INVOKED_ACTOR, "LIANG".into()),
            (fields::ROLE, "Requester".into()),
        ]);
        let miss = row(&[
            (fields::INVOKED_ACTOR, "LIANG".into()),
            (fields::ROLE, "Responder".into()),
        ]);
        assert!(p.matches(&hit));
        assert!(!p.matches(&miss));
    }

    #[test]
    fn and_flattens() {
        let a = interactions().eq(fields::PROJECT, "X").build().unwrap();
        let b = interactions()
            .eq(fields::ROLE, "Requester")
            .eq(fields::INTENT, "plan")
            .build()
            .unwrap();
        assert_matches!(a.and(b), FilterPredicate::And { ref clauses } if clauses.len() == 3);
    }
}
