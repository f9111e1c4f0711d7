//! Query criteria: the storage-agnostic query description
//!
//! `QueryCriteria` is a composable, immutable description of a query over
//! bindings: optional endpoint filters, an optional binding-type filter, an
//! ordered list of WHERE conditions, OR-groups, order-by clauses, and
//! pagination. It says *what* to match; adapters decide *how*.
//!
//! ## Builder
//!
//! The builder is persistent: every method takes `&self` and returns a new
//! criteria value. The receiver is never mutated, so intermediate criteria
//! can be shared and extended in different directions.
//!
//! ## Field resolution
//!
//! A condition's `field` resolves in this order: the fixed well-known names
//! (`id`, `fromType`, `fromId`, `toType`, `toId`, `type`, `createdAt`,
//! `updatedAt`), then `metadata.<dotted.path>` as a nested metadata lookup.
//! Any other name is a single metadata lookup key, without splitting.

use crate::binding::Binding;
use crate::entity::EntityRef;
use crate::value::MetadataValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// WHERE condition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Equal
    Eq,
    /// Not equal (matches when the field is absent)
    Ne,
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Greater than or equal
    Gte,
    /// Less than or equal
    Lte,
    /// Member of a value set
    In,
    /// Not a member of a value set (matches when the field is absent)
    NotIn,
    /// Inclusive range check
    Between,
    /// Field is present (any value, including null)
    Exists,
    /// Field is null or absent
    Null,
    /// Field is present and not null
    NotNull,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Between => "between",
            Operator::Exists => "exists",
            Operator::Null => "null",
            Operator::NotNull => "not_null",
        };
        f.write_str(text)
    }
}

/// The value side of a WHERE condition
///
/// Shape follows the operator: presence operators carry nothing, scalar
/// comparisons one value, set membership a value list, and `Between` an
/// inclusive `[min, max]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// No value (exists / null / not_null)
    None,
    /// Single comparison value
    One(MetadataValue),
    /// Value set for in / not_in
    Many(Vec<MetadataValue>),
    /// Inclusive range for between
    Range(MetadataValue, MetadataValue),
}

/// A single WHERE condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereCondition {
    /// Field name, resolved per the module-level rules
    pub field: String,
    /// Comparison operator
    pub operator: Operator,
    /// Operator's value side
    pub operand: Operand,
}

impl WhereCondition {
    /// Build a condition from parts
    pub fn new(field: impl Into<String>, operator: Operator, operand: Operand) -> Self {
        WhereCondition {
            field: field.into(),
            operator,
            operand,
        }
    }

    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::new(field, Operator::Eq, Operand::One(value.into()))
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::new(field, Operator::Ne, Operand::One(value.into()))
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::new(field, Operator::Gt, Operand::One(value.into()))
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::new(field, Operator::Lt, Operand::One(value.into()))
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::new(field, Operator::Gte, Operand::One(value.into()))
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::new(field, Operator::Lte, Operand::One(value.into()))
    }

    /// `field in (values)`
    pub fn is_in(field: impl Into<String>, values: Vec<MetadataValue>) -> Self {
        Self::new(field, Operator::In, Operand::Many(values))
    }

    /// `field not_in (values)`
    pub fn not_in(field: impl Into<String>, values: Vec<MetadataValue>) -> Self {
        Self::new(field, Operator::NotIn, Operand::Many(values))
    }

    /// `min <= field <= max`
    pub fn between(
        field: impl Into<String>,
        min: impl Into<MetadataValue>,
        max: impl Into<MetadataValue>,
    ) -> Self {
        Self::new(field, Operator::Between, Operand::Range(min.into(), max.into()))
    }

    /// `field exists`
    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(field, Operator::Exists, Operand::None)
    }

    /// `field is null`
    pub fn null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::Null, Operand::None)
    }

    /// `field is not null`
    pub fn not_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::NotNull, Operand::None)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

/// A single order-by clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to sort by, resolved per the module-level rules
    pub field: String,
    /// Sort direction
    pub direction: Direction,
}

/// Composable, immutable query description
///
/// Built through the persistent builder methods below; executed by an
/// adapter (or transformed into a backend-native query first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryCriteria {
    /// Source endpoint filter
    pub from: Option<EntityRef>,
    /// Target endpoint filter
    pub to: Option<EntityRef>,
    /// Binding type filter
    pub binding_type: Option<String>,
    /// AND-ed WHERE conditions, in declaration order
    pub conditions: Vec<WhereCondition>,
    /// OR-groups, each an AND-ed condition list
    ///
    /// Every group is evaluated independently against the *unfiltered* full
    /// candidate set and its matches are unioned into the AND-filtered
    /// results, then de-duplicated by id. This is additive-union semantics,
    /// not SQL OR-inside-WHERE precedence, and adapters must reproduce it
    /// exactly.
    pub or_groups: Vec<Vec<WhereCondition>>,
    /// Order-by clauses, applied in declaration order
    pub order_by: Vec<OrderBy>,
    /// Maximum result count, applied after ordering
    pub limit: Option<usize>,
    /// Result offset, applied after ordering and before the limit
    pub offset: Option<usize>,
}

impl QueryCriteria {
    /// Empty criteria: matches every binding
    pub fn new() -> Self {
        QueryCriteria::default()
    }

    /// Filter by source endpoint
    pub fn from_entity(&self, entity: EntityRef) -> Self {
        let mut next = self.clone();
        next.from = Some(entity);
        next
    }

    /// Filter by target endpoint
    pub fn to_entity(&self, entity: EntityRef) -> Self {
        let mut next = self.clone();
        next.to = Some(entity);
        next
    }

    /// Filter by binding type
    pub fn binding_type(&self, binding_type: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.binding_type = Some(binding_type.into());
        next
    }

    /// Two-argument shorthand for an equality condition
    pub fn where_eq(&self, field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.push_condition(WhereCondition::eq(field, value))
    }

    /// Add a condition with an explicit operator
    pub fn where_op(
        &self,
        field: impl Into<String>,
        operator: Operator,
        operand: Operand,
    ) -> Self {
        self.push_condition(WhereCondition::new(field, operator, operand))
    }

    /// `field in (values)`
    pub fn where_in(&self, field: impl Into<String>, values: Vec<MetadataValue>) -> Self {
        self.push_condition(WhereCondition::is_in(field, values))
    }

    /// `field not_in (values)`
    pub fn where_not_in(&self, field: impl Into<String>, values: Vec<MetadataValue>) -> Self {
        self.push_condition(WhereCondition::not_in(field, values))
    }

    /// `min <= field <= max`, inclusive on both ends
    pub fn where_between(
        &self,
        field: impl Into<String>,
        min: impl Into<MetadataValue>,
        max: impl Into<MetadataValue>,
    ) -> Self {
        self.push_condition(WhereCondition::between(field, min, max))
    }

    /// `field exists`
    pub fn where_exists(&self, field: impl Into<String>) -> Self {
        self.push_condition(WhereCondition::exists(field))
    }

    /// `field is null` (null or absent)
    pub fn where_null(&self, field: impl Into<String>) -> Self {
        self.push_condition(WhereCondition::null(field))
    }

    /// `field is not null` (present and non-null)
    pub fn where_not_null(&self, field: impl Into<String>) -> Self {
        self.push_condition(WhereCondition::not_null(field))
    }

    /// Add an OR-group of AND-ed conditions
    ///
    /// The group is evaluated against the full unfiltered candidate set and
    /// unioned into the results; see the `or_groups` field documentation.
    pub fn or_where(&self, group: Vec<WhereCondition>) -> Self {
        let mut next = self.clone();
        next.or_groups.push(group);
        next
    }

    /// Add an order-by clause
    ///
    /// Clauses apply in declaration order; ties fall through to the next
    /// clause and finally to insertion order.
    pub fn order_by(&self, field: impl Into<String>, direction: Direction) -> Self {
        let mut next = self.clone();
        next.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        next
    }

    /// Cap the number of results
    pub fn limit(&self, limit: usize) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    /// Skip leading results
    pub fn offset(&self, offset: usize) -> Self {
        let mut next = self.clone();
        next.offset = Some(offset);
        next
    }

    fn push_condition(&self, condition: WhereCondition) -> Self {
        let mut next = self.clone();
        next.conditions.push(condition);
        next
    }
}

// ============================================================================
// Field resolution
// ============================================================================

/// A resolved condition or order-by field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    /// The binding id
    Id,
    /// Source endpoint type
    FromType,
    /// Source endpoint id
    FromId,
    /// Target endpoint type
    ToType,
    /// Target endpoint id
    ToId,
    /// Relationship type label
    BindingType,
    /// Creation instant
    CreatedAt,
    /// Last-update instant
    UpdatedAt,
    /// Metadata lookup path (one key, or a dotted `metadata.` path)
    Metadata(Vec<String>),
}

impl FieldRef {
    /// Resolve a field name per the module-level rules
    pub fn parse(field: &str) -> FieldRef {
        match field {
            "id" => FieldRef::Id,
            "fromType" => FieldRef::FromType,
            "fromId" => FieldRef::FromId,
            "toType" => FieldRef::ToType,
            "toId" => FieldRef::ToId,
            "type" => FieldRef::BindingType,
            "createdAt" => FieldRef::CreatedAt,
            "updatedAt" => FieldRef::UpdatedAt,
            other => match other.strip_prefix("metadata.") {
                Some(path) => {
                    FieldRef::Metadata(path.split('.').map(str::to_string).collect())
                }
                None => FieldRef::Metadata(vec![other.to_string()]),
            },
        }
    }

    /// Read this field's value off a binding
    ///
    /// Returns `None` when a metadata path is absent (or traverses through a
    /// non-map value). Well-known fields always resolve.
    pub fn resolve(&self, binding: &Binding) -> Option<MetadataValue> {
        match self {
            FieldRef::Id => Some(MetadataValue::String(binding.id().as_str().to_string())),
            FieldRef::FromType => Some(MetadataValue::String(binding.from_type().to_string())),
            FieldRef::FromId => Some(MetadataValue::String(binding.from_id().to_string())),
            FieldRef::ToType => Some(MetadataValue::String(binding.to_type().to_string())),
            FieldRef::ToId => Some(MetadataValue::String(binding.to_id().to_string())),
            FieldRef::BindingType => {
                Some(MetadataValue::String(binding.binding_type().to_string()))
            }
            FieldRef::CreatedAt => Some(MetadataValue::Timestamp(binding.created_at())),
            FieldRef::UpdatedAt => Some(MetadataValue::Timestamp(binding.updated_at())),
            FieldRef::Metadata(path) => {
                let mut segments = path.iter();
                let first = segments.next()?;
                let mut current = binding.metadata().get(first)?;
                for segment in segments {
                    current = current.as_map()?.get(segment)?;
                }
                Some(current.clone())
            }
        }
    }
}
