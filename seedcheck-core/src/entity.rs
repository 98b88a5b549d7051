//! Entity schemas and field accessors.
//!
//! An entity type describes its members once, through [`Entity::members`],
//! usually generated by [`entity_schema!`](crate::entity_schema). A
//! [`FieldSelector`] names one member and resolves to a [`FieldAccessor`]
//! that can read and write that field on any instance.
//!
//! # Member kinds
//!
//! ```text
//! Property  ── getter + setter ──→ resolvable
//! Computed  ── getter only     ──→ FieldError::TargetsMethod
//! Unmapped  ── no accessor     ──→ FieldError::NotAProperty
//! (absent)                     ──→ FieldError::ForeignMember
//! ```

use crate::error::{CoercionError, FieldError};
use crate::value::{FieldType, FieldValue};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Field name to value map; the shape entities take inside a store.
pub type Record = BTreeMap<String, FieldValue>;

/// Reads a field out of an entity.
pub type Getter<T> = fn(&T) -> FieldValue;

/// Writes a field on an entity.
pub type Setter<T> = fn(&mut T, FieldValue) -> Result<(), CoercionError>;

// ============================================================================
// ENTITY TRAIT
// ============================================================================

/// A store-mapped record type with a declared member list.
pub trait Entity: Clone + Default + fmt::Debug + Send + Sync + 'static {
    /// Name used in diagnostics and as the store partition key.
    const ENTITY_NAME: &'static str;

    /// All declared members, in declaration order.
    fn members() -> &'static [Member<Self>];

    /// Look up a declared member by exact name.
    fn member(name: &str) -> Option<&'static Member<Self>> {
        Self::members().iter().find(|m| m.name == name)
    }

    /// Property values of this entity keyed by field name.
    fn to_record(&self) -> Record {
        Self::members()
            .iter()
            .filter_map(|m| m.accessor().map(|acc| (m.name.to_string(), acc.get(self))))
            .collect()
    }

    /// Rebuild an entity from a record. Keys that are not properties are ignored.
    fn from_record(record: &Record) -> Result<Self, CoercionError> {
        let mut entity = Self::default();
        for (name, value) in record {
            if let Some(acc) = Self::member(name).and_then(Member::accessor) {
                acc.set(&mut entity, value.clone())?;
            }
        }
        Ok(entity)
    }
}

// ============================================================================
// MEMBERS
// ============================================================================

/// How a declared member can be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Stored field with getter and setter.
    Property,
    /// Derived value, read-only.
    Computed,
    /// Declared on the type but without a backing property.
    Unmapped,
}

/// One declared member of an entity type.
pub struct Member<T> {
    name: &'static str,
    kind: MemberKind,
    field_type: FieldType,
    nullable: bool,
    getter: Option<Getter<T>>,
    setter: Option<Setter<T>>,
}

impl<T> Member<T> {
    pub fn property(
        name: &'static str,
        field_type: FieldType,
        nullable: bool,
        getter: Getter<T>,
        setter: Setter<T>,
    ) -> Self {
        Self {
            name,
            kind: MemberKind::Property,
            field_type,
            nullable,
            getter: Some(getter),
            setter: Some(setter),
        }
    }

    pub fn computed(name: &'static str, field_type: FieldType, getter: Getter<T>) -> Self {
        Self {
            name,
            kind: MemberKind::Computed,
            field_type,
            nullable: false,
            getter: Some(getter),
            setter: None,
        }
    }

    pub fn unmapped(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            kind: MemberKind::Unmapped,
            field_type,
            nullable: false,
            getter: None,
            setter: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Accessor for property members; `None` for computed and unmapped ones.
    pub fn accessor(&self) -> Option<FieldAccessor<T>> {
        match (self.kind, self.getter, self.setter) {
            (MemberKind::Property, Some(getter), Some(setter)) => Some(FieldAccessor {
                name: self.name,
                field_type: self.field_type,
                nullable: self.nullable,
                getter,
                setter,
            }),
            _ => None,
        }
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("field_type", &self.field_type)
            .field("nullable", &self.nullable)
            .finish()
    }
}

// ============================================================================
// FIELD ACCESSOR
// ============================================================================

/// Resolved (name, type, getter, setter) for one property of `T`.
pub struct FieldAccessor<T> {
    name: &'static str,
    field_type: FieldType,
    nullable: bool,
    getter: Getter<T>,
    setter: Setter<T>,
}

impl<T> FieldAccessor<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn get(&self, entity: &T) -> FieldValue {
        (self.getter)(entity)
    }

    /// Convert `value` to this field's type, checking nullability.
    pub fn coerce(&self, value: &FieldValue) -> Result<FieldValue, CoercionError> {
        if value.is_null() {
            return if self.nullable {
                Ok(FieldValue::Null)
            } else {
                Err(CoercionError::new("null", self.field_type, "field is not nullable"))
            };
        }
        value.coerce(self.field_type)
    }

    pub fn set(&self, entity: &mut T, value: FieldValue) -> Result<(), CoercionError> {
        let value = self.coerce(&value)?;
        (self.setter)(entity, value)
    }
}

impl<T> Clone for FieldAccessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldAccessor<T> {}

impl<T> PartialEq for FieldAccessor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> fmt::Debug for FieldAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("nullable", &self.nullable)
            .finish()
    }
}

// ============================================================================
// FIELD SELECTOR
// ============================================================================

/// Reference to one member of `T` by name, checked on [`resolve`](Self::resolve).
pub struct FieldSelector<T> {
    name: Cow<'static, str>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> FieldSelector<T> {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Entity> FieldSelector<T> {
    pub fn resolve(&self) -> Result<FieldAccessor<T>, FieldError> {
        let member = T::member(&self.name).ok_or_else(|| FieldError::ForeignMember {
            entity: T::ENTITY_NAME,
            member: self.name.to_string(),
        })?;

        match member.kind {
            MemberKind::Computed => Err(FieldError::TargetsMethod {
                entity: T::ENTITY_NAME,
                member: self.name.to_string(),
            }),
            MemberKind::Unmapped => Err(FieldError::NotAProperty {
                entity: T::ENTITY_NAME,
                member: self.name.to_string(),
            }),
            MemberKind::Property => member.accessor().ok_or_else(|| FieldError::NotAProperty {
                entity: T::ENTITY_NAME,
                member: self.name.to_string(),
            }),
        }
    }
}

impl<T> Clone for FieldSelector<T> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<T> fmt::Debug for FieldSelector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldSelector").field(&self.name).finish()
    }
}

impl<T> From<&'static str> for FieldSelector<T> {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl<T> From<String> for FieldSelector<T> {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

// ============================================================================
// SCHEMA MACRO
// ============================================================================

/// Implement [`Entity`] for a struct from a column list.
///
/// Each property line maps a column name to a struct field and its type.
/// Optional `computed` and `unmapped` blocks declare members that exist on
/// the type but cannot be written from a table.
///
/// # Example
/// ```ignore
/// #[derive(Debug, Clone, Default)]
/// struct Person { name: String, age: i64 }
///
/// entity_schema! {
///     Person as "Person" {
///         "Name" => name: String,
///         "Age" => age: i64,
///     }
///     computed {
///         "Label": String => |p: &Person| FieldValue::from(p.name.to_uppercase()),
///     }
/// }
/// ```
#[macro_export]
macro_rules! entity_schema {
    (
        $entity:ident as $entity_name:literal {
            $( $column:literal => $field:ident : $fty:ty ),* $(,)?
        }
        $( computed { $( $cname:literal : $cty:ty => $cget:expr ),* $(,)? } )?
        $( unmapped { $( $uname:literal : $uty:ty ),* $(,)? } )?
    ) => {
        impl $crate::Entity for $entity {
            const ENTITY_NAME: &'static str = $entity_name;

            fn members() -> &'static [$crate::Member<Self>] {
                static MEMBERS: $crate::__private::Lazy<::std::vec::Vec<$crate::Member<$entity>>> =
                    $crate::__private::Lazy::new(|| {
                        ::std::vec![
                            $(
                                $crate::Member::property(
                                    $column,
                                    <$fty as $crate::FieldData>::FIELD_TYPE,
                                    <$fty as $crate::FieldData>::NULLABLE,
                                    |entity: &$entity| $crate::FieldData::to_field_value(&entity.$field),
                                    |entity: &mut $entity, value: $crate::FieldValue| {
                                        entity.$field = <$fty as $crate::FieldData>::from_field_value(value)?;
                                        ::std::result::Result::Ok(())
                                    },
                                ),
                            )*
                            $($(
                                $crate::Member::computed(
                                    $cname,
                                    <$cty as $crate::FieldData>::FIELD_TYPE,
                                    $cget,
                                ),
                            )*)?
                            $($(
                                $crate::Member::unmapped(
                                    $uname,
                                    <$uty as $crate::FieldData>::FIELD_TYPE,
                                ),
                            )*)?
                        ]
                    });
                &MEMBERS
            }
        }
    };
}

// =============================================================================
// TESTS
// =============================================================================
