//! Structural probing of opaque host objects.
//!
//! A host object exposes its state as named [`Field`]s holding type-erased
//! values. [`get`] and [`set`] read and mutate those fields on the live object
//! with typed failure modes; [`try_probe`] is the cheap variant for lookups
//! where absence is expected and frequent (selection heuristics walk many
//! stages that do not carry the field they are looking for).
//!
//! Field visibility is not a concept at this layer: every field a host
//! declares through [`Introspect`] is readable and writable.

use std::any::{Any, TypeId};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

/// The type-erased value of one host field.
pub type FieldValue = Arc<dyn Any + Send + Sync>;

/// Error raised by structural field access.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The object declares no field with the requested name.
    #[error("field '{field}' not found")]
    FieldNotFound {
        /// Name of the missing field.
        field: String,
    },

    /// The field exists but its runtime value has an unexpected shape.
    #[error("field '{field}' is not of expected type '{expected}'")]
    TypeMismatch {
        /// Name of the offending field.
        field: String,
        /// The type the caller asked for.
        expected: &'static str,
    },
}

/// A named, shared, mutable slot on a live host object.
///
/// Cloning a `Field` clones the handle, not the slot: writes through any
/// clone are visible through every other clone. This is what makes the field
/// a view of the *live* object rather than a copy of its state.
#[derive(Clone)]
pub struct Field {
    name: String,
    slot: Arc<RwLock<FieldValue>>,
}

impl Field {
    /// Creates a field holding `value`.
    pub fn new<T: Send + Sync + 'static>(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            slot: Arc::new(RwLock::new(Arc::new(value))),
        }
    }

    /// The field's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads the current value.
    pub fn value(&self) -> FieldValue {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the current value in place on the live object.
    pub fn store(&self, value: FieldValue) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

/// An opaque host object whose declared fields can be walked in order.
pub trait Introspect: Send + Sync {
    /// The object's declared fields, in declaration order.
    fn fields(&self) -> Vec<Field>;
}

impl std::fmt::Debug for dyn Introspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Introspect")
            .field("fields", &self.fields())
            .finish()
    }
}

/// An ordered set of [`Field`]s implementing [`Introspect`].
///
/// This is the concrete building block hosts use to expose their internals
/// (connection managers, acceptor stages) to the probing layer.
#[derive(Default)]
pub struct FieldMap {
    fields: Vec<Field>,
}

impl FieldMap {
    /// Creates an empty field map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append of a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends a field.
    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }
}

impl Introspect for FieldMap {
    fn fields(&self) -> Vec<Field> {
        self.fields.clone()
    }
}

fn lookup(obj: &dyn Introspect, name: &str) -> Result<Field, AccessError> {
    obj.fields()
        .into_iter()
        .find(|f| f.name() == name)
        .ok_or_else(|| AccessError::FieldNotFound {
            field: name.to_string(),
        })
}

/// Reads field `name` of `obj` as a `T`.
///
/// Fails with [`AccessError::FieldNotFound`] if the object declares no such
/// field and [`AccessError::TypeMismatch`] if the runtime value is of a
/// different shape.
pub fn get<T>(obj: &dyn Introspect, name: &str) -> Result<T, AccessError>
where
    T: Clone + Send + Sync + 'static,
{
    let field = lookup(obj, name)?;
    match field.value().downcast::<T>() {
        Ok(value) => Ok((*value).clone()),
        Err(_) => Err(AccessError::TypeMismatch {
            field: name.to_string(),
            expected: std::any::type_name::<T>(),
        }),
    }
}

/// Writes `value` into field `name` of `obj`, mutating the live object.
///
/// Same failure modes as [`get`]: the field must exist and its current value
/// must be of the same concrete type as `value` (a field never changes shape,
/// only contents).
pub fn set<T>(obj: &dyn Introspect, name: &str, value: T) -> Result<(), AccessError>
where
    T: Send + Sync + 'static,
{
    let field = lookup(obj, name)?;
    if field.value().as_ref().type_id() != TypeId::of::<T>() {
        return Err(AccessError::TypeMismatch {
            field: name.to_string(),
            expected: std::any::type_name::<T>(),
        });
    }
    field.store(Arc::new(value));
    Ok(())
}

/// Probes field `name` of `obj` for a `T`, treating absence and shape
/// mismatch alike as "not there".
///
/// This is the expected-failure path: selection heuristics call it once per
/// candidate stage. Conditions that should end an operation go through
/// [`get`] instead.
pub fn try_probe<T>(obj: &dyn Introspect, name: &str) -> Option<T>
where
    T: Clone + Send + Sync + 'static,
{
    get(obj, name).ok()
}
