//! # Component — Typed Data Attached to Entities
//!
//! Components are plain data: a `Position`, a `Velocity`, a `Health`. Storage
//! engines hold them type-erased (`Box<dyn Any>`) and locate them purely by
//! `(EntityId, TypeId)`.
//!
//! ## Two Shapes
//!
//! Every component type declares a [`ComponentKind`]:
//!
//! - **Value** (the default): stored by value and copied out on read. Through
//!   [`EntityStorage::add_component`](super::storage::EntityStorage::add_component)
//!   the first write wins: attaching a second instance of a type the entity
//!   already carries is a no-op.
//! - **Shared**: a [`Shared<T>`] handle. Every read hands back another handle
//!   to the *same* instance, so systems mutate it in place. Attaching a new
//!   handle replaces the previous one.
//!
//! `Shared<Position>` and `Position` are different component types, exactly
//! like two different structs. An entity may carry both.
//!
//! ```ignore
//! #[derive(Clone)]
//! struct Health(u32);
//! impl Component for Health {}
//!
//! let pos = Shared::new(Position { x: 0.0, y: 0.0 });
//! let id = sim.add_entity((pos.clone(), Health(10)));
//! pos.borrow_mut().x = 5.0; // visible to every later query
//! ```
//!
//! ## Why `Box<dyn Any>`?
//!
//! Entities carry a *dynamic* set of component types; storage only knows a
//! [`TypeId`]. Each component is heap-allocated and accessed via
//! `downcast_ref`/`downcast_mut`. This trades cache locality for zero unsafe
//! code.

use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

/// How [`EntityStorage::add_component`](super::storage::EntityStorage::add_component)
/// treats an entity that already carries a component of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComponentKind {
    /// Set once. Later `add_component` calls leave the existing value alone.
    Value,
    /// Pointer identity. Later `add_component` calls replace the handle.
    Shared,
}

/// Marker trait for types that can be attached to entities.
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// struct Velocity { dx: f32, dy: f32 }
/// impl Component for Velocity {}
/// ```
pub trait Component: 'static {
    const KIND: ComponentKind = ComponentKind::Value;
}

// ── Shared ──────────────────────────────────────────────────────────────

/// A shared, mutable handle to a component instance.
///
/// Cloning a `Shared` clones the handle, not the data. Storage, queries and
/// systems all see the same instance.
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Immutably borrow the inner value.
    ///
    /// # Panics
    ///
    /// Panics if the value is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrow the inner value.
    ///
    /// # Panics
    ///
    /// Panics if the value is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Replace the inner value, returning the old one.
    pub fn replace(&self, value: T) -> T {
        self.0.replace(value)
    }

    /// `true` if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Shared<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> Shared<T> {
    /// Copy the inner value out.
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => f.debug_tuple("Shared").field(&*value).finish(),
            Err(_) => f.write_str("Shared(<borrowed>)"),
        }
    }
}

impl<T: 'static> Component for Shared<T> {
    const KIND: ComponentKind = ComponentKind::Shared;
}

// ── ComponentBox ────────────────────────────────────────────────────────

/// A type-erased component instance plus the metadata storage needs.
pub struct ComponentBox {
    type_id: TypeId,
    type_name: &'static str,
    kind: ComponentKind,
    value: Box<dyn Any>,
}

impl ComponentBox {
    pub fn new<C: Component>(component: C) -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            kind: C::KIND,
            value: Box::new(component),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully-qualified type name, e.g. `my_game::Position`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without module paths, e.g. `Shared<Position>`.
    pub fn short_name(&self) -> String {
        short_type_name(self.type_name)
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn as_any(&self) -> &dyn Any {
        &*self.value
    }

    pub fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut *self.value
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut()
    }
}

impl fmt::Debug for ComponentBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBox")
            .field("type", &self.short_name())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// ── ComponentSet (tuple support) ────────────────────────────────────────

/// An initial set of components for a new entity, or a batch to attach.
///
/// Implemented for `()`, for tuples of up to 8 components, and for
/// `Vec<ComponentBox>` when the set is only known at runtime.
pub trait ComponentSet {
    fn into_boxes(self) -> Vec<ComponentBox>;
}

impl ComponentSet for () {
    fn into_boxes(self) -> Vec<ComponentBox> {
        Vec::new()
    }
}

impl ComponentSet for Vec<ComponentBox> {
    fn into_boxes(self) -> Vec<ComponentBox> {
        self
    }
}

macro_rules! impl_component_set {
    ($($T:ident),+) => {
        impl<$($T: Component),+> ComponentSet for ($($T,)+) {
            #[allow(non_snake_case)]
            fn into_boxes(self) -> Vec<ComponentBox> {
                let ($($T,)+) = self;
                vec![$(ComponentBox::new($T)),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

// ── Built-in components ─────────────────────────────────────────────────

/// A human-readable name for an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameComponent {
    pub name: String,
}

impl NameComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Component for NameComponent {}

/// Free-form key/value labels on an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelComponent {
    pub labels: HashMap<String, String>,
}

impl LabelComponent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style label insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

impl Component for LabelComponent {}

/// Strip module paths from a type name, including inside generic arguments
/// (e.g. `kestrel::ecs::Shared<game::Position>` → `Shared<Position>`,
/// `{{closure}}` → `<closure>`).
pub(crate) fn short_type_name(full: &str) -> String {
    if full.contains("{{closure}}") {
        return "<closure>".to_string();
    }
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            segment.push(ch);
        } else if ch == ':' {
            // Everything before `::` is a module path.
            segment.clear();
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(&segment);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
    }
    impl Component for Position {}

    struct Marker;
    impl Component for Marker {}

    #[test]
    fn kinds_follow_shape() {
        assert_eq!(<Position as Component>::KIND, ComponentKind::Value);
        assert_eq!(<Shared<Position> as Component>::KIND, ComponentKind::Shared);
    }

    #[test]
    fn shared_clones_alias() {
        let a = Shared::new(Position { x: 1.0 });
        let b = a.clone();
        b.borrow_mut().x = 7.0;
        assert_eq!(a.get(), Position { x: 7.0 });
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Shared::new(Position { x: 7.0 })));
    }

    #[test]
    fn box_keeps_type_metadata() {
        let boxed = ComponentBox::new(Position { x: 3.0 });
        assert_eq!(boxed.type_id(), TypeId::of::<Position>());
        assert_eq!(boxed.short_name(), "Position");
        assert_eq!(boxed.kind(), ComponentKind::Value);
        assert_eq!(boxed.downcast_ref::<Position>(), Some(&Position { x: 3.0 }));
        assert!(boxed.downcast_ref::<Marker>().is_none());
    }

    #[test]
    fn shared_and_value_are_distinct_types() {
        let value = ComponentBox::new(Position { x: 0.0 });
        let shared = ComponentBox::new(Shared::new(Position { x: 0.0 }));
        assert_ne!(value.type_id(), shared.type_id());
        assert_eq!(shared.short_name(), "Shared<Position>");
    }

    #[test]
    fn tuple_sets_box_every_element() {
        let boxes = (Position { x: 1.0 }, Marker, NameComponent::new("a")).into_boxes();
        assert_eq!(boxes.len(), 3);
        assert!(().into_boxes().is_empty());
    }

    #[test]
    fn short_names() {
        assert_eq!(short_type_name("a::b::Position"), "Position");
        assert_eq!(
            short_type_name("kestrel::ecs::component::Shared<game::Position>"),
            "Shared<Position>"
        );
        assert_eq!(short_type_name("game::main::{{closure}}"), "<closure>");
        assert_eq!(short_type_name("u32"), "u32");
    }

    #[test]
    fn labels() {
        let labels = LabelComponent::new().with("team", "red");
        assert_eq!(labels.get("team"), Some("red"));
        assert_eq!(labels.get("role"), None);
    }
}
