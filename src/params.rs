//! Name-keyed shader parameters.
//!
//! A [`UniformLayout`] describes one WGSL uniform struct: an ordered list of
//! named fields placed with the uniform address space alignment rules. A
//! [`ParameterTable`] is the CPU staging copy of one such struct. Values are
//! written by name and only reach the GPU when the owning
//! [`ShaderProgram`](crate::ShaderProgram) flushes the table.
//!
//! Writing a name the layout doesn't declare is not an error: the call returns
//! `false` and the table is left untouched. This lets one material drive
//! several shader variants that declare different subsets of parameters.
//!
//! ```
//! use terrasphere::{ParameterTable, UniformKind, UniformLayout, Vec4};
//!
//! let layout = UniformLayout::new()
//!     .field("color_tint", UniformKind::Vec4)
//!     .field("roughness", UniformKind::F32);
//! let mut table = ParameterTable::new("pixel", layout);
//!
//! assert!(table.set("color_tint", Vec4::ONE));
//! assert!(table.set("roughness", 0.5));
//! assert!(!table.set("metalness", 1.0)); // not declared, ignored
//! ```

use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3, Vec4};

/// WGSL type of a uniform field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    F32,
    U32,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    /// A nested struct of `size` bytes, written with
    /// [`ParameterTable::set_data`].
    Struct { size: u32 },
}

impl UniformKind {
    /// Size in bytes as laid out in a uniform buffer.
    pub const fn size(self) -> u32 {
        match self {
            UniformKind::F32 | UniformKind::U32 => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
            UniformKind::Struct { size } => round_up(size, 16),
        }
    }

    /// Required alignment in the uniform address space.
    pub const fn align(self) -> u32 {
        match self {
            UniformKind::F32 | UniformKind::U32 => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 | UniformKind::Vec4 | UniformKind::Mat4 => 16,
            UniformKind::Struct { .. } => 16,
        }
    }
}

const fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// A named field and its byte offset within the struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: u32,
}

/// Byte layout of a WGSL uniform struct.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    end: u32,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field after the previous one, honouring its alignment.
    ///
    /// Fields must be declared in the same order as the WGSL struct members.
    pub fn field(mut self, name: impl Into<String>, kind: UniformKind) -> Self {
        let name = name.into();
        debug_assert!(
            self.find(&name).is_none(),
            "uniform field '{name}' declared twice"
        );
        let offset = round_up(self.end, kind.align());
        self.end = offset + kind.size();
        self.fields.push(UniformField { name, kind, offset });
        self
    }

    /// Total struct size, rounded up to the 16-byte struct alignment.
    pub fn size(&self) -> u32 {
        round_up(self.end, 16).max(16)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    pub fn find(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.find(name).map(|f| f.offset)
    }
}

/// A typed value for a single uniform field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShaderValue {
    F32(f32),
    U32(u32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl ShaderValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            ShaderValue::F32(_) => UniformKind::F32,
            ShaderValue::U32(_) => UniformKind::U32,
            ShaderValue::Vec2(_) => UniformKind::Vec2,
            ShaderValue::Vec3(_) => UniformKind::Vec3,
            ShaderValue::Vec4(_) => UniformKind::Vec4,
            ShaderValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    fn write_to(&self, out: &mut [u8]) {
        match self {
            ShaderValue::F32(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            ShaderValue::U32(v) => out.copy_from_slice(bytemuck::bytes_of(v)),
            ShaderValue::Vec2(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            ShaderValue::Vec3(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            ShaderValue::Vec4(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            ShaderValue::Mat4(m) => out.copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
        }
    }
}

impl From<f32> for ShaderValue {
    fn from(v: f32) -> Self {
        ShaderValue::F32(v)
    }
}

impl From<u32> for ShaderValue {
    fn from(v: u32) -> Self {
        ShaderValue::U32(v)
    }
}

impl From<Vec2> for ShaderValue {
    fn from(v: Vec2) -> Self {
        ShaderValue::Vec2(v)
    }
}

impl From<Vec3> for ShaderValue {
    fn from(v: Vec3) -> Self {
        ShaderValue::Vec3(v)
    }
}

impl From<Vec4> for ShaderValue {
    fn from(v: Vec4) -> Self {
        ShaderValue::Vec4(v)
    }
}

impl From<Mat4> for ShaderValue {
    fn from(m: Mat4) -> Self {
        ShaderValue::Mat4(m)
    }
}

/// CPU staging bytes for one uniform struct.
#[derive(Clone, Debug)]
pub struct ParameterTable {
    label: String,
    layout: UniformLayout,
    data: Vec<u8>,
}

impl ParameterTable {
    /// A zero-filled table for `layout`.
    pub fn new(label: impl Into<String>, layout: UniformLayout) -> Self {
        let data = vec![0; layout.size() as usize];
        Self {
            label: label.into(),
            layout,
            data,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// The staged struct, ready for upload.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layout.find(name).is_some()
    }

    /// Stages `value` for field `name`.
    ///
    /// Returns `false` without touching the table if the field is not
    /// declared or has a different type.
    pub fn set(&mut self, name: &str, value: impl Into<ShaderValue>) -> bool {
        let value = value.into();
        let Some(field) = self.layout.find(name) else {
            log::trace!("{}: no parameter named '{}'", self.label, name);
            return false;
        };
        if field.kind != value.kind() {
            log::warn!(
                "{}: parameter '{}' is {:?}, got {:?}",
                self.label,
                name,
                field.kind,
                value.kind()
            );
            return false;
        }

        let start = field.offset as usize;
        let end = start + field.kind.size() as usize;
        value.write_to(&mut self.data[start..end]);
        true
    }

    /// Stages raw bytes for field `name`, typically a `#[repr(C)]` struct.
    ///
    /// The byte length must not exceed the field's size; a shorter write
    /// leaves the trailing padding untouched.
    pub fn set_data(&mut self, name: &str, bytes: &[u8]) -> bool {
        let Some(field) = self.layout.find(name) else {
            log::trace!("{}: no parameter named '{}'", self.label, name);
            return false;
        };
        let size = field.kind.size() as usize;
        if bytes.len() > size {
            log::warn!(
                "{}: parameter '{}' holds {} bytes, got {}",
                self.label,
                name,
                size,
                bytes.len()
            );
            return false;
        }

        let start = field.offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        true
    }

    /// Reads back the staged bytes of one field.
    pub fn field_bytes(&self, name: &str) -> Option<&[u8]> {
        let field = self.layout.find(name)?;
        let start = field.offset as usize;
        Some(&self.data[start..start + field.kind.size() as usize])
    }
}

/// Named resource slots mapped to bind group binding indices.
///
/// Used for the texture and sampler slots of a shader. Unknown names are
/// ignored on assignment; unassigned slots report `None` so the caller can
/// fall back to a default resource. [`ResourceSlots::revision`] changes
/// whenever a slot's contents do, so a bind group built from the slots can be
/// reused until then.
#[derive(Clone, Debug)]
pub struct ResourceSlots<T> {
    slots: Vec<(String, u32, Option<T>)>,
    revision: u64,
}

impl<T> ResourceSlots<T> {
    pub fn new<'a>(names: impl IntoIterator<Item = (&'a str, u32)>) -> Self {
        Self {
            slots: names
                .into_iter()
                .map(|(name, binding)| (name.to_owned(), binding, None))
                .collect(),
            revision: 0,
        }
    }

    /// Assigns `resource` to the slot named `name`.
    pub fn set(&mut self, name: &str, resource: T) -> bool {
        match self.slots.iter_mut().find(|(n, _, _)| n == name) {
            Some((_, _, slot)) => {
                *slot = Some(resource);
                self.revision += 1;
                true
            }
            None => {
                log::trace!("no resource slot named '{}'", name);
                false
            }
        }
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        let mut changed = false;
        for (_, _, slot) in &mut self.slots {
            changed |= slot.take().is_some();
        }
        if changed {
            self.revision += 1;
        }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.slots
            .iter()
            .find(|(n, _, _)| n == name)
            .and_then(|(_, _, slot)| slot.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|(n, _, _)| n == name)
    }

    /// Slot names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(name, _, _)| name.as_str())
    }

    /// `(binding, resource)` for every declared slot, in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (u32, Option<&T>)> {
        self.slots
            .iter()
            .map(|(_, binding, slot)| (*binding, slot.as_ref()))
    }

    /// Bumped on every change to a slot's contents.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<U> ResourceSlots<Rc<U>> {
    /// Like [`ResourceSlots::set`], but re-assigning the resource a slot
    /// already holds leaves the revision alone.
    pub fn set_shared(&mut self, name: &str, resource: Rc<U>) -> bool {
        if self.get(name).is_some_and(|held| Rc::ptr_eq(held, &resource)) {
            return true;
        }
        self.set(name, resource)
    }

    /// Refills every slot from `lookup`. Slots `lookup` returns `None` for
    /// are emptied. Returns whether any slot now holds a different resource.
    pub fn assign_with(&mut self, mut lookup: impl FnMut(&str) -> Option<Rc<U>>) -> bool {
        let mut changed = false;
        for (name, _, slot) in &mut self.slots {
            let next = lookup(name);
            let same = match (slot.as_ref(), next.as_ref()) {
                (Some(held), Some(next)) => Rc::ptr_eq(held, next),
                (None, None) => true,
                _ => false,
            };
            if !same {
                *slot = next;
                changed = true;
            }
        }
        if changed {
            self.revision += 1;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn pixel_like() -> UniformLayout {
        UniformLayout::new()
            .field("color_tint", UniformKind::Vec4)
            .field("camera_position", UniformKind::Vec3)
            .field("roughness", UniformKind::F32)
            .field("ambient", UniformKind::Vec3)
            .field("time", UniformKind::F32)
            .field("light", UniformKind::Struct { size: 48 })
    }

    #[test]
    fn layout_follows_wgsl_alignment() {
        let layout = pixel_like();
        assert_eq!(layout.offset_of("color_tint"), Some(0));
        assert_eq!(layout.offset_of("camera_position"), Some(16));
        // f32 packs into the vec3's trailing padding
        assert_eq!(layout.offset_of("roughness"), Some(28));
        assert_eq!(layout.offset_of("ambient"), Some(32));
        assert_eq!(layout.offset_of("time"), Some(44));
        assert_eq!(layout.offset_of("light"), Some(48));
        assert_eq!(layout.size(), 96);
    }

    #[test]
    fn vec3_after_scalar_is_realigned() {
        let layout = UniformLayout::new()
            .field("a", UniformKind::F32)
            .field("b", UniformKind::Vec3)
            .field("c", UniformKind::Vec2);
        assert_eq!(layout.offset_of("b"), Some(16));
        assert_eq!(layout.offset_of("c"), Some(32));
        assert_eq!(layout.size(), 48);
    }

    #[test]
    fn matrices_are_column_major() {
        let layout = UniformLayout::new().field("world", UniformKind::Mat4);
        let mut table = ParameterTable::new("vertex", layout);
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert!(table.set("world", m));

        assert_eq!(&floats(table.bytes())[12..15], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut table = ParameterTable::new("pixel", pixel_like());
        let before = table.bytes().to_vec();
        assert!(!table.set("metalness", 1.0));
        assert!(!table.set_data("shadow_map", &[1, 2, 3, 4]));
        assert_eq!(table.bytes(), &before[..]);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut table = ParameterTable::new("pixel", pixel_like());
        assert!(!table.set("roughness", Vec3::ONE));
        assert!(!table.set("color_tint", 1.0));
        assert!(table.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn set_writes_only_its_field() {
        let mut table = ParameterTable::new("pixel", pixel_like());
        assert!(table.set("camera_position", Vec3::new(1.0, 2.0, 3.0)));
        assert!(table.set("roughness", 0.25));

        let floats = floats(table.bytes());
        assert_eq!(&floats[0..4], &[0.0; 4]);
        assert_eq!(&floats[4..8], &[1.0, 2.0, 3.0, 0.25]);
        assert_eq!(
            table.field_bytes("roughness"),
            Some(bytemuck::bytes_of(&0.25f32))
        );
    }

    #[test]
    fn set_data_respects_field_size() {
        let mut table = ParameterTable::new("pixel", pixel_like());
        assert!(table.set_data("light", &[7; 48]));
        assert!(!table.set_data("light", &[7; 64]));
        assert_eq!(table.field_bytes("light"), Some(&[7u8; 48][..]));
        assert_eq!(table.field_bytes("time"), Some(&[0u8; 4][..]));
    }

    #[test]
    fn resource_slots_track_assignment() {
        let mut slots = ResourceSlots::new([("albedo_map", 0), ("terrain_map", 1)]);
        assert!(slots.set("terrain_map", "noise"));
        assert!(!slots.set("normal_map", "ignored"));
        assert_eq!(slots.get("terrain_map"), Some(&"noise"));
        assert_eq!(slots.get("albedo_map"), None);
        assert!(slots.contains("albedo_map"));

        let bound: Vec<_> = slots.bindings().collect();
        assert_eq!(bound, vec![(0, None), (1, Some(&"noise"))]);
    }

    #[test]
    fn reassigning_a_material_empties_slots_it_does_not_name() {
        let mut slots: ResourceSlots<Rc<&str>> =
            ResourceSlots::new([("albedo_map", 0), ("terrain_map", 1)]);
        let rock = Rc::new("rock");
        let noise = Rc::new("noise");

        assert!(slots.assign_with(|name| match name {
            "albedo_map" => Some(Rc::clone(&rock)),
            "terrain_map" => Some(Rc::clone(&noise)),
            _ => None,
        }));

        // a second material that only names terrain_map
        assert!(slots.assign_with(|name| (name == "terrain_map").then(|| Rc::clone(&noise))));
        assert_eq!(slots.get("albedo_map"), None);
        assert_eq!(slots.get("terrain_map").map(|t| **t), Some("noise"));
    }

    #[test]
    fn revision_only_moves_when_contents_change() {
        let mut slots: ResourceSlots<Rc<&str>> =
            ResourceSlots::new([("albedo_map", 0), ("terrain_map", 1)]);
        let rock = Rc::new("rock");
        let start = slots.revision();

        let lookup = |name: &str| (name == "albedo_map").then(|| Rc::clone(&rock));
        assert!(slots.assign_with(lookup));
        let after_first = slots.revision();
        assert!(after_first > start);

        assert!(!slots.assign_with(lookup));
        assert!(slots.set_shared("albedo_map", Rc::clone(&rock)));
        assert_eq!(slots.revision(), after_first);

        // equal contents in a different allocation still counts as a change
        assert!(slots.set_shared("albedo_map", Rc::new("rock")));
        assert!(slots.revision() > after_first);

        let before_clear = slots.revision();
        slots.clear();
        assert!(slots.revision() > before_clear);
        assert_eq!(slots.get("albedo_map"), None);

        let cleared = slots.revision();
        slots.clear();
        assert_eq!(slots.revision(), cleared);
    }
}
