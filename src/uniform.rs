use crate::{exercise::{UniformDefs, UniformKind}, uid::Uid};
use rand::Rng;
use std::collections::HashMap;

pub const U_TIME: &str = "u_time";
pub const U_RESOLUTION: &str = "u_resolution";

pub const DEFAULT_MIN: f32 = 0.;
pub const DEFAULT_MAX: f32 = 1.;
pub const DEFAULT_STEP: f32 = 0.01;

/// Runtime value of one uniform, in the shape the shader receives it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Texture(Option<Uid>),
}

impl UniformValue {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            UniformValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn components(&self) -> &[f32] {
        match self {
            UniformValue::Float(v) => std::slice::from_ref(v),
            UniformValue::Vec2(v) => v,
            UniformValue::Vec3(v) => v,
            UniformValue::Texture(_) => &[],
        }
    }

    fn components_mut(&mut self) -> &mut [f32] {
        match self {
            UniformValue::Float(v) => std::slice::from_mut(v),
            UniformValue::Vec2(v) => v,
            UniformValue::Vec3(v) => v,
            UniformValue::Texture(_) => &mut [],
        }
    }

    /// Overwrites in place. Arrays are copied element-wise; a value of another shape replaces this one.
    pub fn assign(&mut self, other: &UniformValue) {
        let same_shape = std::mem::discriminant(self) == std::mem::discriminant(other);
        if same_shape && !matches!(other, UniformValue::Texture(_)) {
            self.components_mut().copy_from_slice(other.components());
        } else {
            *self = *other;
        }
    }

    pub fn set_component(&mut self, index: usize, value: f32) -> bool {
        match self.components_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            },
            None => false,
        }
    }
}

/// A change coming from a GUI control.
#[derive(Clone, Debug, PartialEq)]
pub enum UniformEdit {
    Set(UniformValue),
    Component(usize, f32),
}

impl UniformKind {
    /// Value a fresh instance starts from. Textures start empty; the owner attaches the image.
    pub fn initial_value(&self) -> UniformValue {
        match self {
            UniformKind::Float { value, .. } => UniformValue::Float(*value),
            UniformKind::Bool { value } => UniformValue::Float(if *value { 1. } else { 0. }),
            UniformKind::Select { value, .. } => UniformValue::Float(*value),
            UniformKind::Color { value } => UniformValue::Vec3(*value),
            UniformKind::Vec2 { value, .. } => UniformValue::Vec2(*value),
            UniformKind::Texture { .. } => UniformValue::Texture(None),
        }
    }

    pub fn float_range(&self) -> (f32, f32, f32) {
        match self {
            UniformKind::Float { min, max, step, .. } => (
                min.unwrap_or(DEFAULT_MIN),
                max.unwrap_or(DEFAULT_MAX),
                step.unwrap_or(DEFAULT_STEP),
            ),
            _ => (DEFAULT_MIN, DEFAULT_MAX, DEFAULT_STEP),
        }
    }

    pub fn vec2_range(&self) -> ([f32; 2], [f32; 2], f32) {
        match self {
            UniformKind::Vec2 { min, max, step, .. } => (
                min.unwrap_or([DEFAULT_MIN; 2]),
                max.unwrap_or([DEFAULT_MAX; 2]),
                step.unwrap_or(DEFAULT_STEP),
            ),
            _ => ([DEFAULT_MIN; 2], [DEFAULT_MAX; 2], DEFAULT_STEP),
        }
    }

    /// Draws a value within the declared bounds. `None` for textures and empty option lists.
    pub fn random_value<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<UniformValue> {
        let value = match self {
            UniformKind::Float { .. } => {
                let (min, max, _) = self.float_range();
                UniformValue::Float(lerp(min, max, rng.gen()))
            },
            UniformKind::Bool { .. } => UniformValue::Float(if rng.gen::<f32>() > 0.5 { 1. } else { 0. }),
            UniformKind::Select { options, .. } => {
                if options.is_empty() {
                    return None;
                }
                let index = rng.gen_range(0, options.len());
                UniformValue::Float(options[index].value(index))
            },
            UniformKind::Color { .. } => UniformValue::Vec3([rng.gen(), rng.gen(), rng.gen()]),
            UniformKind::Vec2 { .. } => {
                let (min, max, _) = self.vec2_range();
                UniformValue::Vec2([lerp(min[0], max[0], rng.gen()), lerp(min[1], max[1], rng.gen())])
            },
            UniformKind::Texture { .. } => return None,
        };
        Some(value)
    }
}

fn lerp(min: f32, max: f32, t: f32) -> f32 {
    t * (max - min) + min
}

/// The live uniform cells of one loaded exercise.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformSet {
    values: HashMap<String, UniformValue>,
}

impl UniformSet {
    /// Builds one instance per definition. `texture` is asked for a handle for each texture with a source.
    pub fn build<F>(defs: &UniformDefs, mut texture: F) -> Self
    where
        F: FnMut(&str) -> Uid,
    {
        let mut values = HashMap::new();
        for (name, def) in defs.iter() {
            let value = match &def.kind {
                UniformKind::Texture { value: Some(url) } if !url.is_empty() => {
                    UniformValue::Texture(Some(texture(url)))
                },
                kind => kind.initial_value(),
            };
            values.insert(name.to_string(), value);
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut UniformValue> {
        self.values.get_mut(name)
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, value: UniformValue) {
        self.values.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn textures(&self) -> Vec<Uid> {
        self.values
            .values()
            .filter_map(|v| match v {
                UniformValue::Texture(id) => *id,
                _ => None,
            })
            .collect()
    }

    pub fn time(&self) -> f32 {
        self.get(U_TIME).and_then(|v| v.as_float()).unwrap_or(0.)
    }

    pub fn advance_time(&mut self, dt: f32) {
        let time = self.time() + dt;
        self.insert(U_TIME, UniformValue::Float(time));
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.insert(U_RESOLUTION, UniformValue::Vec2([width as f32, height as f32]));
    }

    /// Restores every declared uniform, and the clock, to its manifest default.
    pub fn reset(&mut self, defs: &UniformDefs) {
        self.insert(U_TIME, UniformValue::Float(0.));
        for (name, def) in defs.iter() {
            if let UniformKind::Texture { .. } = def.kind {
                continue;
            }
            if let Some(value) = self.values.get_mut(name) {
                value.assign(&def.kind.initial_value());
            }
        }
    }

    /// Redraws every GUI-bound uniform. Textures are left alone.
    pub fn randomize<R: Rng + ?Sized>(&mut self, defs: &UniformDefs, rng: &mut R) {
        for (name, def) in defs.iter() {
            if !def.gui {
                continue;
            }
            if let (Some(slot), Some(value)) = (self.values.get_mut(name), def.kind.random_value(rng)) {
                slot.assign(&value);
            }
        }
    }

    pub fn apply_edit(&mut self, name: &str, edit: &UniformEdit) -> bool {
        match (self.values.get_mut(name), edit) {
            (Some(slot), UniformEdit::Set(value)) => {
                slot.assign(value);
                true
            },
            (Some(slot), UniformEdit::Component(index, value)) => slot.set_component(*index, *value),
            (None, _) => {
                log::warn!("Edit for unknown uniform {}", name);
                false
            },
        }
    }
}
