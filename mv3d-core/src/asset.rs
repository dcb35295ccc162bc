/// Loaded assets: geometry plus the materials and animation clips that came with it
use std::collections::HashMap;

use crate::color::Rgb;
use crate::format::AssetFormat;
use crate::geometry::{Bounds, Mesh};
use crate::transform::ObjectTransform;

/// Surface description from an MTL library
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: Rgb,
    pub diffuse: Rgb,
    pub specular: Rgb,
    pub shininess: f32,
    pub opacity: f32,
    pub diffuse_map: Option<String>,
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: Rgb::BLACK,
            diffuse: Rgb::from_hex(0xcccccc),
            specular: Rgb::BLACK,
            shininess: 0.0,
            opacity: 1.0,
            diffuse_map: None,
        }
    }
}

/// Materials keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
}

impl MaterialLibrary {
    pub fn insert(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// A named animation clip
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
}

/// Playback state of one clip
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationPlayer {
    pub clip: AnimationClip,
    pub time: f32,
    pub looping: bool,
    pub playing: bool,
}

impl AnimationPlayer {
    pub fn looping(clip: AnimationClip) -> Self {
        Self {
            clip,
            time: 0.0,
            looping: true,
            playing: true,
        }
    }

    /// Advance playback by `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        self.time += dt;
        if self.clip.duration <= 0.0 {
            self.time = 0.0;
        } else if self.time >= self.clip.duration {
            if self.looping {
                self.time %= self.clip.duration;
            } else {
                self.time = self.clip.duration;
                self.playing = false;
            }
        }
    }
}

/// The result of a successful load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedObject {
    pub name: String,
    pub format: AssetFormat,
    pub mesh: Mesh,
    pub materials: Option<MaterialLibrary>,
    pub animations: Vec<AnimationClip>,
    pub transform: ObjectTransform,
    pub player: Option<AnimationPlayer>,
}

impl LoadedObject {
    pub fn new(name: impl Into<String>, format: AssetFormat, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            format,
            mesh,
            materials: None,
            animations: Vec::new(),
            transform: ObjectTransform::identity(),
            player: None,
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.mesh.bounds()
    }

    /// Start the first clip on a loop; returns false when there are no clips
    pub fn play_first_clip(&mut self) -> bool {
        match self.animations.first() {
            Some(clip) => {
                self.player = Some(AnimationPlayer::looping(clip.clone()));
                true
            }
            None => false,
        }
    }

    /// Diffuse colour for a triangle's material slot, if materials are applied
    pub fn slot_color(&self, slot: Option<usize>) -> Option<Rgb> {
        let library = self.materials.as_ref()?;
        let name = self.mesh.material_slots.get(slot?)?;
        library.get(name).map(|m| m.diffuse)
    }
}
