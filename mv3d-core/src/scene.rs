/// Scene graph: helper nodes plus at most one primary loaded object
use nalgebra::{Point3, Vector3};

use crate::asset::LoadedObject;
use crate::color::Rgb;
use crate::error::SceneError;

pub type NodeId = u64;

/// A directional light shining from `direction` towards the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Rgb,
    pub intensity: f32,
    /// Unit vector pointing from the scene towards the light
    pub direction: Vector3<f32>,
}

/// Reference grid drawn as line segments on a horizontal floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub floor: f32,
    pub step: f32,
    pub divisions: u32,
    pub color: Rgb,
}

impl Grid {
    pub fn half_extent(&self) -> f32 {
        self.step * self.divisions as f32 / 2.0
    }

    /// One segment per grid line, both directions
    pub fn segments(&self) -> Vec<(Point3<f32>, Point3<f32>)> {
        let half = self.half_extent();
        (0..=self.divisions)
            .flat_map(|i| {
                let offset = i as f32 * self.step - half;
                [
                    (Point3::new(-half, self.floor, offset), Point3::new(half, self.floor, offset)),
                    (Point3::new(offset, self.floor, -half), Point3::new(offset, self.floor, half)),
                ]
            })
            .collect()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            floor: -75.0,
            step: 25.0,
            divisions: 40,
            color: Rgb::from_hex(0x303030),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    AmbientLight { color: Rgb },
    /// The light together with its direction indicator
    DirectionalLight { light: DirectionalLight, indicator_size: f32 },
    Grid(Grid),
    Axes { size: f32 },
    Primary(Box<LoadedObject>),
    /// On-screen handles of the manipulation gizmo
    GizmoVisual,
}

impl NodeKind {
    pub fn is_helper(&self) -> bool {
        matches!(
            self,
            NodeKind::AmbientLight { .. } | NodeKind::DirectionalLight { .. } | NodeKind::Grid(_) | NodeKind::Axes { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// Everything currently attached to the render graph
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    next_id: NodeId,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node. Only one primary object may be attached at a time.
    pub fn add(&mut self, kind: NodeKind) -> Result<NodeId, SceneError> {
        if matches!(kind, NodeKind::Primary(_)) && self.primary().is_some() {
            return Err(SceneError::PrimaryAlreadyAttached);
        }
        self.next_id += 1;
        let id = self.next_id;
        self.nodes.push(SceneNode { id, kind });
        Ok(id)
    }

    pub fn remove(&mut self, id: NodeId) -> Result<SceneNode, SceneError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(SceneError::UnknownNode(id))?;
        Ok(self.nodes.remove(index))
    }

    /// Remove every node, helpers and primary object alike
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn helper_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind.is_helper()).count()
    }

    pub fn primary(&self) -> Option<(NodeId, &LoadedObject)> {
        self.nodes.iter().find_map(|n| match &n.kind {
            NodeKind::Primary(object) => Some((n.id, object.as_ref())),
            _ => None,
        })
    }

    pub fn primary_mut(&mut self) -> Option<(NodeId, &mut LoadedObject)> {
        self.nodes.iter_mut().find_map(|n| match &mut n.kind {
            NodeKind::Primary(object) => Some((n.id, object.as_mut())),
            _ => None,
        })
    }

    pub fn ambient_light(&self) -> Option<Rgb> {
        self.nodes.iter().find_map(|n| match n.kind {
            NodeKind::AmbientLight { color } => Some(color),
            _ => None,
        })
    }

    pub fn directional_light(&self) -> Option<DirectionalLight> {
        self.nodes.iter().find_map(|n| match n.kind {
            NodeKind::DirectionalLight { light, .. } => Some(light),
            _ => None,
        })
    }

    /// Add the static helpers: ambient light, directional light with its
    /// indicator, reference grid and coordinate axes
    pub fn populate_helpers(&mut self) {
        let helpers = [
            NodeKind::AmbientLight {
                color: Rgb::from_hex(0x444444),
            },
            NodeKind::DirectionalLight {
                light: DirectionalLight {
                    color: Rgb::WHITE,
                    intensity: 1.0,
                    direction: Vector3::new(1.0, 1.0, 1.0).normalize(),
                },
                indicator_size: 5.0,
            },
            NodeKind::Grid(Grid::default()),
            NodeKind::Axes { size: 5.0 },
        ];
        for kind in helpers {
            self.next_id += 1;
            self.nodes.push(SceneNode { id: self.next_id, kind });
        }
    }
}
