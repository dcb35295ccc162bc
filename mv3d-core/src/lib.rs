/// MV3D Core Library - model viewer orchestration and shared geometry
///
/// This library holds everything the terminal and web hosts share: asset
/// parsing (OBJ, MTL, FBX), the scene graph, the camera rig, the manipulation
/// gizmo and the `Viewer` that sequences load cycles and the render loop.
pub mod asset;
pub mod color;
pub mod error;
pub mod fbx;
pub mod format;
pub mod geometry;
pub mod gizmo;
pub mod keymap;
pub mod loader;
pub mod mtl;
pub mod obj;
pub mod projection;
pub mod request;
pub mod rig;
pub mod scene;
pub mod transform;
pub mod viewer;

// Re-export commonly used types
pub use asset::{AnimationClip, LoadedObject, Material, MaterialLibrary};
pub use color::Rgb;
pub use error::{FetchError, LoadError, ParseError};
pub use format::AssetFormat;
pub use geometry::{Bounds, Mesh, Triangle, Vertex};
pub use gizmo::{GizmoMode, GizmoView, ManipulationGizmo, TransformGizmo};
pub use keymap::Key;
pub use loader::{AssetSource, FetchCallback};
pub use projection::{Camera, CameraPose, ScreenPoint};
pub use request::{LoadState, Vec3Config, ViewerRequest};
pub use scene::{NodeKind, SceneGraph};
pub use transform::{ObjectTransform, RotationState, Transform};
pub use viewer::{Frame, LineSegment, RenderSurface, Subscription, Viewer};
