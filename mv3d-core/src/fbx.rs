/// Binary FBX reader
///
/// Walks the node-record tree and extracts what the viewer shows: mesh
/// geometry from `Objects/Geometry` and animation clip names and lengths from
/// `Objects/AnimationStack`. Skinning, materials and model transforms are not
/// read.
use std::io::Read;

use flate2::read::ZlibDecoder;
use nalgebra::Point3;
use tracing::debug;

use crate::asset::AnimationClip;
use crate::error::ParseError;
use crate::geometry::{Mesh, Triangle, Vertex};

const MAGIC: &[u8] = b"Kaydara FBX Binary  \0";
const HEADER_LEN: usize = 27;
/// FBX time units per second
const KTIME_PER_SECOND: f64 = 46_186_158_000.0;
/// Deepest node nesting accepted; real files stay in single digits
const MAX_NODE_DEPTH: usize = 64;

/// A single property value of a node record
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Raw(Vec<u8>),
    BoolArray(Vec<bool>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
}

impl Property {
    fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(s) => Some(s),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Property::I16(v) => Some(*v as i64),
            Property::I32(v) => Some(*v as i64),
            Property::I64(v) => Some(*v),
            _ => None,
        }
    }

    fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Property::F64Array(v) => Some(v.clone()),
            Property::F32Array(v) => Some(v.iter().map(|&x| x as f64).collect()),
            _ => None,
        }
    }

    fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match self {
            Property::I32Array(v) => Some(v.iter().map(|&x| x as i64).collect()),
            Property::I64Array(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// A node record and its children
#[derive(Debug, Clone, PartialEq)]
pub struct FbxNode {
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<FbxNode>,
}

impl FbxNode {
    pub fn child(&self, name: &str) -> Option<&FbxNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FbxNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// What the viewer takes from an FBX file
#[derive(Debug, Clone, PartialEq)]
pub struct FbxDocument {
    pub version: u32,
    pub mesh: Mesh,
    pub animations: Vec<AnimationClip>,
}

/// Parse a binary FBX file
pub fn parse_fbx(data: &[u8]) -> Result<FbxDocument, ParseError> {
    let (version, roots) = parse_tree(data)?;

    let objects = roots
        .iter()
        .find(|n| n.name == "Objects")
        .ok_or(ParseError::Empty)?;

    let mut mesh = Mesh::new();
    for geometry in objects.children_named("Geometry") {
        append_geometry(&mut mesh, geometry)?;
    }
    if mesh.is_empty() {
        return Err(ParseError::Empty);
    }
    mesh.fill_flat_normals();

    let animations = objects.children_named("AnimationStack").map(animation_clip).collect();

    Ok(FbxDocument {
        version,
        mesh,
        animations,
    })
}

/// Parse the header and the top-level node records
pub fn parse_tree(data: &[u8]) -> Result<(u32, Vec<FbxNode>), ParseError> {
    if data.len() < HEADER_LEN || !data.starts_with(MAGIC) {
        return Err(ParseError::NotBinaryFbx);
    }

    let mut reader = Reader {
        data,
        pos: 23,
        wide: false,
    };
    let version = reader.u32()?;
    reader.wide = version >= 7500;
    debug!("FBX version {}", version);

    let mut roots = Vec::new();
    while reader.pos < data.len() {
        match reader.node(0)? {
            Some(node) => roots.push(node),
            None => break,
        }
    }
    Ok((version, roots))
}

fn append_geometry(mesh: &mut Mesh, geometry: &FbxNode) -> Result<(), ParseError> {
    let Some(coords) = geometry
        .child("Vertices")
        .and_then(|n| n.properties.first())
        .and_then(Property::to_f64_vec)
    else {
        return Ok(());
    };
    let Some(indices) = geometry
        .child("PolygonVertexIndex")
        .and_then(|n| n.properties.first())
        .and_then(Property::to_i64_vec)
    else {
        return Ok(());
    };

    let positions: Vec<Point3<f32>> = coords
        .chunks_exact(3)
        .map(|c| Point3::new(c[0] as f32, c[1] as f32, c[2] as f32))
        .collect();
    let lookup = |index: i64| -> Result<Vertex, ParseError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| positions.get(i))
            .map(|p| Vertex::at(*p))
            .ok_or(ParseError::IndexOutOfRange {
                index,
                count: positions.len(),
            })
    };

    // A negative index closes a polygon and encodes `-(index + 1)`
    let mut polygon = Vec::new();
    for &raw in &indices {
        let last = raw < 0;
        polygon.push(lookup(if last { !raw } else { raw })?);
        if last {
            for i in 1..polygon.len().saturating_sub(1) {
                mesh.add_triangle(Triangle::new(polygon[0], polygon[i], polygon[i + 1]));
            }
            polygon.clear();
        }
    }
    Ok(())
}

fn animation_clip(stack: &FbxNode) -> AnimationClip {
    let raw = stack.properties.get(1).and_then(Property::as_str).unwrap_or("");
    let name = match raw.split_once("\u{0}\u{1}") {
        Some((name, _class)) => name,
        None => raw.strip_prefix("AnimStack::").unwrap_or(raw),
    }
    .to_string();

    let property = |key: &str| {
        stack
            .child("Properties70")?
            .children_named("P")
            .find(|p| p.properties.first().and_then(Property::as_str) == Some(key))?
            .properties
            .last()?
            .as_i64()
    };
    let start = property("LocalStart").unwrap_or(0);
    let stop = property("LocalStop").unwrap_or(start);
    let duration = (stop.saturating_sub(start).max(0) as f64 / KTIME_PER_SECOND) as f32;

    AnimationClip { name, duration }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    /// 64-bit record headers (version 7500 and later)
    wide: bool,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        let end = self.pos.checked_add(len).ok_or(ParseError::Truncated(self.pos))?;
        let slice = self.data.get(self.pos..end).ok_or(ParseError::Truncated(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, ParseError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn header_word(&mut self) -> Result<u64, ParseError> {
        if self.wide {
            self.u64()
        } else {
            self.u32().map(u64::from)
        }
    }

    /// Read one node record; `None` for the null record that ends a list
    fn node(&mut self, depth: usize) -> Result<Option<FbxNode>, ParseError> {
        let start = self.pos;
        let end_offset = self.header_word()? as usize;
        let num_properties = self.header_word()?;
        let _property_list_len = self.header_word()?;
        let name_len = self.u8()? as usize;

        if end_offset == 0 {
            return Ok(None);
        }
        if end_offset <= start || end_offset > self.data.len() || depth > MAX_NODE_DEPTH {
            return Err(ParseError::Truncated(start));
        }

        let name = String::from_utf8_lossy(self.bytes(name_len)?).into_owned();
        let mut properties = Vec::new();
        for _ in 0..num_properties {
            properties.push(self.property()?);
        }

        let mut children = Vec::new();
        while self.pos < end_offset {
            match self.node(depth + 1)? {
                Some(child) => children.push(child),
                None => break,
            }
        }
        self.pos = end_offset;

        Ok(Some(FbxNode {
            name,
            properties,
            children,
        }))
    }

    fn property(&mut self) -> Result<Property, ParseError> {
        let code = self.u8()? as char;
        let property = match code {
            'C' => Property::Bool(self.u8()? != 0),
            'Y' => Property::I16(i16::from_le_bytes(self.array()?)),
            'I' => Property::I32(i32::from_le_bytes(self.array()?)),
            'L' => Property::I64(i64::from_le_bytes(self.array()?)),
            'F' => Property::F32(f32::from_le_bytes(self.array()?)),
            'D' => Property::F64(f64::from_le_bytes(self.array()?)),
            'S' => {
                let len = self.u32()? as usize;
                Property::String(String::from_utf8_lossy(self.bytes(len)?).into_owned())
            }
            'R' => {
                let len = self.u32()? as usize;
                Property::Raw(self.bytes(len)?.to_vec())
            }
            'b' => Property::BoolArray(self.array_data(1)?.iter().map(|&b| b != 0).collect()),
            'i' => Property::I32Array(
                self.array_data(4)?
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            'f' => Property::F32Array(
                self.array_data(4)?
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            'l' => Property::I64Array(
                self.array_data(8)?
                    .chunks_exact(8)
                    .map(|c| i64::from_le_bytes(c.try_into().unwrap_or_default()))
                    .collect(),
            ),
            'd' => Property::F64Array(
                self.array_data(8)?
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes(c.try_into().unwrap_or_default()))
                    .collect(),
            ),
            other => return Err(ParseError::UnknownProperty(other)),
        };
        Ok(property)
    }

    /// Raw little-endian bytes of an array property, inflated if compressed
    fn array_data(&mut self, element_size: usize) -> Result<Vec<u8>, ParseError> {
        let start = self.pos;
        let length = self.u32()? as usize;
        let encoding = self.u32()?;
        let compressed_len = self.u32()? as usize;
        let payload = self.bytes(compressed_len)?;
        let expected = length
            .checked_mul(element_size)
            .ok_or(ParseError::Truncated(start))?;

        let bytes = match encoding {
            0 => payload.to_vec(),
            1 => {
                let mut out = Vec::with_capacity(expected.min(payload.len() * 8));
                ZlibDecoder::new(payload)
                    .take(expected as u64)
                    .read_to_end(&mut out)
                    .map_err(|e| ParseError::Inflate(e.to_string()))?;
                out
            }
            other => return Err(ParseError::Inflate(format!("unknown array encoding {}", other))),
        };

        if bytes.len() != expected {
            return Err(ParseError::Truncated(start));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal writer for building FBX fixtures (7400 layout)
    pub(crate) struct FbxWriter {
        out: Vec<u8>,
    }

    pub(crate) enum Prop<'a> {
        Str(&'a str),
        I64(i64),
        F64Array(&'a [f64]),
        I32Array(&'a [i32]),
        I32ArrayZlib(&'a [i32]),
    }

    impl FbxWriter {
        pub(crate) fn new() -> Self {
            let mut out = MAGIC.to_vec();
            out.extend_from_slice(&[0x1a, 0x00]);
            out.extend_from_slice(&7400u32.to_le_bytes());
            Self { out }
        }

        pub(crate) fn node(&mut self, name: &str, props: &[Prop], children: impl FnOnce(&mut Self)) {
            let start = self.out.len();
            self.out.extend_from_slice(&[0u8; 12]);
            self.out.push(name.len() as u8);
            self.out.extend_from_slice(name.as_bytes());
            let props_start = self.out.len();
            for prop in props {
                self.prop(prop);
            }
            let props_len = (self.out.len() - props_start) as u32;

            let before_children = self.out.len();
            children(self);
            if self.out.len() != before_children {
                self.out.extend_from_slice(&[0u8; 13]);
            }

            let end = self.out.len() as u32;
            self.out[start..start + 4].copy_from_slice(&end.to_le_bytes());
            self.out[start + 4..start + 8].copy_from_slice(&(props.len() as u32).to_le_bytes());
            self.out[start + 8..start + 12].copy_from_slice(&props_len.to_le_bytes());
        }

        fn prop(&mut self, prop: &Prop) {
            match prop {
                Prop::Str(s) => {
                    self.out.push(b'S');
                    self.out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                    self.out.extend_from_slice(s.as_bytes());
                }
                Prop::I64(v) => {
                    self.out.push(b'L');
                    self.out.extend_from_slice(&v.to_le_bytes());
                }
                Prop::F64Array(values) => {
                    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
                    self.raw_array(b'd', values.len(), 0, &bytes);
                }
                Prop::I32Array(values) => {
                    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
                    self.raw_array(b'i', values.len(), 0, &bytes);
                }
                Prop::I32ArrayZlib(values) => {
                    use flate2::{write::ZlibEncoder, Compression};
                    use std::io::Write;
                    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
                    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                    encoder.write_all(&bytes).unwrap();
                    let compressed = encoder.finish().unwrap();
                    self.raw_array(b'i', values.len(), 1, &compressed);
                }
            }
        }

        fn raw_array(&mut self, code: u8, len: usize, encoding: u32, payload: &[u8]) {
            self.out.push(code);
            self.out.extend_from_slice(&(len as u32).to_le_bytes());
            self.out.extend_from_slice(&encoding.to_le_bytes());
            self.out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            self.out.extend_from_slice(payload);
        }

        pub(crate) fn finish(mut self) -> Vec<u8> {
            self.out.extend_from_slice(&[0u8; 13]);
            self.out
        }
    }

    /// A quad plus one animation stack lasting two seconds
    pub(crate) fn quad_fbx(compressed: bool) -> Vec<u8> {
        let mut w = FbxWriter::new();
        w.node("FBXHeaderExtension", &[], |_| {});
        w.node("Objects", &[], |w| {
            w.node(
                "Geometry",
                &[Prop::I64(1), Prop::Str("Quad\u{0}\u{1}Geometry"), Prop::Str("Mesh")],
                |w| {
                    w.node(
                        "Vertices",
                        &[Prop::F64Array(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0])],
                        |_| {},
                    );
                    let indices = [0, 1, 2, -4];
                    let prop = if compressed {
                        Prop::I32ArrayZlib(&indices)
                    } else {
                        Prop::I32Array(&indices)
                    };
                    w.node("PolygonVertexIndex", &[prop], |_| {});
                },
            );
            w.node(
                "AnimationStack",
                &[Prop::I64(2), Prop::Str("Walk\u{0}\u{1}AnimStack"), Prop::Str("")],
                |w| {
                    w.node("Properties70", &[], |w| {
                        w.node(
                            "P",
                            &[
                                Prop::Str("LocalStop"),
                                Prop::Str("KTime"),
                                Prop::Str("Time"),
                                Prop::Str(""),
                                Prop::I64(2 * 46_186_158_000),
                            ],
                            |_| {},
                        );
                    });
                },
            );
        });
        w.finish()
    }

    #[test]
    fn test_quad_geometry_and_clip() {
        let doc = parse_fbx(&quad_fbx(false)).unwrap();
        assert_eq!(doc.version, 7400);
        assert_eq!(doc.mesh.triangles.len(), 2);
        assert_eq!(doc.animations.len(), 1);
        assert_eq!(doc.animations[0].name, "Walk");
        assert!((doc.animations[0].duration - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_compressed_arrays_are_inflated() {
        let doc = parse_fbx(&quad_fbx(true)).unwrap();
        assert_eq!(doc.mesh.triangles.len(), 2);
        assert_eq!(doc.mesh.triangles[1].vertices[2].position, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_ascii_fbx_is_rejected() {
        let text = b"; FBX 7.4.0 project file\nFBXHeaderExtension:  {\n}\n";
        assert_eq!(parse_fbx(text), Err(ParseError::NotBinaryFbx));
    }

    #[test]
    fn test_truncated_file() {
        let data = quad_fbx(false);
        let cut = &data[..data.len() / 2];
        assert!(matches!(parse_fbx(cut), Err(ParseError::Truncated(_))));
    }

    #[test]
    fn test_extreme_clip_bounds_do_not_overflow() {
        let mut w = FbxWriter::new();
        w.node("Objects", &[], |w| {
            w.node(
                "Geometry",
                &[Prop::I64(1), Prop::Str("Tri\u{0}\u{1}Geometry"), Prop::Str("Mesh")],
                |w| {
                    w.node(
                        "Vertices",
                        &[Prop::F64Array(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])],
                        |_| {},
                    );
                    w.node("PolygonVertexIndex", &[Prop::I32Array(&[0, 1, -3])], |_| {});
                },
            );
            w.node("AnimationStack", &[Prop::I64(2), Prop::Str("Spin\u{0}\u{1}AnimStack")], |w| {
                w.node("Properties70", &[], |w| {
                    for (key, value) in [("LocalStart", i64::MIN), ("LocalStop", i64::MAX)] {
                        w.node(
                            "P",
                            &[Prop::Str(key), Prop::Str("KTime"), Prop::Str("Time"), Prop::Str(""), Prop::I64(value)],
                            |_| {},
                        );
                    }
                });
            });
        });

        let doc = parse_fbx(&w.finish()).unwrap();
        assert_eq!(doc.animations.len(), 1);
        let duration = doc.animations[0].duration;
        assert!(duration.is_finite() && duration > 0.0);
    }

    #[test]
    fn test_deeply_nested_nodes_are_rejected() {
        // Each level: 13-byte header plus a one-letter name, closed by a null record
        let depth = 100_000usize;
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[0x1a, 0x00]);
        data.extend_from_slice(&7400u32.to_le_bytes());
        let closers_start = data.len() + depth * 14;
        for level in 0..depth {
            let end = (closers_start + 13 * (depth - level)) as u32;
            data.extend_from_slice(&end.to_le_bytes());
            data.extend_from_slice(&[0u8; 8]);
            data.extend_from_slice(&[1, b'N']);
        }
        data.resize(closers_start + 13 * depth, 0);

        assert!(matches!(parse_tree(&data), Err(ParseError::Truncated(_))));
    }

    #[test]
    fn test_file_without_geometry() {
        let mut w = FbxWriter::new();
        w.node("Objects", &[], |_| {});
        assert_eq!(parse_fbx(&w.finish()), Err(ParseError::Empty));
    }
}
