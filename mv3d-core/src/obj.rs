/// Wavefront OBJ parser
use nalgebra::{Point3, Vector3};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, i64 as int, space0, space1},
    combinator::{map, opt, rest},
    multi::separated_list1,
    number::complete::float,
    sequence::{pair, preceded, tuple},
    IResult,
};
use tracing::debug;

use crate::error::ParseError;
use crate::geometry::{Mesh, Triangle, Vertex};

/// A parsed OBJ file
#[derive(Debug, Clone, PartialEq)]
pub struct ObjDocument {
    pub mesh: Mesh,
    /// Libraries named by `mtllib` statements
    pub material_libraries: Vec<String>,
}

/// One `v/vt/vn` reference inside a face
#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceVertex {
    position: i64,
    normal: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Position(Point3<f32>),
    Normal(Vector3<f32>),
    Face(Vec<FaceVertex>),
    UseMaterial(String),
    MaterialLibrary(String),
    Ignored,
}

/// Parse OBJ text into a triangle mesh
pub fn parse_obj(input: &str) -> Result<ObjDocument, ParseError> {
    let mut positions: Vec<Point3<f32>> = Vec::new();
    let mut normals: Vec<Vector3<f32>> = Vec::new();
    let mut mesh = Mesh::new();
    let mut material_libraries = Vec::new();
    let mut current_material = None;

    for (number, raw) in input.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let statement = match parse_statement(line) {
            Ok((_, statement)) => statement,
            Err(_) if is_known_keyword(line) => {
                return Err(ParseError::Syntax {
                    line: number + 1,
                    message: format!("malformed statement '{}'", line),
                })
            }
            Err(_) => {
                debug!("skipping unsupported OBJ statement on line {}", number + 1);
                continue;
            }
        };

        match statement {
            Statement::Position(p) => positions.push(p),
            Statement::Normal(n) => normals.push(n),
            Statement::UseMaterial(name) => current_material = Some(mesh.material_slot(&name)),
            Statement::MaterialLibrary(name) => material_libraries.push(name),
            Statement::Face(refs) => {
                if refs.len() < 3 {
                    return Err(ParseError::Syntax {
                        line: number + 1,
                        message: "face needs at least three vertices".to_string(),
                    });
                }
                let vertices = refs
                    .iter()
                    .map(|r| resolve_vertex(r, &positions, &normals))
                    .collect::<Result<Vec<_>, _>>()?;

                // Fan triangulation around the first vertex
                for i in 1..vertices.len() - 1 {
                    mesh.add_triangle(
                        Triangle::new(vertices[0], vertices[i], vertices[i + 1]).with_material(current_material),
                    );
                }
            }
            Statement::Ignored => {}
        }
    }

    if mesh.is_empty() {
        return Err(ParseError::Empty);
    }

    mesh.fill_flat_normals();
    Ok(ObjDocument {
        mesh,
        material_libraries,
    })
}

fn is_known_keyword(line: &str) -> bool {
    let keyword = line.split_whitespace().next().unwrap_or("");
    matches!(keyword, "v" | "vn" | "f" | "usemtl" | "mtllib")
}

/// Resolve a 1-based (or negative, relative) OBJ index
fn resolve_index(index: i64, count: usize) -> Result<usize, ParseError> {
    let resolved = if index > 0 {
        index - 1
    } else {
        count as i64 + index
    };
    if index == 0 || resolved < 0 || resolved >= count as i64 {
        return Err(ParseError::IndexOutOfRange { index, count });
    }
    Ok(resolved as usize)
}

fn resolve_vertex(
    face_vertex: &FaceVertex,
    positions: &[Point3<f32>],
    normals: &[Vector3<f32>],
) -> Result<Vertex, ParseError> {
    let position = positions[resolve_index(face_vertex.position, positions.len())?];
    let normal = match face_vertex.normal {
        Some(index) => normals[resolve_index(index, normals.len())?],
        None => Vector3::zeros(),
    };
    Ok(Vertex { position, normal })
}

fn parse_statement(input: &str) -> IResult<&str, Statement> {
    alt((
        map(preceded(pair(tag("vn"), space1), parse_vector3), |(x, y, z)| {
            Statement::Normal(Vector3::new(x, y, z))
        }),
        map(preceded(tag("vt"), rest), |_| Statement::Ignored),
        map(preceded(pair(tag("v"), space1), parse_vector3), |(x, y, z)| {
            Statement::Position(Point3::new(x, y, z))
        }),
        map(
            preceded(pair(tag("f"), space1), separated_list1(space1, parse_face_vertex)),
            Statement::Face,
        ),
        map(preceded(pair(tag("usemtl"), space1), rest), |name: &str| {
            Statement::UseMaterial(name.trim().to_string())
        }),
        map(preceded(pair(tag("mtllib"), space1), rest), |name: &str| {
            Statement::MaterialLibrary(name.trim().to_string())
        }),
        map(
            pair(alt((tag("o"), tag("g"), tag("s"))), alt((space1, space0))),
            |_| Statement::Ignored,
        ),
    ))(input)
}

fn parse_face_vertex(input: &str) -> IResult<&str, FaceVertex> {
    let (input, (position, _texcoord, normal)) = tuple((
        int,
        opt(preceded(char('/'), opt(int))),
        opt(preceded(char('/'), int)),
    ))(input)?;
    Ok((input, FaceVertex { position, normal }))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, x) = float(input)?;
    let (input, _) = space1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = space1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}
