/// Wavefront MTL material library parser
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::space1,
    combinator::{map, rest},
    number::complete::float,
    sequence::{pair, preceded},
    IResult,
};
use tracing::debug;

use crate::asset::{Material, MaterialLibrary};
use crate::color::Rgb;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    NewMaterial(String),
    Ambient(Rgb),
    Diffuse(Rgb),
    Specular(Rgb),
    Shininess(f32),
    Dissolve(f32),
    Transparency(f32),
    DiffuseMap(String),
}

/// Parse MTL text into a material library
pub fn parse_mtl(input: &str) -> Result<MaterialLibrary, ParseError> {
    let mut library = MaterialLibrary::default();
    let mut current: Option<Material> = None;

    for (number, raw) in input.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let statement = match parse_statement(line) {
            Ok((_, statement)) => statement,
            Err(_) => {
                debug!("skipping unsupported MTL statement on line {}", number + 1);
                continue;
            }
        };

        if let Statement::NewMaterial(name) = statement {
            if let Some(done) = current.take() {
                library.insert(done);
            }
            current = Some(Material::named(name));
            continue;
        }

        let Some(material) = current.as_mut() else {
            return Err(ParseError::Syntax {
                line: number + 1,
                message: "material property before newmtl".to_string(),
            });
        };

        match statement {
            Statement::Ambient(c) => material.ambient = c,
            Statement::Diffuse(c) => material.diffuse = c,
            Statement::Specular(c) => material.specular = c,
            Statement::Shininess(ns) => material.shininess = ns,
            Statement::Dissolve(d) => material.opacity = d.clamp(0.0, 1.0),
            Statement::Transparency(tr) => material.opacity = (1.0 - tr).clamp(0.0, 1.0),
            Statement::DiffuseMap(path) => material.diffuse_map = Some(path),
            Statement::NewMaterial(_) => unreachable!("handled above"),
        }
    }

    if let Some(done) = current {
        library.insert(done);
    }

    Ok(library)
}

fn parse_statement(input: &str) -> IResult<&str, Statement> {
    alt((
        map(preceded(pair(tag("newmtl"), space1), rest), |name: &str| {
            Statement::NewMaterial(name.trim().to_string())
        }),
        map(preceded(pair(tag("Ka"), space1), parse_rgb), Statement::Ambient),
        map(preceded(pair(tag("Kd"), space1), parse_rgb), Statement::Diffuse),
        map(preceded(pair(tag("Ks"), space1), parse_rgb), Statement::Specular),
        map(preceded(pair(tag("Ns"), space1), float), Statement::Shininess),
        map(preceded(pair(tag("d"), space1), float), Statement::Dissolve),
        map(preceded(pair(tag("Tr"), space1), float), Statement::Transparency),
        map(preceded(pair(tag("map_Kd"), space1), rest), |path: &str| {
            Statement::DiffuseMap(path.trim().to_string())
        }),
    ))(input)
}

fn parse_rgb(input: &str) -> IResult<&str, Rgb> {
    let (input, r) = float(input)?;
    let (input, _) = space1(input)?;
    let (input, g) = float(input)?;
    let (input, _) = space1(input)?;
    let (input, b) = float(input)?;
    Ok((input, Rgb::from_unit(r, g, b)))
}
