/// STL file parser for binary and ASCII formats
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, tuple},
    IResult,
};
use tracing::debug;

use crate::error::SourceError;
use crate::geometry::{face_normal, IndexedMesh};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// One STL facet: its declared normal and three corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facet {
    pub normal: Vector3<f32>,
    pub vertices: [Point3<f32>; 3],
}

/// Read and parse an STL file from disk.
pub fn read_stl(path: &Path) -> Result<IndexedMesh, SourceError> {
    let data = fs::read(path).map_err(|e| SourceError::from_io(path, e))?;
    let mesh = parse_stl(&data)?;
    debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "Parsed STL"
    );
    Ok(mesh)
}

/// Detect and parse STL data (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<IndexedMesh, SourceError> {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if data[start..].starts_with(b"solid") {
        // Binary headers may also start with "solid"; only trust ASCII if it parses.
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<IndexedMesh, SourceError> {
    Ok(weld_facets(&parse_binary_facets(data)?))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<IndexedMesh, SourceError> {
    match ascii_solid(input) {
        Ok((_, facets)) => Ok(weld_facets(&facets)),
        Err(e) => Err(SourceError::Stl(format!("failed to parse ASCII STL: {e}"))),
    }
}

fn parse_binary_facets(data: &[u8]) -> Result<Vec<Facet>, SourceError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(SourceError::Stl(format!(
            "file too small to be a valid STL: {} bytes",
            data.len()
        )));
    }

    let (body, facet_count) = binary_header(data)
        .map_err(|_| SourceError::Stl("unreadable binary header".to_string()))?;
    let facet_count = facet_count as usize;

    let expected = facet_count.saturating_mul(FACET_LEN);
    if body.len() < expected {
        return Err(SourceError::Stl(format!(
            "unexpected end of file: {facet_count} facets need {expected} bytes, found {}",
            body.len()
        )));
    }

    let (_, facets) = count(binary_facet, facet_count)(body)
        .map_err(|_| SourceError::Stl("malformed binary facet data".to_string()))?;
    Ok(facets)
}

fn binary_header(input: &[u8]) -> IResult<&[u8], u32> {
    let (input, _) = take(HEADER_LEN)(input)?;
    le_u32(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Facet> {
    let (input, normal) = binary_vector3(input)?;
    let (input, a) = binary_vector3(input)?;
    let (input, b) = binary_vector3(input)?;
    let (input, c) = binary_vector3(input)?;
    // Attribute byte count, unused
    let (input, _) = le_u16(input)?;

    Ok((
        input,
        Facet {
            normal,
            vertices: [a.into(), b.into(), c.into()],
        },
    ))
}

fn binary_vector3(input: &[u8]) -> IResult<&[u8], Vector3<f32>> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Vector3::new(x, y, z)))
}

fn ascii_solid(input: &str) -> IResult<&str, Vec<Facet>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, facets) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    Ok((input, facets))
}

fn ascii_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = ascii_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = ascii_vertex(input)?;
    let (input, b) = ascii_vertex(input)?;
    let (input, c) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((
        input,
        Facet {
            normal,
            vertices: [a, b, c],
        },
    ))
}

fn ascii_vertex(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, v) = ascii_vector3(input)?;
    Ok((input, v.into()))
}

fn ascii_vector3(input: &str) -> IResult<&str, Vector3<f32>> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, Vector3::new(x, y, z)))
}

/// Merge bit-identical corners into shared vertices.
///
/// Each welded vertex gets the normalized sum of the normals of the facets
/// that touch it. A facet with a zero declared normal contributes its
/// geometric normal instead.
pub fn weld_facets(facets: &[Facet]) -> IndexedMesh {
    let mut lookup: HashMap<[u32; 3], usize> = HashMap::with_capacity(facets.len());
    let mut positions = Vec::with_capacity(facets.len());
    let mut normal_sums: Vec<Vector3<f32>> = Vec::with_capacity(facets.len());
    let mut indices = Vec::with_capacity(facets.len() * 3);

    for facet in facets {
        let [a, b, c] = &facet.vertices;
        let normal = facet
            .normal
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| face_normal(a, b, c));

        for corner in &facet.vertices {
            let index = *lookup.entry(weld_key(corner)).or_insert_with(|| {
                positions.push(*corner);
                normal_sums.push(Vector3::zeros());
                positions.len() - 1
            });
            normal_sums[index] += normal;
            indices.push(index);
        }
    }

    let normals = normal_sums
        .into_iter()
        .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros))
        .collect();

    IndexedMesh::new(positions, indices).with_normals(normals)
}

fn weld_key(p: &Point3<f32>) -> [u32; 3] {
    // Adding 0.0 folds -0.0 onto 0.0
    [
        (p.x + 0.0).to_bits(),
        (p.y + 0.0).to_bits(),
        (p.z + 0.0).to_bits(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_stl(facets: &[[[f32; 3]; 4]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&(facets.len() as u32).to_le_bytes());
        for facet in facets {
            for v in facet {
                for c in v {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        data
    }

    const QUAD: [[[f32; 3]; 4]; 2] = [
        [[0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
        [[0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
    ];

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangle_count(), 0);
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn binary_quad_is_welded() {
        let mesh = parse_binary_stl(&binary_stl(&QUAD)).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);

        let normals = mesh.normals.unwrap();
        assert!(normals.iter().all(|n| (n - Vector3::z()).norm() < 1e-6));
    }

    #[test]
    fn truncated_binary_is_rejected() {
        let mut data = binary_stl(&QUAD);
        data.truncate(data.len() - 10);
        let err = parse_binary_stl(&data).unwrap_err();
        assert!(matches!(err, SourceError::Stl(_)));
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn too_small_is_rejected() {
        assert!(parse_stl(&[0u8; 20]).is_err());
    }

    #[test]
    fn ascii_with_names() {
        let text = "solid part\n\
            facet normal 0 0 1\n\
              outer loop\n\
                vertex 0 0 0\n\
                vertex 1 0 0\n\
                vertex 1 1 0\n\
              endloop\n\
            endfacet\n\
            facet normal 0 0 1\n\
              outer loop\n\
                vertex 0 0 0\n\
                vertex 1 1 0\n\
                vertex 0 1 0\n\
              endloop\n\
            endfacet\n\
            endsolid part\n";

        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn binary_header_starting_with_solid() {
        let mut data = binary_stl(&QUAD);
        data[..5].copy_from_slice(b"solid");
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn zero_normal_falls_back_to_geometry() {
        let mut facets = QUAD;
        facets[0][0] = [0.0, 0.0, 0.0];
        facets[1][0] = [0.0, 0.0, 0.0];
        let mesh = parse_binary_stl(&binary_stl(&facets)).unwrap();
        let normals = mesh.normals.unwrap();
        assert!(normals.iter().all(|n| (n - Vector3::z()).norm() < 1e-6));
    }

    #[test]
    fn negative_zero_welds_with_zero() {
        let mut facets = QUAD;
        facets[1][1] = [-0.0, -0.0, 0.0];
        let mesh = parse_binary_stl(&binary_stl(&facets)).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
    }
}
