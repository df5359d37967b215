//! Reading pass-through elements and raw records into serde types.

use serde::Deserialize;

use ply_mesh::{ElementDecoder, PlyError};

#[derive(Deserialize, Debug, PartialEq)]
struct Edge {
    vertex1: u32,
    vertex2: u32,
    // absent in some files
    crease: Option<f32>,
}

#[derive(Deserialize, Debug, PartialEq)]
struct Camera {
    #[serde(rename = "fov")]
    field_of_view: f64,
    name: Vec<u8>,
}

const SCENE: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element edge 2
property int vertex1
property int vertex2
property uchar unused
element camera 1
property float fov
property list uchar uchar name
end_header
0 0 0
1 0 0
0 1 0
0 1 4
1 2 4
0.5 3 99 97 109
";

#[test]
fn test_opaque_rows_into_structs() {
    let mesh = ply_mesh::from_str(SCENE).unwrap();

    let edges: Vec<Edge> = mesh.other_element("edge").unwrap().deserialize_rows().unwrap();
    assert_eq!(
        edges,
        vec![
            Edge {
                vertex1: 0,
                vertex2: 1,
                crease: None
            },
            Edge {
                vertex1: 1,
                vertex2: 2,
                crease: None
            },
        ]
    );

    let cameras: Vec<Camera> = mesh
        .other_element("camera")
        .unwrap()
        .deserialize_rows()
        .unwrap();
    assert_eq!(
        cameras,
        vec![Camera {
            field_of_view: 0.5,
            name: b"cam".to_vec(),
        }]
    );
}

#[test]
fn test_records_from_decoder() {
    #[derive(Deserialize)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    let mut decoder = ElementDecoder::new(SCENE.as_bytes()).unwrap();
    let vertices = decoder.next_element().unwrap().unwrap();
    let def = vertices.def().clone();

    let positions = vertices
        .map(|record| record?.deserialize_as::<Position>(&def))
        .collect::<Result<Vec<_>, PlyError>>()
        .unwrap();
    let sums: Vec<f32> = positions.iter().map(|p| p.x + p.y + p.z).collect();
    assert_eq!(sums, vec![0.0, 1.0, 1.0]);
}

#[test]
fn test_type_mismatch_reported() {
    #[derive(Deserialize, Debug)]
    #[allow(unused)]
    struct BadCamera {
        fov: u8,
    }

    let mesh = ply_mesh::from_str(SCENE).unwrap();
    let result = mesh
        .other_element("camera")
        .unwrap()
        .deserialize_rows::<BadCamera>();
    assert!(matches!(result, Err(PlyError::Serde(_))));
}
