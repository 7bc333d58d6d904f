//! End-to-end geometry: command stream to compiled draw lists

mod common;

use common::{quad, quad_file, MapReader};
use csl_multiplayer::{
    build_model, LightPoint, MockGpu, ObjCommand, ObjFile, ObjLoader, ObjVertex,
    PlaneRenderer, RecordingRenderer, RenderCall, RuntimeConfig, Topology, Vertex,
};

#[test]
fn test_single_quad_without_lod() {
    let model = build_model("CSL/B738/B738.obj", quad_file(0.0, "B738"), 40000.0, |_| false);

    assert_eq!(model.lods().len(), 1);
    let lod = &model.lods()[0];
    assert_eq!((lod.near, lod.far), (0.0, 40000.0));
    assert_eq!(lod.pool().len(), 4);
    assert_eq!(lod.indices(), &[0, 1, 2, 0, 2, 3]);

    for vertex in lod.pool().vertices() {
        let [x, y, z] = vertex.normal;
        assert!(x.abs() < 1e-5 && y.abs() < 1e-5);
        assert!((z.abs() - 1.0).abs() < 1e-5);
    }

    assert_eq!(model.default_texture(), "CSL/B738/B738.png");
    assert_eq!(model.default_lit_texture(), Some("CSL/B738/B738_LIT.png"));
}

#[test]
fn test_declared_lods_split_geometry_and_lights() {
    let file = ObjFile {
        commands: vec![
            ObjCommand::Lod {
                near: 0.0,
                far: 1000.0,
            },
            quad(0.0),
            ObjCommand::Lights(vec![LightPoint {
                position: [0.0, 2.0, 0.0],
                rgb: [11.0, 11.0, 11.0],
            }]),
            ObjCommand::Lod {
                near: 1000.0,
                far: 20000.0,
            },
            ObjCommand::Polygon {
                topology: Topology::TriangleFan,
                vertices: vec![
                    ObjVertex::new([0.0, 0.0, 0.0], [0.0, 0.0]),
                    ObjVertex::new([1.0, 0.0, 0.0], [0.0, 0.0]),
                    ObjVertex::new([1.0, 1.0, 0.0], [0.0, 0.0]),
                    ObjVertex::new([0.0, 1.0, 0.0], [0.0, 0.0]),
                    ObjVertex::new([-1.0, 0.5, 0.0], [0.0, 0.0]),
                ],
            },
        ],
        texture: "tex".to_string(),
    };
    let model = build_model("a/b.obj", file, 40000.0, |_| false);

    assert_eq!(model.lods().len(), 2);
    assert_eq!(model.lods()[0].triangle_count(), 2);
    assert_eq!(model.lods()[0].lights().len(), 1);
    assert_eq!(model.lods()[1].triangle_count(), 3);
    assert!(model.lods()[1].lights().is_empty());

    // Bounds are inclusive and the first match wins
    let at_boundary = model.lod_for_distance(1000.0).unwrap();
    assert_eq!(at_boundary.far, 1000.0);
    assert!(model.lod_for_distance(25000.0).is_none());
}

#[test]
fn test_shared_corners_are_deduplicated() {
    let file = ObjFile {
        commands: vec![quad(0.0), quad(0.0)],
        texture: "t".to_string(),
    };
    let model = build_model("t.obj", file, 40000.0, |_| false);

    assert_eq!(model.lods()[0].pool().len(), 4);
    assert_eq!(model.lods()[0].triangle_count(), 4);
}

#[test]
fn test_calculated_offset_is_lowest_point() {
    let model = build_model("t.obj", quad_file(-1.25, "t"), 40000.0, |_| false);
    assert_eq!(model.calculated_offset(), Some(1.25));
}

#[test]
fn test_loader_reads_through_collaborator() {
    let reader = MapReader::default();
    reader.insert("CSL/C172/c172.obj", quad_file(0.0, "c172"));
    reader.touch("CSL/C172/c172LIT.png");
    let loader = ObjLoader::new(reader, &RuntimeConfig::default());

    let model = loader.load_now("CSL/C172/c172.obj").unwrap();
    assert_eq!(model.default_lit_texture(), Some("CSL/C172/c172LIT.png"));
    assert!(loader.load_now("CSL/missing.obj").is_err());
}

#[test]
fn test_compile_uploads_interleaved_vertices() {
    let gpu = MockGpu::new();
    let model = build_model("t.obj", quad_file(0.0, "t"), 40000.0, |_| false);
    let lod = &model.lods()[0];
    let mut renderer = RecordingRenderer::new(gpu.clone());

    let list = lod.compile::<MockGpu, _>(&mut renderer).unwrap();
    let again = lod.compile::<MockGpu, _>(&mut renderer).unwrap();
    assert_eq!(list, again);
    assert_eq!(renderer.compiled(), 1);
    assert_eq!(lod.draw_list(), Some(list));

    let (vertex_buffer, _) = renderer.buffers(list).unwrap();
    assert_eq!(vertex_buffer.size(), 4 * Vertex::size());
    assert_eq!(
        renderer.calls()[0],
        RenderCall::Compile {
            list,
            vertices: 4,
            indices: 6,
        }
    );

    renderer.call_draw_list(list);
    assert_eq!(renderer.calls().len(), 2);
    assert!(gpu.allocated_bytes() > 0);
}
