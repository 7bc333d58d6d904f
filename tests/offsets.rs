//! Vertical offsets fed by package data and by loaded geometry

mod common;

use std::sync::Arc;

use common::{descriptor, quad_file, MapDecoder, MapReader};
use csl_multiplayer::{
    MockGpu, MockSpawner, MultiplayerContext, OffsetSource, RecordingRenderer, RuntimeConfig,
    StaticPreferences,
};

#[test]
fn test_xsb_offset_then_calculated_after_clearing() {
    let gpu = MockGpu::new();
    let reader = MapReader::default();
    reader.insert("CSL/c172/c172.obj", quad_file(-1.5, "c172"));

    let mut ctx = MultiplayerContext::new(
        gpu.clone(),
        MockSpawner::blocking(),
        reader,
        MapDecoder::default(),
        Arc::new(StaticPreferences::new()),
        RuntimeConfig::default(),
    );

    let mut model = descriptor("c172", "C172", "", "");
    model.vertical_offset.set(OffsetSource::Xsb, 0.8);
    model.vertical_offset.resolve();
    let pkg = ctx.registry_mut().add_package("GA", "CSL");
    let model_ref = ctx.registry_mut().add_plane(pkg, model).unwrap();

    let id = ctx.create_plane("C172", "", "");
    assert_eq!(ctx.plane_vertical_offset(id).unwrap(), 0.8);

    // Loading the geometry supplies a calculated candidate
    let mut renderer = RecordingRenderer::new(gpu);
    assert!(ctx.render_plane(id, 100.0, 0.0, &mut renderer).unwrap());
    let offset = &ctx.registry().model(model_ref).unwrap().vertical_offset;
    assert_eq!(offset.candidate(OffsetSource::Calculated), Some(1.5));
    assert_eq!(offset.actual_source(), OffsetSource::Xsb);
    assert_eq!(ctx.plane_vertical_offset(id).unwrap(), 0.8);

    let offset = &mut ctx.registry_mut().model_mut(model_ref).unwrap().vertical_offset;
    offset.clear(OffsetSource::Xsb);
    assert_eq!(offset.resolve(), 1.5);
    assert_eq!(offset.actual_source(), OffsetSource::Calculated);
    assert!(offset.changed());
    assert_eq!(ctx.plane_vertical_offset(id).unwrap(), 1.5);
}

#[test]
fn test_user_override_wins_over_everything() {
    let mut model = descriptor("b738", "B738", "", "");
    let offset = &mut model.vertical_offset;
    offset.set(OffsetSource::Calculated, 2.0);
    offset.set(OffsetSource::Mtl, 2.2);
    offset.set(OffsetSource::Xsb, 2.1);
    offset.resolve();
    assert_eq!(offset.actual_source(), OffsetSource::Xsb);

    offset.set(OffsetSource::User, 3.0);
    assert_eq!(offset.resolve(), 3.0);
    assert_eq!(offset.previous_source(), OffsetSource::Xsb);

    offset.clear(OffsetSource::User);
    offset.clear(OffsetSource::Xsb);
    assert_eq!(offset.resolve(), 2.2);
    assert_eq!(offset.actual_source(), OffsetSource::Mtl);
}
