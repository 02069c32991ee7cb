//! Layer setup, base map rendering, and canvas → image/text sync.

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use crate::geo::{GeoProjector, Graticule};
use crate::map::fetcher::start_map_worker;
use crate::map::types::{
    BaseLayer, LayerKind, LayerLabel, MapChannels, MapLoadState, MapResult, TrackLayer,
};
use crate::render::{BaseMapStyle, MapRenderer, PixelCanvas, Rgba, TextLabel, TrackRenderer, TrackStyle};
use crate::settings::MapConfig;

pub fn setup_layers(
    mut commands: Commands,
    config: Res<MapConfig>,
    base_style: Res<BaseMapStyle>,
    track_style: Res<TrackStyle>,
    mut images: ResMut<Assets<Image>>,
) {
    let (width, height) = (config.width.max(1), config.height.max(1));
    let projector = GeoProjector::for_canvas(width, height);

    let base_image = images.add(blank_image(width, height));
    let track_image = images.add(blank_image(width, height));

    for (kind, handle, name) in [
        (LayerKind::Base, base_image.clone(), "Base Map Layer"),
        (LayerKind::Track, track_image.clone(), "Track Layer"),
    ] {
        commands.spawn((
            Sprite::from_image(handle),
            Transform::from_xyz(0.0, 0.0, kind.z()),
            Name::new(name),
        ));
    }

    commands.insert_resource(BaseLayer {
        canvas: PixelCanvas::new(width, height),
        renderer: MapRenderer::new(projector, base_style.clone()),
        image: base_image,
        synced_revision: 0,
    });
    commands.insert_resource(TrackLayer {
        canvas: PixelCanvas::new(width, height),
        renderer: TrackRenderer::new(projector, track_style.clone()),
        image: track_image,
        synced_revision: 0,
    });
    info!("[INIT] map layers {}x{}", width, height);
}

pub fn setup_map_worker(mut commands: Commands, config: Res<MapConfig>) {
    let channels = start_map_worker(config.clone());
    info!("[INIT] Map worker started");
    commands.insert_resource(channels);
}

pub fn apply_map_result(
    channels: Option<Res<MapChannels>>,
    base: Option<ResMut<BaseLayer>>,
    mut state: ResMut<MapLoadState>,
) {
    let (Some(channels), Some(mut base)) = (channels, base) else {
        return;
    };
    let Ok(guard) = channels.res_rx.lock() else {
        return;
    };

    while let Ok(msg) = guard.try_recv() {
        handle_map_result(msg, &mut base, &mut state);
    }
}

/// Apply one boundary download outcome. A failure is final: the base layer
/// stays undrawn and nothing arriving later repaints it.
pub fn handle_map_result(msg: MapResult, base: &mut BaseLayer, state: &mut MapLoadState) {
    match msg {
        MapResult::Land(land) => {
            if state.error.is_some() {
                warn!("[MAP] boundary data after a failed download ignored");
                return;
            }
            if base
                .renderer
                .render_base_map(&mut base.canvas, &land, &Graticule::default())
            {
                info!("[MAP] base map drawn from {} features", land.len());
            }
            state.features = land.len();
        }
        MapResult::Failed(err) => {
            error!("[MAP] base map unavailable: {}", err);
            state.error = Some(err);
        }
    }
}

pub fn sync_base_layer(
    mut commands: Commands,
    base: Option<ResMut<BaseLayer>>,
    mut images: ResMut<Assets<Image>>,
    labels: Query<(Entity, &LayerLabel)>,
) {
    let Some(mut base) = base else { return };
    let base = &mut *base;
    sync_layer(
        &mut commands,
        &mut images,
        &labels,
        LayerKind::Base,
        &base.canvas,
        &base.image,
        &mut base.synced_revision,
    );
}

pub fn sync_track_layer(
    mut commands: Commands,
    track: Option<ResMut<TrackLayer>>,
    mut images: ResMut<Assets<Image>>,
    labels: Query<(Entity, &LayerLabel)>,
) {
    let Some(mut track) = track else { return };
    let track = &mut *track;
    sync_layer(
        &mut commands,
        &mut images,
        &labels,
        LayerKind::Track,
        &track.canvas,
        &track.image,
        &mut track.synced_revision,
    );
}

fn sync_layer(
    commands: &mut Commands,
    images: &mut Assets<Image>,
    labels: &Query<(Entity, &LayerLabel)>,
    kind: LayerKind,
    canvas: &PixelCanvas,
    handle: &Handle<Image>,
    synced_revision: &mut u64,
) {
    if canvas.revision() == *synced_revision {
        return;
    }
    let Some(image) = images.get_mut(handle) else {
        return;
    };
    let bytes = canvas.as_bytes();
    let data = image.data.get_or_insert_with(|| vec![0; bytes.len()]);
    if data.len() != bytes.len() {
        data.resize(bytes.len(), 0);
    }
    data.copy_from_slice(bytes);

    for (entity, label) in labels.iter() {
        if label.0 == kind {
            commands.entity(entity).despawn();
        }
    }
    for label in canvas.labels() {
        commands.spawn((
            Text2d::new(label.text.clone()),
            TextFont {
                font_size: label.size,
                ..default()
            },
            TextColor(to_color(label.color)),
            Transform::from_translation(label_translation(canvas, label, kind)),
            LayerLabel(kind),
        ));
    }

    *synced_revision = canvas.revision();
}

fn blank_image(width: u32, height: u32) -> Image {
    Image::new_fill(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &[0u8; 4],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    )
}

pub fn to_color(rgba: Rgba) -> Color {
    Color::srgba(rgba.r, rgba.g, rgba.b, rgba.a)
}

/// Canvas pixel (origin top-left, y down) to world space with the canvas
/// centered on the origin.
pub fn canvas_to_world(width: u32, height: u32, x: f32, y: f32) -> Vec2 {
    Vec2::new(x - width as f32 / 2.0, height as f32 / 2.0 - y)
}

/// Labels are anchored on their baseline; Text2d centers vertically.
fn label_translation(canvas: &PixelCanvas, label: &TextLabel, kind: LayerKind) -> Vec3 {
    let center_y = label.y - label.size * 0.35;
    canvas_to_world(canvas.width(), canvas.height(), label.x, center_y).extend(kind.z() + 0.5)
}
