use bevy::prelude::*;
use bevy::window::{PresentMode, Window, WindowPlugin};

#[cfg(feature = "dev")]
use bevy::dev_tools::fps_overlay::FpsOverlayPlugin;

mod animation;
mod error;
mod geo;
mod map;
mod positions;
mod render;
mod settings;
mod ui;

use animation::AnimationPlugin;
use map::MapPlugin;
use positions::PositionsPlugin;
use settings::AppSettings;
use ui::UiPlugin;

fn setup_camera(mut commands: Commands) {
    commands.spawn((Camera2d, Name::new("Map Camera")));
}

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Satellite Track Map".to_string(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    }));

    #[cfg(feature = "dev")]
    app.add_plugins(FpsOverlayPlugin::default());

    // After DefaultPlugins so the [SETTINGS] log lines reach the subscriber.
    AppSettings::load().insert_into(&mut app);
    app.insert_resource(ClearColor(Color::srgb(0.96, 0.96, 0.96)));

    app.add_plugins(MapPlugin);
    app.add_plugins(PositionsPlugin);
    app.add_plugins(AnimationPlugin);
    app.add_plugins(UiPlugin);
    app.add_systems(Startup, setup_camera);

    app.run();
}
