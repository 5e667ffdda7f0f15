//! Headless level loading tool.
//!
//! Loads the level given as the first argument (RON `LevelData`), or generates the default
//! layout when none is given, drives the terrain loader one phase per frame, and writes
//! `assets/placements.bin` for runtime use. Generation settings come from
//! `assets/generation.ron` when that file exists.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use bevy::app::{AppExit, ScheduleRunnerPlugin};
use bevy::prelude::*;

use course::{
    ChunkCoord, ChunkHost, ChunkRecord, ChunkStore, GenerationConfig, HoleTable, LevelData,
    LevelGenerator, LevelLayout, LoadState, PlacementDb, TerrainLoader,
};

// -----------------------------------------------------------------------------
// Config
// -----------------------------------------------------------------------------

#[derive(Resource)]
struct LoaderConfig {
    level_path: Option<PathBuf>,
    config_path: PathBuf,
    output_path: PathBuf,
}

/// Host that keeps track of the chunk meshes it would build.
#[derive(Resource, Default)]
struct CountingHost {
    meshes: usize,
    rebuilds: usize,
    hole_points: usize,
    visible: usize,
}

impl ChunkHost for CountingHost {
    fn build_mesh(&mut self, chunk: &ChunkRecord, _holes: &HoleTable) {
        let first_build = !chunk.has_mesh();
        if first_build {
            self.meshes += 1;
            self.hole_points += chunk
                .map()
                .points()
                .iter()
                .filter(|p| p.hole().is_some())
                .count();
        } else {
            self.rebuilds += 1;
        }
        debug!(
            "{} mesh for chunk {}",
            if first_build { "Building" } else { "Rebuilding" },
            chunk.coord()
        );
    }

    fn set_visible(&mut self, _coord: ChunkCoord, visible: bool) {
        if visible {
            self.visible += 1;
        }
    }

    fn destroy(&mut self, coord: ChunkCoord) {
        debug!("Destroying chunk {}", coord);
        self.meshes = self.meshes.saturating_sub(1);
    }
}

fn main() {
    let workspace_root = std::env::current_dir().expect("cwd");
    let assets_dir = workspace_root.join("assets");

    let mut app = App::new();

    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_millis(1))));
    app.add_plugins(bevy::log::LogPlugin::default());

    app.insert_resource(LoaderConfig {
        level_path: std::env::args().nth(1).map(PathBuf::from),
        config_path: assets_dir.join("generation.ron"),
        output_path: assets_dir.join("placements.bin"),
    });
    app.init_resource::<CountingHost>();

    app.add_systems(Startup, start_load);
    app.add_systems(Update, step_load);

    app.run();
}

fn start_load(mut commands: Commands, config: Res<LoaderConfig>) {
    let generation = if config.config_path.exists() {
        GenerationConfig::from_file(&config.config_path).unwrap_or_else(|e| {
            panic!("Failed to load generation config {:?}: {e}", config.config_path)
        })
    } else {
        info!(
            "No generation config at {:?}, using defaults",
            config.config_path
        );
        GenerationConfig::default()
    };

    let level = match &config.level_path {
        Some(path) => LevelData::from_file(path)
            .unwrap_or_else(|e| panic!("Failed to load level {path:?}: {e}")),
        None => {
            let layout = LevelLayout {
                chunk_size: generation.chunk_size,
                ..default()
            };
            info!("No level given, generating '{}'", layout.name);
            LevelGenerator::new(layout)
                .with_terrain(generation.terrain.clone())
                .generate()
        }
    };

    if level.chunks.is_empty() {
        warn!("Level '{}' has no chunks", level.name);
    }

    commands.insert_resource(ChunkStore::from_config(&generation));
    commands.insert_resource(TerrainLoader::new(level, &generation.decoration));
}

fn step_load(
    mut commands: Commands,
    config: Res<LoaderConfig>,
    loader: Option<ResMut<TerrainLoader>>,
    store: Option<ResMut<ChunkStore>>,
    mut host: ResMut<CountingHost>,
    mut app_exit: MessageWriter<AppExit>,
) {
    let (Some(mut loader), Some(mut store)) = (loader, store) else {
        return;
    };

    // One phase per frame
    let state = match loader.step(&mut store, &mut *host) {
        Ok(state) => state,
        Err(e) => {
            error!("Level load failed: {e}");
            commands.remove_resource::<TerrainLoader>();
            app_exit.write(AppExit::error());
            return;
        }
    };

    if state != LoadState::Done {
        return;
    }

    let all: std::collections::HashSet<ChunkCoord> =
        store.all_chunks().map(|r| r.coord()).collect();
    store.set_visible(&all, &mut *host);

    let db = PlacementDb::from_store(&store);
    let bytes = db.to_bytes().expect("serialize placement db");
    if let Some(parent) = config.output_path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("Failed to create {parent:?}: {e}"));
    }
    fs::write(&config.output_path, &bytes)
        .unwrap_or_else(|e| panic!("Failed to write output {:?}: {e}", config.output_path));

    let stats = loader.stats();
    info!(
        "Wrote placements to {:?} ({} bytes, {} chunks, {} objects)",
        config.output_path,
        bytes.len(),
        db.chunks.len(),
        db.object_count()
    );
    info!(
        "{} meshes built, {} rebuilt after hole merges ({} merges), {} hole points, {} visible",
        host.meshes, host.rebuilds, stats.hole_merges, host.hole_points, host.visible
    );

    // Drop the loader so nothing steps again before exit.
    commands.remove_resource::<TerrainLoader>();
    app_exit.write(AppExit::Success);
}
