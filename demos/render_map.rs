use anyhow::Context;
use macroquad::prelude::*;
use macroquad_tmx::render::{draw_map, draw_objects_debug, TextureCache};
use macroquad_tmx::{Loader, LoaderConfig};

fn window_conf() -> Conf {
    Conf {
        window_title: "Render Map".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

async fn run() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/data/level.tmx".to_owned());

    let config = LoaderConfig {
        generate_tile_object_groups: true,
        ..Default::default()
    };
    let map = Loader::new()
        .with_config(config)
        .load_file(&path)
        .with_context(|| format!("Loading map {path}"))?;
    let textures = TextureCache::load(&map).await?;

    let mut show_objects = true;
    loop {
        clear_background(BLACK);

        if is_key_pressed(KeyCode::O) {
            show_objects = !show_objects;
        }

        let origin = vec2(
            (screen_width() - map.pixel_width()) / 2.0,
            (screen_height() - map.pixel_height()) / 2.0,
        );
        draw_map(&map, &textures, origin);
        if show_objects {
            draw_objects_debug(&map, origin, YELLOW);
        }

        draw_text(&format!("FPS: {}", get_fps()), 20.0, 30.0, 30.0, RED);
        draw_text("O: toggle objects", 20.0, 60.0, 24.0, WHITE);

        next_frame().await;
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
