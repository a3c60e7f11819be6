#[macro_use]
extern crate rocket;

mod api;
mod config;
mod db;
mod models;
mod services;
mod utils;

use anyhow::Result;

#[rocket::main]
async fn main() -> Result<()> {
    config::load_environment();
    config::init_logger();

    // Refuses to start without credentials or a reachable database.
    let state = config::create_app_state().await?;
    let cors = config::create_cors()?;

    rocket::build()
        .manage(state)
        .attach(cors)
        .mount(
            "/api/songs",
            routes![
                api::songs::list_songs,
                api::songs::latest_songs,
                api::songs::trending_songs,
                api::songs::search_songs,
                api::songs::generate_song_description,
            ],
        )
        .mount(
            "/api/artists",
            routes![
                api::artists::list_artists,
                api::artists::artist_detail,
                api::artists::generate_description,
            ],
        )
        .mount(
            "/api",
            routes![
                api::discovery::update_songs,
                api::discovery::cleanup_old_songs,
                api::discovery::add_song,
                api::discovery::bulk_add_songs,
                api::discovery::stats,
            ],
        )
        .launch()
        .await?;

    Ok(())
}
