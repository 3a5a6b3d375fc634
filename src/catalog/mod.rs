mod load;
mod models;

pub use load::{load_albums, load_movies, seed_catalog, seed_on_launch, SeedError, SeedReport};
pub use models::*;
