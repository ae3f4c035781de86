pub mod scene_repo;

pub use scene_repo::SceneRepo;
