pub mod auth_service;
pub mod game_service;
pub mod rawg_service;
pub mod save_service;
pub mod storage_service;
pub mod user_service;
pub mod vote_service;
