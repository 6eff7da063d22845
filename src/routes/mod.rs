pub mod auth;
pub mod health;
pub mod leaguetables;
pub mod live;
pub mod news;
pub mod pages;
pub mod results;
pub mod tournaments;
