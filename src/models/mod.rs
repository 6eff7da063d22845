pub mod fixture;
pub mod news;
pub mod page;
pub mod tournament;
pub mod user;
