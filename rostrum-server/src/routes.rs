pub mod admin;
pub mod auctions;
pub mod bidders;
pub mod deposits;
pub mod rooms;
