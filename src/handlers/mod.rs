// One module per resource, mirroring the route prefixes under /api.

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod internal;
pub mod locations;
pub mod orders;
pub mod products;
pub mod tradein;
pub mod users;
