#[path = "../common/mod.rs"]
mod common;

mod collaborators;
mod registry;
mod routing;
mod scenario;
mod search;
mod writes;
