#[path = "../common/mod.rs"]
mod common;

mod db;
mod queue;
mod serializer;
mod tasks;
