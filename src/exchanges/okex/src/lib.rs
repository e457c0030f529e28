use serde::Serialize;

mod listener;

pub use listener::{OkexConfig, OkexListener, URL};

fn serialize_to_json<S: Serialize>(value: &S) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}
