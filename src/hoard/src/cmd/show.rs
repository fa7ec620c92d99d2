use std::path::PathBuf;

use clap::Args;
use hoard_resource::{ObjectValue, Resource};
use hoard_stream::Data;
use hoard_value::{Dict, Value};
use serde_json::{Map, Number, Value as Json};

use super::{open_pack, Command};
use crate::cli::Threads;

/// Loads a resource from a pack file and prints its value.
#[derive(Debug, Args)]
pub struct Show {
    /// The pack file to load from.
    input: PathBuf,

    /// The name of the resource to show.
    name: String,

    /// Prints the value as JSON instead of a value tree.
    #[clap(long)]
    json: bool,

    /// Prints referenced resources inline instead of as `ref:` strings.
    ///
    /// Only applies to JSON output.
    #[clap(long, requires = "json")]
    resolve: bool,

    #[clap(flatten)]
    threads: Threads,
}

impl Command for Show {
    fn handle(self) -> eyre::Result<()> {
        let cache = open_pack(&self.input, self.threads.executor())?;

        let resource = cache.get_resource_object(&self.name);
        cache.flush_all_resources();

        let value = resource.value();
        if self.json {
            let json = to_json(&value, self.resolve, 0);
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            println!("{value:?}");
        }

        Ok(())
    }
}

// Bounds inlining of cyclic references.
const MAX_DEPTH: usize = 32;

fn to_json(value: &Value, resolve: bool, depth: usize) -> Json {
    if value.is_null() {
        return Json::Null;
    }

    if let Some(&v) = value.get::<bool>() {
        Json::Bool(v)
    } else if let Some(&v) = value.get::<i32>() {
        Json::Number(v.into())
    } else if let Some(&v) = value.get::<f64>() {
        Number::from_f64(v).map_or(Json::Null, Json::Number)
    } else if let Some(v) = value.get::<String>() {
        Json::String(v.clone())
    } else if let Some(v) = value.get::<Vec<i32>>() {
        v.iter().map(|&i| Json::Number(i.into())).collect()
    } else if let Some(v) = value.get::<Vec<String>>() {
        v.iter().cloned().map(Json::String).collect()
    } else if let Some(v) = value.get::<Vec<Value>>() {
        v.iter().map(|v| to_json(v, resolve, depth)).collect()
    } else if let Some(dict) = value.get::<Dict>() {
        dict_to_json(dict, resolve, depth)
    } else if let Some(resource) = value.get::<Resource>() {
        if resolve && depth < MAX_DEPTH {
            to_json(&resource.value(), resolve, depth + 1)
        } else {
            Json::String(format!("ref:{}", resource.name()))
        }
    } else if let Some(data) = value.get::<Data>() {
        Json::String(format!("<{} bytes>", data.len()))
    } else if let Some(object) = value.get::<ObjectValue>() {
        Json::String(format!("{object:?}"))
    } else {
        Json::String(format!("{value:?}"))
    }
}

fn dict_to_json(dict: &Dict, resolve: bool, depth: usize) -> Json {
    let map: Map<String, Json> = dict
        .iter()
        .map(|(name, v)| (name.to_string(), to_json(v, resolve, depth)))
        .collect();
    Json::Object(map)
}
