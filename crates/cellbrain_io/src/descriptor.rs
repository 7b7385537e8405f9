//! Loading descriptors and the models built from them.

use std::path::Path;

use cellbrain_core::Model;
use cellbrain_data::CellularAutomatonDescriptor;

use crate::error::Result;
use crate::serialization::{from_json, read_json_file, write_json_file};

pub fn load_descriptor<P: AsRef<Path>>(path: P) -> Result<CellularAutomatonDescriptor> {
    read_json_file(path)
}

pub fn save_descriptor<P: AsRef<Path>>(descriptor: &CellularAutomatonDescriptor, path: P) -> Result<()> {
    write_json_file(descriptor, path)
}

/// Parses a descriptor and builds its model.
pub fn model_from_json(json: &str) -> Result<Model> {
    let descriptor: CellularAutomatonDescriptor = from_json(json)?;
    Ok(Model::build(&descriptor)?)
}

/// Reads a descriptor file and builds its model.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    let path = path.as_ref();
    let descriptor = load_descriptor(path)?;
    Model::build(&descriptor)
        .map_err(|e| crate::IoError::from(e).with_context(format!("building {}", path.display())))
}
