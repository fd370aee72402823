use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("could not determine next available VM identifier: {0}")]
    Discovery(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("KDL parse error: {0}")]
    Parse(#[from] kdl::KdlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "no VM definition file found\nsearch started at: {}\nhint: create vms.kdl or point VMFLOW_FILE at one",
        .0.display()
    )]
    DefinitionNotFound(PathBuf),

    #[error("vm '{0}' has no os template (set os on the vm or in a defaults block)")]
    MissingOs(String),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
