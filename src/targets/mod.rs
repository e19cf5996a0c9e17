//! Pathway target variables

pub mod pathways;

pub use pathways::{
    PathwayTarget, PathwayTargetCreator, StandardizeParams, TargetProvenance, create_target,
};
