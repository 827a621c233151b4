//! Orion: versioned CAD assemblies
//!
//! Imports a hierarchical 3D assembly, stores every geometrically distinct
//! part once in a content-addressed inventory, gives parts and assemblies
//! stable names across revisions and lays the result out as plain files
//! under git version control.

pub mod cli;
pub mod core;
pub mod yaml;
