mod manager;
mod manifest;
mod source;

pub use manager::{resolve_fragment, LoadTicket, LoadedExercise, ProgramBackend, ShaderExerciseManager, FULLSCREEN_VERTEX};
pub use manifest::{parse_manifest, Exercise, SelectOption, ShaderInjection, UniformDef, UniformDefs, UniformKind};
pub use source::{build_url, HttpFetcher, TextSource};

const MANIFEST: &str = include_str!("../../exercises/manifest.json");

/// The exercises shipped with the crate, in manifest order.
pub fn builtin_exercises() -> crate::error::LabResult<Vec<Exercise>> {
    Ok(parse_manifest(MANIFEST)?)
}
