pub mod extract;
pub mod profiles;
pub mod run;

use fiches_core::error::FichesError;
use fiches_core::profiles::Profile;
use std::path::Path;

/// A custom profile file when given, the named preset otherwise.
pub fn resolve_profile(preset: &str, file: Option<&Path>) -> Result<Profile, FichesError> {
    match file {
        Some(path) => Profile::from_file(path),
        None => Profile::preset(preset),
    }
}
