use crate::error::FichesError;
use crate::profiles::schema::ProfileDef;

const BENIMALLAL_JSON: &str = include_str!("../../../../profiles/benimallal.json");
const FESMEKNES_JSON: &str = include_str!("../../../../profiles/fesmeknes.json");

/// Available predefined profiles.
pub const PRESETS: &[&str] = &["benimallal", "fesmeknes"];

/// Load a predefined profile by name.
pub fn load_preset(name: &str) -> Result<ProfileDef, FichesError> {
    let json = match name {
        "benimallal" => BENIMALLAL_JSON,
        "fesmeknes" => FESMEKNES_JSON,
        _ => {
            return Err(FichesError::ProfileInvalid(format!(
                "unknown preset '{}'. Available: {}",
                name,
                PRESETS.join(", ")
            )))
        }
    };
    Ok(serde_json::from_str(json)?)
}
