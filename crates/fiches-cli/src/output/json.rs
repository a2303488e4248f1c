use fiches_core::model::ProjectRecord;

use crate::error::CliError;

pub fn print(records: &[ProjectRecord]) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(records)?;
    println!("{json}");
    Ok(())
}
