//! Scenario documents on disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::scenario::{Scenario, ScenarioError};

/// Saves a scenario as pretty-printed JSON.
pub fn save_scenario(scenario: &Scenario, path: &Path) -> Result<(), ScenarioError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(scenario.to_json()?.as_bytes())?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Loads and validates a scenario document.
pub fn load_scenario(path: &Path) -> Result<Scenario, ScenarioError> {
    let text = std::fs::read_to_string(path)?;
    Scenario::from_json(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ValidationError;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load_is_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        let scenario = Scenario::soil_regeneration().unwrap();

        save_scenario(&scenario, &path).unwrap();
        let loaded = load_scenario(&path).unwrap();

        assert_eq!(loaded, scenario);
        assert_eq!(loaded.fingerprint().unwrap(), scenario.fingerprint().unwrap());
    }

    #[test]
    fn test_load_rejects_invalid_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mut params = Scenario::wood_harvest().unwrap().into_params();
        params.plates.end_use.compost = 0.5;
        std::fs::write(&path, serde_json::to_string(&params).unwrap()).unwrap();

        assert!(matches!(
            load_scenario(&path),
            Err(ScenarioError::Validation(ValidationError::ProportionSum { .. }))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_scenario(&dir.path().join("absent.json")),
            Err(ScenarioError::Io(_))
        ));
    }
}
