use crate::interfaces::api::CompetitorRecord;
use anyhow::Context;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

/// Catalog holds the motorcycle records served by the local data provider.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Catalog {
    pub racers: Vec<CompetitorRecord>,
}

/// read_catalog reads the JSON file and decodes the JSON string into the catalog struct.
pub fn read_catalog(filepath: &Path) -> anyhow::Result<Catalog> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open catalog file {}!",
            filepath.display()
        ))?;
    let catalog: Catalog = serde_json::from_reader(&fh).context(format!(
        "Failed to parse catalog file {}!",
        filepath.display()
    ))?;

    let mut ids: Vec<u64> = catalog.racers.iter().map(|r| r.id).collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.len() != catalog.racers.len() {
        anyhow::bail!("Catalog file {} contains duplicate racer ids!", filepath.display());
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::api::WeightType;
    use std::io::Write;

    fn write_tmp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}_{}.json", name, std::process::id()));
        let mut fh = std::fs::File::create(&path).unwrap();
        fh.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_catalog() {
        let path = write_tmp(
            "bikerace_catalog",
            r#"{"racers": [
                {"id": 1, "full_name": "Yamaha MT-07", "make": "Yamaha", "model": "MT-07",
                 "power": 73.4, "torque": 67, "weight": 184, "weight_type": "wet",
                 "style": "naked", "year": "2021"},
                {"id": 2, "full_name": "Honda Fireblade", "make": "Honda", "model": "Fireblade",
                 "power": 214, "torque": 113, "weight": 181, "weight_type": "dry"}
            ]}"#,
        );
        let catalog = read_catalog(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(catalog.racers.len(), 2);
        assert_eq!(catalog.racers[0].year.as_deref(), Some("2021"));
        assert_eq!(catalog.racers[1].weight_type, WeightType::Dry);
        assert_eq!(catalog.racers[1].style, "");
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let path = write_tmp(
            "bikerace_catalog_dup",
            r#"{"racers": [
                {"id": 1, "full_name": "A A", "make": "A", "model": "A", "power": 1, "torque": 1, "weight": 1},
                {"id": 1, "full_name": "B B", "make": "B", "model": "B", "power": 1, "torque": 1, "weight": 1}
            ]}"#,
        );
        let res = read_catalog(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(res.is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = read_catalog(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to open catalog file"));
    }
}
