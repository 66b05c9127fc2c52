//! Seed document parsing.
//!
//! `dealers.json` is a bare array of dealers; `cars.json` wraps its array in
//! `{"cars": [...]}`. Any `id` or `dealer_id` carried by the documents is ignored:
//! the store assigns ids and the importer assigns dealers.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use dealership_core::DealerId;
use dealership_inventory::{CarInput, DealerInput};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct CarsDocument {
    cars: Vec<CarInput>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub fn load_dealers(path: impl AsRef<Path>) -> Result<Vec<DealerInput>, LoadError> {
    read_json(path.as_ref())
}

pub fn load_cars(path: impl AsRef<Path>) -> Result<Vec<CarInput>, LoadError> {
    let doc: CarsDocument = read_json(path.as_ref())?;
    Ok(doc
        .cars
        .into_iter()
        .map(|car| CarInput {
            dealer_id: DealerId::new(0),
            ..car
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn dealers_are_a_bare_array() {
        let file = file_with(
            r#"[
                {"id": 17, "name": "Major", "city": "Moscow", "address": "MKAD 47", "area": "South", "rating": 4.5},
                {"name": "Rolf", "city": "Moscow", "address": "Altufyevo 31", "area": "North", "rating": 3}
            ]"#,
        );
        let dealers = load_dealers(file.path()).unwrap();
        assert_eq!(dealers.len(), 2);
        assert_eq!(dealers[0].name, "Major");
        assert_eq!(dealers[1].rating, Some(3.0));
    }

    #[test]
    fn cars_are_wrapped_and_lose_their_dealer() {
        let file = file_with(
            r#"{"cars": [
                {"id": 3, "firm": "BMW", "model": "X5", "year": 2019, "power": 340, "color": "black", "price": 5000000, "dealer_id": 8},
                {"firm": "Skoda", "model": "Octavia", "year": 2017, "power": 150, "price": 1300000}
            ]}"#,
        );
        let cars = load_cars(file.path()).unwrap();
        assert_eq!(cars.len(), 2);
        assert!(cars.iter().all(|c| c.dealer_id == DealerId::new(0)));
        assert_eq!(cars[0].color.as_deref(), Some("black"));
        assert_eq!(cars[1].color, None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_dealers("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn cars_without_wrapper_is_parse_error() {
        let file = file_with(r#"[{"firm": "BMW"}]"#);
        assert!(matches!(load_cars(file.path()).unwrap_err(), LoadError::Parse(_)));
    }
}
