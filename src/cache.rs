use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use log::info;
use serde::{Deserialize, Serialize};
use crate::error::Error;
use crate::grid::Grid;
use crate::reconstruct::Operators;




/// Bumped whenever the bundle layout changes.
pub const CACHE_VERSION: u32 = 1;




/**
 * The expensive, grid-dependent setup of a run: the grid and the
 * reconstruction operators built for it at a given order.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheBundle {
    pub version: u32,
    pub order: usize,
    pub grid: Grid,
    pub operators: Option<Operators>,
}




fn write_error(e: ciborium::ser::Error<io::Error>) -> Error {
    match e {
        ciborium::ser::Error::Io(e) => Error::CacheIo(e),
        e => Error::CacheFormat(format!("{:?}", e)),
    }
}

fn read_error(e: ciborium::de::Error<io::Error>) -> Error {
    match e {
        ciborium::de::Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Error::CacheFormat(format!("truncated cache file: {}", e))
        }
        ciborium::de::Error::Io(e) => Error::CacheIo(e),
        e => Error::CacheFormat(format!("{:?}", e)),
    }
}




fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.tmp", std::process::id()));
    PathBuf::from(name)
}

fn write_bundle(path: &Path, bundle: &CacheBundle) -> Result<(), Error> {
    let file = File::create(path).map_err(Error::CacheIo)?;
    let mut writer = BufWriter::new(file);
    ciborium::ser::into_writer(bundle, &mut writer).map_err(write_error)?;
    writer.flush().map_err(Error::CacheIo)?;
    writer.get_ref().sync_all().map_err(Error::CacheIo)
}




/**
 * Write a bundle to the given path, replacing any file there. The bundle is
 * written to a sibling file and renamed into place, so a concurrent reader
 * sees either the old cache or the complete new one.
 */
pub fn store(path: &Path, bundle: &CacheBundle) -> Result<(), Error> {
    let staging = staging_path(path);

    let result = write_bundle(&staging, bundle)
        .and_then(|_| std::fs::rename(&staging, path).map_err(Error::CacheIo));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&staging);
        return Err(e);
    }
    info!("stored cache for {} cells (order {}) in {}", bundle.grid.len(), bundle.order, path.display());
    Ok(())
}




/**
 * Read a bundle from the given path. Returns `Ok(None)` if there is no file
 * at that path.
 */
pub fn load(path: &Path) -> Result<Option<CacheBundle>, Error> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::CacheIo(e)),
    };
    let bundle: CacheBundle = ciborium::de::from_reader(BufReader::new(file)).map_err(read_error)?;

    if bundle.version != CACHE_VERSION {
        return Err(Error::CacheMismatch(format!(
            "cache format version {} (expected {})",
            bundle.version, CACHE_VERSION
        )));
    }
    Ok(Some(bundle))
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::reconstruct::{Polynomial, Reconstructor};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("blaw-cache-{}-{}.cbor", name, std::process::id()))
    }

    #[test]
    fn missing_file_loads_as_none() {
        assert!(load(&temp_path("missing")).unwrap().is_none());
    }

    #[test]
    fn bundle_round_trips_bit_for_bit() {
        let grid = Grid::new(vec![0.0, 0.1, 0.3, 0.35, 0.6, 1.0]).unwrap();
        let operators = Polynomial::new(3).unwrap().precompute(&grid).unwrap();
        let bundle = CacheBundle {
            version: CACHE_VERSION,
            order: 3,
            grid,
            operators,
        };
        let path = temp_path("round-trip");
        store(&path, &bundle).unwrap();
        let loaded = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, Some(bundle));
    }

    #[test]
    fn garbage_is_a_format_error() {
        let path = temp_path("garbage");
        std::fs::write(&path, b"\xff\x00not cbor").unwrap();
        let result = load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::CacheFormat(_)) | Err(Error::CacheIo(_))));
    }

    #[test]
    fn empty_and_truncated_files_are_format_errors() {
        let grid = Grid::uniform(0.0, 1.0, 8).unwrap();
        let bundle = CacheBundle {
            version: CACHE_VERSION,
            order: 1,
            grid,
            operators: None,
        };
        let path = temp_path("truncated");
        store(&path, &bundle).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(load(&path), Err(Error::CacheFormat(_))));

        std::fs::write(&path, b"").unwrap();
        assert!(matches!(load(&path), Err(Error::CacheFormat(_))));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn store_leaves_no_staging_file_behind() {
        let bundle = CacheBundle {
            version: CACHE_VERSION,
            order: 1,
            grid: Grid::uniform(0.0, 1.0, 4).unwrap(),
            operators: None,
        };
        let path = temp_path("staged");
        store(&path, &bundle).unwrap();
        store(&path, &bundle).unwrap();

        assert!(!staging_path(&path).exists());
        assert_eq!(load(&path).unwrap(), Some(bundle));
        std::fs::remove_file(&path).unwrap();
    }
}
