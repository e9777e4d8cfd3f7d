use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use crate::error::Error;
use crate::state::StateArray;
use crate::system::Parameters;




/// Coordinates of the output cube.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dims {
    /// Cell centers.
    pub xdim: Vec<f64>,
    /// Times the run will actually dump at, one per step at most.
    pub tdim: Vec<f64>,
}




/**
 * Written once, before any snapshot: the coordinates, the system
 * parameters, and the shape `[dumps, cells, unknowns]` of the data. The
 * dump count is that of a complete run; a run stopped at its trace step
 * writes fewer.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DumpHeader {
    pub dims: Dims,
    pub parameters: Parameters,
    pub shape: [usize; 3],
}




#[derive(Serialize, Deserialize)]
struct Record {
    index: usize,
    time: f64,
    q: Vec<f64>,
}




/**
 * Sink for solution snapshots. Only the coordinator of a run ever sees a
 * dumper call; every snapshot holds the owned cells of the whole grid.
 */
pub trait Dumper: Send {

    /// Prepare the output. Called once per run, before the first snapshot.
    fn init_dump(&mut self, header: &DumpHeader) -> Result<(), Error>;

    /// Append one snapshot.
    fn dump(&mut self, time: f64, q: &StateArray) -> Result<(), Error>;

    /// Flush and close the output at the end of the run.
    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}




// ============================================================================
/**
 * Everything a dumper was given, held in memory.
 */
#[derive(Clone, Debug, Default)]
pub struct Output {
    pub header: Option<DumpHeader>,
    pub times: Vec<f64>,
    pub snapshots: Vec<StateArray>,
}

impl Output {
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Value of unknown `k` in cell `i` of snapshot `n`.
    pub fn value(&self, n: usize, i: usize, k: usize) -> f64 {
        self.snapshots[n].row(i)[k]
    }
}




/**
 * Keeps snapshots in memory. Clones share the same storage, so a caller can
 * keep one clone for inspection and hand another to the solver.
 */
#[derive(Clone, Default)]
pub struct MemoryDumper {
    output: Arc<Mutex<Output>>,
}

impl MemoryDumper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of everything dumped so far.
    pub fn output(&self) -> Output {
        match self.output.lock() {
            Ok(output) => output.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn with_output<F>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Output),
    {
        let mut output = self
            .output
            .lock()
            .map_err(|_| Error::DumpFormat("memory output lock poisoned".into()))?;
        f(&mut output);
        Ok(())
    }
}

impl Dumper for MemoryDumper {

    fn init_dump(&mut self, header: &DumpHeader) -> Result<(), Error> {
        self.with_output(|output| {
            *output = Output {
                header: Some(header.clone()),
                ..Output::default()
            }
        })
    }

    fn dump(&mut self, time: f64, q: &StateArray) -> Result<(), Error> {
        self.with_output(|output| {
            output.times.push(time);
            output.snapshots.push(q.clone());
        })
    }
}




// ============================================================================
fn write_error(e: ciborium::ser::Error<std::io::Error>) -> Error {
    match e {
        ciborium::ser::Error::Io(e) => Error::DumpIo(e),
        e => Error::DumpFormat(format!("{:?}", e)),
    }
}

fn read_error(e: ciborium::de::Error<std::io::Error>) -> Error {
    match e {
        ciborium::de::Error::Io(e) => Error::DumpIo(e),
        e => Error::DumpFormat(format!("{:?}", e)),
    }
}




/**
 * Writes snapshots to a file as a CBOR sequence: the header, then one record
 * per snapshot. The file is flushed after every record, so a run that stops
 * early leaves a readable prefix.
 */
pub struct CborDumper {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    count: usize,
}

impl CborDumper {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
            count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Dumper for CborDumper {

    fn init_dump(&mut self, header: &DumpHeader) -> Result<(), Error> {
        let file = File::create(&self.path).map_err(Error::DumpIo)?;
        let mut writer = BufWriter::new(file);

        ciborium::ser::into_writer(header, &mut writer).map_err(write_error)?;
        writer.flush().map_err(Error::DumpIo)?;

        info!("writing output to {}", self.path.display());
        self.writer = Some(writer);
        self.count = 0;
        Ok(())
    }

    fn dump(&mut self, time: f64, q: &StateArray) -> Result<(), Error> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::DumpFormat("dump before init_dump".into()))?;

        let record = Record {
            index: self.count,
            time,
            q: q.as_slice().to_vec(),
        };
        ciborium::ser::into_writer(&record, &mut *writer).map_err(write_error)?;
        writer.flush().map_err(Error::DumpIo)?;

        debug!("wrote snapshot {} (t={}) to {}", self.count, time, self.path.display());
        self.count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(Error::DumpIo)?;
        }
        Ok(())
    }
}




/**
 * Read back a file written by `CborDumper`.
 */
pub fn read_output<P: AsRef<Path>>(path: P) -> Result<Output, Error> {
    let file = File::open(path.as_ref()).map_err(Error::DumpIo)?;
    let mut reader = BufReader::new(file);
    let header: DumpHeader = ciborium::de::from_reader(&mut reader).map_err(read_error)?;
    let [_, num_cells, num_unknowns] = header.shape;
    let mut output = Output::default();

    while !reader.fill_buf().map_err(Error::DumpIo)?.is_empty() {
        let record: Record = ciborium::de::from_reader(&mut reader).map_err(read_error)?;

        if record.index != output.snapshots.len() {
            return Err(Error::DumpFormat(format!(
                "snapshot {} found where {} was expected",
                record.index,
                output.snapshots.len()
            )));
        }
        output.times.push(record.time);
        output.snapshots.push(StateArray::from_vec(num_cells, num_unknowns, record.q).map_err(|e| Error::DumpFormat(e.to_string()))?);
    }
    output.header = Some(header);
    Ok(output)
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::system::Parameter;

    fn header() -> DumpHeader {
        let mut parameters = Parameters::new();
        parameters.insert("speed".into(), Parameter::Real(1.5));
        DumpHeader {
            dims: Dims {
                xdim: vec![0.25, 0.75],
                tdim: vec![0.0, 1.0],
            },
            parameters,
            shape: [2, 2, 1],
        }
    }

    #[test]
    fn memory_dumper_shares_its_storage() {
        let recorder = MemoryDumper::new();
        let mut dumper = recorder.clone();
        dumper.init_dump(&header()).unwrap();
        dumper.dump(0.0, &StateArray::from_vec(2, 1, vec![1.0, 2.0]).unwrap()).unwrap();

        let output = recorder.output();
        assert_eq!(output.len(), 1);
        assert_eq!(output.value(0, 1, 0), 2.0);
        assert_eq!(output.header, Some(header()));
    }

    #[test]
    fn cbor_output_can_be_read_back() {
        let path = std::env::temp_dir().join(format!("blaw-dump-test-{}.cbor", std::process::id()));
        let mut dumper = CborDumper::new(&path);
        dumper.init_dump(&header()).unwrap();
        dumper.dump(0.0, &StateArray::from_vec(2, 1, vec![1.0, 2.0]).unwrap()).unwrap();
        dumper.dump(1.0, &StateArray::from_vec(2, 1, vec![0.1, 0.3]).unwrap()).unwrap();
        dumper.finish().unwrap();

        let output = read_output(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(output.header, Some(header()));
        assert_eq!(output.times, vec![0.0, 1.0]);
        assert_eq!(output.snapshots[1].as_slice(), &[0.1, 0.3]);
    }

    #[test]
    fn dump_before_init_is_an_error() {
        let mut dumper = CborDumper::new("never-created.cbor");
        assert!(dumper.dump(0.0, &StateArray::zeros(1, 1)).is_err());
    }
}
