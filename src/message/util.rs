use std::io::{self, prelude::*};

/// Read a usize out of the given stream.
///
pub fn read_usize<R: Read>(stream: &mut R) -> io::Result<usize> {
    let mut buffer = [0; 8];
    stream.read_exact(&mut buffer)?;
    Ok(u64::from_le_bytes(buffer) as usize)
}

/// Write a usize to the given stream, as eight little-endian bytes.
///
pub fn write_usize<W: Write>(stream: &mut W, value: usize) -> io::Result<()> {
    stream.write_all(&(value as u64).to_le_bytes())
}

/// Write one length-prefixed frame.
///
pub fn write_frame<W: Write>(stream: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_usize(stream, bytes.len())?;
    stream.write_all(bytes)?;
    stream.flush()
}

/// Read one length-prefixed frame. Returns `None` if the stream ended
/// cleanly before the frame started.
///
pub fn read_frame<R: Read>(stream: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut header = [0; 8];
    let mut cursor = 0;

    while cursor < header.len() {
        match stream.read(&mut header[cursor..]) {
            Ok(0) if cursor == 0 => return Ok(None),
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => cursor += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    let size = u64::from_le_bytes(header) as usize;
    let mut buffer = vec![0; size];
    stream.read_exact(&mut buffer)?;
    Ok(Some(buffer))
}
