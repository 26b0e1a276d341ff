//! Minimal ZIP writer for OOXML packages: deflated or stored entries, no
//! ZIP64, no encryption.

use crate::error::{ExportError, Result};

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

const VERSION: u16 = 20;
/// General purpose flag: names are UTF-8
const FLAG_UTF8: u16 = 0x0800;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;
/// 1980-01-01 00:00, the earliest DOS timestamp
const DOS_TIME: u16 = 0;
const DOS_DATE: u16 = 33;

const DEFLATE_LEVEL: u8 = 6;

struct CentralEntry {
    name: String,
    method: u16,
    crc: u32,
    compressed_size: u32,
    size: u32,
    offset: u32,
}

#[derive(Default)]
pub struct ZipWriter {
    out: Vec<u8>,
    entries: Vec<CentralEntry>,
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn fits_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| ExportError::EncodingFailed(format!("{} exceeds 4 GiB", what)))
}

fn fits_u16(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| ExportError::EncodingFailed(format!("too many {}", what)))
}

impl ZipWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file; deflated unless deflating does not shrink it
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let crc = crc32fast::hash(data);
        let deflated = miniz_oxide::deflate::compress_to_vec(data, DEFLATE_LEVEL);
        let (method, body) = if deflated.len() < data.len() {
            (METHOD_DEFLATED, deflated.as_slice())
        } else {
            (METHOD_STORED, data)
        };

        let entry = CentralEntry {
            name: name.to_string(),
            method,
            crc,
            compressed_size: fits_u32(body.len(), name)?,
            size: fits_u32(data.len(), name)?,
            offset: fits_u32(self.out.len(), "archive")?,
        };
        let name_len = fits_u16(name.len(), "bytes in entry name")?;

        let out = &mut self.out;
        put_u32(out, LOCAL_HEADER_SIGNATURE);
        put_u16(out, VERSION);
        put_u16(out, FLAG_UTF8);
        put_u16(out, entry.method);
        put_u16(out, DOS_TIME);
        put_u16(out, DOS_DATE);
        put_u32(out, entry.crc);
        put_u32(out, entry.compressed_size);
        put_u32(out, entry.size);
        put_u16(out, name_len);
        put_u16(out, 0);
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(body);

        self.entries.push(entry);
        Ok(())
    }

    /// Write the central directory and return the archive bytes
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let directory_offset = fits_u32(self.out.len(), "archive")?;
        let count = fits_u16(self.entries.len(), "entries")?;

        for entry in &self.entries {
            let out = &mut self.out;
            put_u32(out, CENTRAL_HEADER_SIGNATURE);
            put_u16(out, VERSION);
            put_u16(out, VERSION);
            put_u16(out, FLAG_UTF8);
            put_u16(out, entry.method);
            put_u16(out, DOS_TIME);
            put_u16(out, DOS_DATE);
            put_u32(out, entry.crc);
            put_u32(out, entry.compressed_size);
            put_u32(out, entry.size);
            put_u16(out, fits_u16(entry.name.len(), "bytes in entry name")?);
            put_u16(out, 0); // extra
            put_u16(out, 0); // comment
            put_u16(out, 0); // disk
            put_u16(out, 0); // internal attributes
            put_u32(out, 0); // external attributes
            put_u32(out, entry.offset);
            out.extend_from_slice(entry.name.as_bytes());
        }

        let directory_size = fits_u32(self.out.len() - directory_offset as usize, "central directory")?;
        let out = &mut self.out;
        put_u32(out, END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        put_u16(out, 0);
        put_u16(out, 0);
        put_u16(out, count);
        put_u16(out, count);
        put_u32(out, directory_size);
        put_u32(out, directory_offset);
        put_u16(out, 0);

        Ok(self.out)
    }
}
