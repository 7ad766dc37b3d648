//! Condensed BioLogic MPR module reader.
//!
//! An MPR file is a fixed magic line followed by a sequence of modules,
//! each carrying a short name, a version, a date stamp, and a
//! length-prefixed payload. The data module ("VMP data") declares its
//! column ids up front; each id fixes a column name and cell width, so
//! rows decode as a flat little-endian record stream.

use anyhow::{Context, bail, ensure};

/// Magic prefix of every MPR file.
const FILE_MAGIC: &[u8] = b"BIO-LOGIC MODULES FILE\x1a";
/// The magic-line block is padded to this size.
const FILE_HEADER_LEN: usize = 48;
/// Marker opening every module.
const MODULE_MAGIC: &[u8] = b"MODULE";

const SHORT_NAME_LEN: usize = 10;
const LONG_NAME_LEN: usize = 25;
const DATE_LEN: usize = 8;

/// Short name of the module holding the sample table.
const DATA_MODULE: &str = "VMP data";

/// Cell encoding of a data column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    U1,
    U2,
    F4,
    F8,
}

impl ColumnType {
    fn width(self) -> usize {
        match self {
            Self::U1 => 1,
            Self::U2 => 2,
            Self::F4 => 4,
            Self::F8 => 8,
        }
    }
}

/// Column name and encoding for a known column id.
fn column_spec(id: u16) -> Option<(&'static str, ColumnType)> {
    match id {
        1 => Some(("mode", ColumnType::U1)),
        2 => Some(("ox/red", ColumnType::U1)),
        3 => Some(("error", ColumnType::U1)),
        4 => Some(("time/s", ColumnType::F8)),
        5 => Some(("control/V/mA", ColumnType::F4)),
        6 => Some(("Ewe/V", ColumnType::F4)),
        7 => Some(("dQ/mA.h", ColumnType::F8)),
        8 => Some(("I/mA", ColumnType::F4)),
        9 => Some(("Ece/V", ColumnType::F4)),
        11 => Some(("I/mA", ColumnType::F8)),
        13 => Some(("(Q-Qo)/mA.h", ColumnType::F8)),
        19 => Some(("control/V", ColumnType::F4)),
        20 => Some(("control/mA", ColumnType::F4)),
        23 => Some(("dQ/mA.h", ColumnType::F8)),
        24 => Some(("cycle number", ColumnType::F8)),
        32 => Some(("freq/Hz", ColumnType::F4)),
        33 => Some(("|Ewe|/V", ColumnType::F4)),
        34 => Some(("|I|/A", ColumnType::F4)),
        35 => Some(("Phase(Z)/deg", ColumnType::F4)),
        36 => Some(("|Z|/Ohm", ColumnType::F4)),
        37 => Some(("Re(Z)/Ohm", ColumnType::F4)),
        38 => Some(("-Im(Z)/Ohm", ColumnType::F4)),
        70 => Some(("I Range", ColumnType::U2)),
        _ => None,
    }
}

/// Decoded MPR data module.
#[derive(Debug, Clone)]
pub struct MprFile {
    /// Data-module format version.
    pub version: u32,
    /// Module date stamp (`MM/DD/YY`).
    pub date: String,
    /// Column names in file order.
    pub columns: Vec<String>,
    /// Decoded sample rows.
    pub rows: Vec<Vec<f64>>,
}

/// Byte cursor with bounds-checked little-endian reads.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> anyhow::Result<&'a [u8]> {
        let end = self.pos.checked_add(n).context("offset overflow")?;
        let slice = self
            .buf
            .get(self.pos..end)
            .with_context(|| format!("truncated file at offset {}", self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> anyhow::Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> anyhow::Result<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn read_u32(&mut self) -> anyhow::Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_f32(&mut self) -> anyhow::Result<f32> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_f64(&mut self) -> anyhow::Result<f64> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

/// Parse an MPR byte stream into its data module.
pub fn parse(bytes: &[u8]) -> anyhow::Result<MprFile> {
    ensure!(bytes.starts_with(FILE_MAGIC), "not a BioLogic MPR file");
    ensure!(bytes.len() >= FILE_HEADER_LEN, "truncated MPR header");

    let mut cursor = Cursor::new(&bytes[FILE_HEADER_LEN..]);

    while !cursor.is_at_end() {
        let magic = cursor.take(MODULE_MAGIC.len())?;
        ensure!(magic == MODULE_MAGIC, "corrupt module header");

        let short_name = ascii_field(cursor.take(SHORT_NAME_LEN)?);
        let _long_name = ascii_field(cursor.take(LONG_NAME_LEN)?);
        let length = cursor.read_u32()? as usize;
        let version = cursor.read_u32()?;
        let date = ascii_field(cursor.take(DATE_LEN)?);
        let payload = cursor.take(length)?;

        if short_name == DATA_MODULE {
            let (columns, rows) = parse_data_payload(payload)?;
            return Ok(MprFile {
                version,
                date,
                columns,
                rows,
            });
        }
    }

    bail!("no data module in MPR file");
}

/// Decode the data-module payload: point count, column ids, then the
/// row-major record stream.
fn parse_data_payload(payload: &[u8]) -> anyhow::Result<(Vec<String>, Vec<Vec<f64>>)> {
    let mut cursor = Cursor::new(payload);

    let n_points = cursor.read_u32()? as usize;
    let n_columns = cursor.read_u8()? as usize;
    ensure!(n_columns > 0, "data module declares no columns");

    let mut specs = Vec::with_capacity(n_columns);
    for _ in 0..n_columns {
        let id = cursor.read_u16()?;
        let spec = column_spec(id).with_context(|| format!("unknown column id {id}"))?;
        specs.push(spec);
    }

    let columns = specs.iter().map(|(name, _)| name.to_string()).collect();

    let mut rows = Vec::with_capacity(n_points);
    for _ in 0..n_points {
        let mut row = Vec::with_capacity(n_columns);
        for (_, ty) in &specs {
            let value = match ty {
                ColumnType::U1 => f64::from(cursor.read_u8()?),
                ColumnType::U2 => f64::from(cursor.read_u16()?),
                ColumnType::F4 => f64::from(cursor.read_f32()?),
                ColumnType::F8 => cursor.read_f64()?,
            };
            row.push(value);
        }
        rows.push(row);
    }

    Ok((columns, rows))
}

/// Space-padded ASCII field to trimmed string.
fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}
