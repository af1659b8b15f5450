//! Minimal FITS primary-HDU codec.
//!
//! Only what spectra need: header cards plus one N-dimensional array.
//! - 2880-byte blocks
//! - 80-character keyword records, terminated by `END`
//! - big-endian data, BITPIX 8/16/32/64/-32/-64, scaled by BSCALE/BZERO

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::data::model::HeaderValue;
use crate::error::FitsError;

const BLOCK: usize = 2880;
const CARD: usize = 80;

/// Keywords describing the array layout; written by the codec itself.
const STRUCTURAL: [&str; 5] = ["SIMPLE", "BITPIX", "NAXIS", "EXTEND", "END"];

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Header keyword → value, remembering insertion order for writing.
#[derive(Debug, Clone, Default)]
pub struct FitsHeader {
    values: BTreeMap<String, HeaderValue>,
    order: Vec<String>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a keyword. Keywords are stored upper-case.
    pub fn set(&mut self, key: &str, value: HeaderValue) {
        let key = key.to_ascii_uppercase();
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.values.get(&key.to_ascii_uppercase())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            HeaderValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Cards in the order they were read or inserted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.order
            .iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.as_str(), v)))
    }

    pub fn into_map(self) -> BTreeMap<String, HeaderValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The primary header and array of a FITS file.
#[derive(Debug, Clone)]
pub struct PrimaryHdu {
    pub header: FitsHeader,
    /// Axis lengths, `NAXIS1` first (the fastest-varying axis).
    pub axes: Vec<usize>,
    /// Physical values (BSCALE/BZERO applied), in file order.
    pub data: Vec<f64>,
}

impl PrimaryHdu {
    /// The first row along `NAXIS1`; the whole array when it is 1-D.
    pub fn first_row(&self) -> &[f64] {
        match self.axes.first() {
            Some(&n) => &self.data[..n.min(self.data.len())],
            None => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read the primary HDU of a FITS file from disk.
pub fn read_fits(path: &Path) -> Result<PrimaryHdu, FitsError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read_fits_from_reader(&mut reader)
}

/// Read the primary HDU from an in-memory buffer.
pub fn read_fits_from_bytes(bytes: &[u8]) -> Result<PrimaryHdu, FitsError> {
    let mut reader = std::io::Cursor::new(bytes);
    read_fits_from_reader(&mut reader)
}

fn read_fits_from_reader<R: Read>(reader: &mut R) -> Result<PrimaryHdu, FitsError> {
    let header = read_header(reader)?;

    let bitpix = header
        .get_i64("BITPIX")
        .ok_or_else(|| FitsError::MissingKeyword("BITPIX".to_string()))?;
    let naxis = header
        .get_i64("NAXIS")
        .ok_or_else(|| FitsError::MissingKeyword("NAXIS".to_string()))?;
    if !(0..=999).contains(&naxis) {
        return Err(FitsError::InvalidFormat(format!("NAXIS = {naxis}")));
    }

    let mut axes = Vec::with_capacity(naxis as usize);
    for i in 1..=naxis {
        let key = format!("NAXIS{i}");
        let len = header
            .get_i64(&key)
            .ok_or_else(|| FitsError::MissingKeyword(key.clone()))?;
        if len < 0 {
            return Err(FitsError::InvalidFormat(format!("{key} = {len}")));
        }
        axes.push(len as usize);
    }

    let count = if axes.is_empty() {
        0
    } else {
        axes.iter()
            .try_fold(1usize, |acc, &len| acc.checked_mul(len))
            .ok_or_else(|| FitsError::InvalidFormat(format!("axes {axes:?} overflow the sample count")))?
    };

    let bscale = header.get_f64("BSCALE").unwrap_or(1.0);
    let bzero = header.get_f64("BZERO").unwrap_or(0.0);

    let raw = read_samples(reader, bitpix, count)?;
    let data = if bscale == 1.0 && bzero == 0.0 {
        raw
    } else {
        raw.into_iter().map(|v| v * bscale + bzero).collect()
    };

    Ok(PrimaryHdu { header, axes, data })
}

/// Read header cards until `END`, consuming the padding of the last block.
fn read_header<R: Read>(reader: &mut R) -> Result<FitsHeader, FitsError> {
    let mut header = FitsHeader::new();
    let mut block = [0u8; BLOCK];
    let mut first = true;

    loop {
        reader.read_exact(&mut block).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FitsError::InvalidFormat("header ends before END card".to_string())
            } else {
                FitsError::Io(e)
            }
        })?;

        for card in block.chunks_exact(CARD) {
            if !card.is_ascii() {
                return Err(FitsError::InvalidFormat("non-ASCII header card".to_string()));
            }
            let text = std::str::from_utf8(card)
                .map_err(|e| FitsError::InvalidFormat(e.to_string()))?;
            let keyword = text[..8].trim_end();

            if first {
                if keyword != "SIMPLE" {
                    return Err(FitsError::InvalidFormat(
                        "first card is not SIMPLE".to_string(),
                    ));
                }
                first = false;
            }

            if keyword == "END" {
                return Ok(header);
            }
            if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
                continue;
            }
            if &text[8..10] == "= " {
                header.set(keyword, parse_value(&text[10..]));
            }
        }
    }
}

/// Parse the value field of a card (columns 11–80).
fn parse_value(field: &str) -> HeaderValue {
    let s = field.trim_start();

    if let Some(rest) = s.strip_prefix('\'') {
        // Quoted string; '' is an escaped quote.
        let mut out = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    out.push('\'');
                    chars.next();
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        return HeaderValue::String(out.trim_end().to_string());
    }

    let value = match s.find('/') {
        Some(idx) => s[..idx].trim(),
        None => s.trim(),
    };

    match value {
        "" => HeaderValue::Null,
        "T" => HeaderValue::Bool(true),
        "F" => HeaderValue::Bool(false),
        _ => {
            if let Ok(i) = value.parse::<i64>() {
                HeaderValue::Integer(i)
            } else if let Ok(f) = value.replace(['D', 'd'], "E").parse::<f64>() {
                HeaderValue::Float(f)
            } else {
                HeaderValue::String(value.to_string())
            }
        }
    }
}

fn read_samples<R: Read>(reader: &mut R, bitpix: i64, count: usize) -> Result<Vec<f64>, FitsError> {
    let width = match bitpix {
        8 => 1,
        16 => 2,
        32 | -32 => 4,
        64 | -64 => 8,
        other => return Err(FitsError::UnsupportedBitpix(other)),
    };

    let bytes = count
        .checked_mul(width)
        .ok_or_else(|| FitsError::InvalidFormat(format!("{count} samples overflow the data size")))?;

    // Sized by what the file holds, not by what the header claims.
    let mut buffer = Vec::new();
    reader.by_ref().take(bytes as u64).read_to_end(&mut buffer)?;
    if buffer.len() < bytes {
        return Err(FitsError::InvalidFormat(format!(
            "data truncated, expected {count} samples"
        )));
    }

    let data = match bitpix {
        8 => buffer.iter().map(|&b| b as f64).collect(),
        16 => buffer
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]) as f64)
            .collect(),
        32 => buffer
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        64 => buffer
            .chunks_exact(8)
            .map(|c| i64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f64)
            .collect(),
        -32 => buffer
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        _ => buffer
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
    };
    Ok(data)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write a primary HDU holding `data` as 64-bit floats (`BITPIX = -64`).
///
/// `axes` lists the axis lengths with `NAXIS1` first; their product must
/// equal `data.len()`.
pub fn write_fits(path: &Path, header: &FitsHeader, axes: &[usize], data: &[f64]) -> Result<(), FitsError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_fits_to(&mut writer, header, axes, data)?;
    writer.flush()?;
    Ok(())
}

/// Encode a primary HDU into any writer.
pub fn write_fits_to<W: Write>(
    writer: &mut W,
    header: &FitsHeader,
    axes: &[usize],
    data: &[f64],
) -> Result<(), FitsError> {
    let expected: usize = if axes.is_empty() { 0 } else { axes.iter().product() };
    if expected != data.len() {
        return Err(FitsError::InvalidFormat(format!(
            "axes describe {expected} samples but {} were given",
            data.len()
        )));
    }

    let mut cards: Vec<[u8; CARD]> = vec![
        card("SIMPLE", &HeaderValue::Bool(true)),
        card("BITPIX", &HeaderValue::Integer(-64)),
        card("NAXIS", &HeaderValue::Integer(axes.len() as i64)),
    ];
    for (i, len) in axes.iter().enumerate() {
        cards.push(card(&format!("NAXIS{}", i + 1), &HeaderValue::Integer(*len as i64)));
    }
    for (key, value) in header.iter() {
        let structural = STRUCTURAL.contains(&key)
            || key.starts_with("NAXIS")
            || key == "BSCALE"
            || key == "BZERO";
        if !structural {
            cards.push(card(key, value));
        }
    }
    let mut end = [b' '; CARD];
    end[..3].copy_from_slice(b"END");
    cards.push(end);

    for c in &cards {
        writer.write_all(c)?;
    }
    pad(writer, cards.len() * CARD, b' ')?;

    for v in data {
        writer.write_all(&v.to_be_bytes())?;
    }
    pad(writer, data.len() * 8, 0)?;
    Ok(())
}

fn pad<W: Write>(writer: &mut W, written: usize, fill: u8) -> Result<(), FitsError> {
    let padding = (BLOCK - written % BLOCK) % BLOCK;
    writer.write_all(&vec![fill; padding])?;
    Ok(())
}

/// Format one 80-byte keyword record.
fn card(keyword: &str, value: &HeaderValue) -> [u8; CARD] {
    let mut record = [b' '; CARD];
    let key = keyword.as_bytes();
    let key_len = key.len().min(8);
    record[..key_len].copy_from_slice(&key[..key_len]);

    let text = match value {
        HeaderValue::String(s) => format!("'{:<8}'", s.replace('\'', "''")),
        HeaderValue::Integer(i) => format!("{i:>20}"),
        HeaderValue::Float(f) => format!("{:>20}", format!("{f:E}")),
        HeaderValue::Bool(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        HeaderValue::Null => String::new(),
    };

    record[8] = b'=';
    record[9] = b' ';
    let bytes = text.as_bytes();
    let len = bytes.len().min(CARD - 10);
    record[10..10 + len].copy_from_slice(&bytes[..len]);
    record
}
