use log::{debug, warn};
use pcedit_core::{FieldType, PointBuffer, PointCloudHeader};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::{lzf, PcdError};

/// Payload encoding named on the `DATA` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEncoding {
    Ascii,
    Binary,
    BinaryCompressed,
}

impl DataEncoding {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "ascii" => Some(Self::Ascii),
            "binary" => Some(Self::Binary),
            "binary_compressed" => Some(Self::BinaryCompressed),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Binary => "binary",
            Self::BinaryCompressed => "binary_compressed",
        }
    }
}

/// Reads a PCD file (ascii, binary or binary_compressed).
pub fn read_pcd(path: impl AsRef<Path>) -> Result<PointBuffer, PcdError> {
    let file = File::open(path)?;
    read_pcd_from(BufReader::new(file))
}

/// Reads a PCD stream. The reader is left just past the payload.
pub fn read_pcd_from<R: BufRead>(mut reader: R) -> Result<PointBuffer, PcdError> {
    let (header, num_points, encoding) = read_header(&mut reader)?;

    let data = match encoding {
        DataEncoding::Ascii => read_ascii(&mut reader, &header, num_points)?,
        DataEncoding::Binary => read_binary(&mut reader, &header, num_points)?,
        DataEncoding::BinaryCompressed => {
            read_compressed(&mut reader, &header, num_points)?
        }
    };

    let cloud = PointBuffer::from_bytes(header, num_points, data)?;
    debug!(
        "read PCD: {} points, {} fields, {} encoding",
        cloud.len(),
        cloud.header().fields.len(),
        encoding.as_str()
    );
    Ok(cloud)
}

/// Writes a PCD file in ascii format.
pub fn write_pcd(path: impl AsRef<Path>, cloud: &PointBuffer) -> Result<(), PcdError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_pcd_to(&mut out, cloud, DataEncoding::Ascii)?;
    out.flush()?;
    Ok(())
}

/// Writes a PCD file in binary format; record bytes are written verbatim.
pub fn write_pcd_binary(path: impl AsRef<Path>, cloud: &PointBuffer) -> Result<(), PcdError> {
    let mut out = BufWriter::new(File::create(path)?);
    write_pcd_to(&mut out, cloud, DataEncoding::Binary)?;
    out.flush()?;
    Ok(())
}

/// Serializes `cloud` to `writer`. `BinaryCompressed` output is not supported.
pub fn write_pcd_to<W: Write>(
    mut writer: W,
    cloud: &PointBuffer,
    encoding: DataEncoding,
) -> Result<(), PcdError> {
    if encoding == DataEncoding::BinaryCompressed {
        return Err(PcdError::Data(
            "binary_compressed output is not supported".into(),
        ));
    }

    let header = cloud.header();
    writer.write_all(format_header(header, cloud.len(), encoding).as_bytes())?;

    match encoding {
        DataEncoding::Binary => writer.write_all(cloud.as_bytes())?,
        _ => {
            let mut line = String::new();
            for i in 0..cloud.len() {
                line.clear();
                format_record(header, cloud.record(i), &mut line);
                line.push('\n');
                writer.write_all(line.as_bytes())?;
            }
        }
    }

    debug!(
        "wrote PCD: {} points, {} encoding",
        cloud.len(),
        encoding.as_str()
    );
    Ok(())
}

// --- Header ---

#[derive(Default)]
struct RawHeader {
    fields: Option<Vec<String>>,
    sizes: Option<Vec<usize>>,
    types: Option<Vec<FieldType>>,
    counts: Option<Vec<usize>>,
    width: Option<usize>,
    height: Option<usize>,
    viewpoint: Option<[f32; 7]>,
    points: Option<usize>,
}

fn header_error(line: usize, message: impl Into<String>) -> PcdError {
    PcdError::Header {
        line,
        message: message.into(),
    }
}

fn parse_list<T, F>(
    line: usize,
    keyword: &str,
    values: &[&str],
    parse: F,
) -> Result<Vec<T>, PcdError>
where
    F: Fn(&str) -> Option<T>,
{
    values
        .iter()
        .map(|v| {
            parse(*v)
                .ok_or_else(|| header_error(line, format!("invalid {} value `{}`", keyword, v)))
        })
        .collect()
}

fn parse_single(line: usize, keyword: &str, values: &[&str]) -> Result<usize, PcdError> {
    match values {
        [v] => v
            .parse()
            .map_err(|_| header_error(line, format!("invalid {} value `{}`", keyword, v))),
        _ => Err(header_error(line, format!("{} takes exactly one value", keyword))),
    }
}

/// Consumes header lines through `DATA`.
fn read_header<R: BufRead>(
    reader: &mut R,
) -> Result<(PointCloudHeader, usize, DataEncoding), PcdError> {
    let mut raw = RawHeader::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    let encoding = loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Err(header_error(line_no, "missing DATA line"));
        }
        line_no += 1;

        let text = std::str::from_utf8(&buf)
            .map_err(|_| header_error(line_no, "header is not valid UTF-8"))?;
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let mut tokens = text.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();
        let values: Vec<&str> = tokens.collect();

        match keyword {
            "VERSION" => {}
            "FIELDS" => raw.fields = Some(values.iter().map(|s| s.to_string()).collect()),
            "SIZE" => {
                raw.sizes = Some(parse_list(line_no, keyword, &values, |v| v.parse().ok())?)
            }
            "TYPE" => {
                raw.types = Some(parse_list(line_no, keyword, &values, |v| {
                    let mut chars = v.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => FieldType::from_char(c),
                        _ => None,
                    }
                })?)
            }
            "COUNT" => {
                raw.counts = Some(parse_list(line_no, keyword, &values, |v| v.parse().ok())?)
            }
            "WIDTH" => raw.width = Some(parse_single(line_no, keyword, &values)?),
            "HEIGHT" => raw.height = Some(parse_single(line_no, keyword, &values)?),
            "POINTS" => raw.points = Some(parse_single(line_no, keyword, &values)?),
            "VIEWPOINT" => {
                let vp: Vec<f32> = parse_list(line_no, keyword, &values, |v| v.parse().ok())?;
                let vp: [f32; 7] = vp
                    .try_into()
                    .map_err(|_| header_error(line_no, "VIEWPOINT takes seven values"))?;
                raw.viewpoint = Some(vp);
            }
            "DATA" => {
                let encoding = values
                    .first()
                    .and_then(|v| DataEncoding::parse(v))
                    .ok_or_else(|| {
                        header_error(line_no, format!("unsupported DATA `{}`", values.join(" ")))
                    })?;
                break encoding;
            }
            other => warn!("skipping unknown PCD header keyword `{}`", other),
        }
    };

    let fields = raw
        .fields
        .ok_or_else(|| header_error(line_no, "missing FIELDS"))?;
    let sizes = raw.sizes.ok_or_else(|| header_error(line_no, "missing SIZE"))?;
    let types = raw.types.ok_or_else(|| header_error(line_no, "missing TYPE"))?;
    let counts = raw.counts.unwrap_or_else(|| vec![1; fields.len()]);
    let height = raw.height.unwrap_or(1);
    let width = raw
        .width
        .or(raw.points)
        .ok_or_else(|| header_error(line_no, "missing WIDTH"))?;
    let num_points = match raw.points {
        Some(points) => points,
        None => width
            .checked_mul(height)
            .ok_or_else(|| header_error(line_no, "WIDTH x HEIGHT overflows"))?,
    };

    let header =
        PointCloudHeader::new(fields, sizes, types, counts, width, height, raw.viewpoint)?;
    if payload_len(&header, num_points).is_none() {
        return Err(header_error(
            line_no,
            format!("{} points of {} bytes overflow", num_points, header.stride()),
        ));
    }
    Ok((header, num_points, encoding))
}

fn format_header(header: &PointCloudHeader, num_points: usize, encoding: DataEncoding) -> String {
    let join = |items: Vec<String>| items.join(" ");
    let (width, height) = if header.width.checked_mul(header.height) == Some(num_points) {
        (header.width, header.height)
    } else {
        (num_points, 1)
    };
    let viewpoint = header.viewpoint.unwrap_or([0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);

    let mut out = String::new();
    out.push_str("# .PCD v0.7 - Point Cloud Data file format\n");
    out.push_str("VERSION 0.7\n");
    out.push_str(&format!("FIELDS {}\n", header.fields.join(" ")));
    out.push_str(&format!(
        "SIZE {}\n",
        join(header.sizes.iter().map(|s| s.to_string()).collect())
    ));
    out.push_str(&format!(
        "TYPE {}\n",
        join(header.types.iter().map(|t| t.as_char().to_string()).collect())
    ));
    out.push_str(&format!(
        "COUNT {}\n",
        join(header.counts.iter().map(|c| c.to_string()).collect())
    ));
    out.push_str(&format!("WIDTH {}\n", width));
    out.push_str(&format!("HEIGHT {}\n", height));
    out.push_str(&format!(
        "VIEWPOINT {}\n",
        join(viewpoint.iter().map(|v| v.to_string()).collect())
    ));
    out.push_str(&format!("POINTS {}\n", num_points));
    out.push_str(&format!("DATA {}\n", encoding.as_str()));
    out
}

// --- Payload ---

fn eof_as_truncated(e: io::Error, what: &str) -> PcdError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        PcdError::Data(format!("{} ended early", what))
    } else {
        PcdError::Io(e)
    }
}

/// Payload bytes for `num_points` records; `None` on overflow.
fn payload_len(header: &PointCloudHeader, num_points: usize) -> Option<usize> {
    num_points.checked_mul(header.stride())
}

/// Reads exactly `len` bytes without trusting `len` for the allocation.
fn read_block<R: Read>(reader: &mut R, len: usize, what: &str) -> Result<Vec<u8>, PcdError> {
    let mut block = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut block)?;
    if block.len() != len {
        return Err(PcdError::Data(format!(
            "{} ended early: {} of {} bytes",
            what,
            block.len(),
            len
        )));
    }
    Ok(block)
}

fn read_binary<R: Read>(
    reader: &mut R,
    header: &PointCloudHeader,
    num_points: usize,
) -> Result<Vec<u8>, PcdError> {
    let len = payload_len(header, num_points)
        .ok_or_else(|| PcdError::Data(format!("{} points overflow", num_points)))?;
    read_block(reader, len, "binary payload")
}

/// Decompresses a field-major block and interleaves it into records.
fn read_compressed<R: Read>(
    reader: &mut R,
    header: &PointCloudHeader,
    num_points: usize,
) -> Result<Vec<u8>, PcdError> {
    let mut sizes = [0u8; 8];
    reader
        .read_exact(&mut sizes)
        .map_err(|e| eof_as_truncated(e, "compressed block header"))?;
    let compressed_len = u32::from_le_bytes([sizes[0], sizes[1], sizes[2], sizes[3]]) as usize;
    let raw_len = u32::from_le_bytes([sizes[4], sizes[5], sizes[6], sizes[7]]) as usize;

    let stride = header.stride();
    if payload_len(header, num_points) != Some(raw_len) {
        return Err(PcdError::Data(format!(
            "compressed block holds {} bytes, expected {} points x {} stride",
            raw_len, num_points, stride
        )));
    }

    let block = read_block(reader, compressed_len, "compressed block")?;
    let columns = lzf::decompress(&block, raw_len)?;

    let mut data = vec![0u8; raw_len];
    let mut column_start = 0;
    let mut field_offset = 0;
    for (size, count) in header.sizes.iter().zip(&header.counts) {
        let width = size * count;
        let column = &columns[column_start..column_start + num_points * width];
        for (i, value) in column.chunks_exact(width).enumerate() {
            let at = i * stride + field_offset;
            data[at..at + width].copy_from_slice(value);
        }
        column_start += num_points * width;
        field_offset += width;
    }
    Ok(data)
}

fn read_ascii<R: BufRead>(
    reader: &mut R,
    header: &PointCloudHeader,
    num_points: usize,
) -> Result<Vec<u8>, PcdError> {
    let stride = header.stride();
    let values_per_row: usize = header.counts.iter().sum();
    let mut data = Vec::new();
    let mut row = 0;
    let mut line = String::new();

    while row < num_points {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PcdError::Data(format!(
                "ascii payload has {} rows, header declared {}",
                row, num_points
            )));
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != values_per_row {
            return Err(PcdError::Data(format!(
                "row {} has {} values, expected {}",
                row,
                tokens.len(),
                values_per_row
            )));
        }

        data.resize(data.len() + stride, 0);
        let record = &mut data[row * stride..];
        let mut token = tokens.iter();
        let mut offset = 0;
        for ((&size, &ty), &count) in header.sizes.iter().zip(&header.types).zip(&header.counts) {
            for _ in 0..count {
                // tokens.len() == values_per_row, so the iterator cannot run dry
                let text = token.next().copied().unwrap_or_default();
                encode_token(text, ty, &mut record[offset..offset + size]).ok_or_else(|| {
                    PcdError::Data(format!("row {}: invalid value `{}`", row, text))
                })?;
                offset += size;
            }
        }
        row += 1;
    }
    Ok(data)
}

fn encode_token(text: &str, ty: FieldType, out: &mut [u8]) -> Option<()> {
    let size = out.len();
    match ty {
        FieldType::Float if size == 4 => {
            let v: f32 = text.parse().ok()?;
            out.copy_from_slice(&v.to_le_bytes());
        }
        FieldType::Float => {
            let v: f64 = text.parse().ok()?;
            out.copy_from_slice(&v.to_le_bytes());
        }
        FieldType::Unsigned => {
            let v: u64 = text.parse().ok()?;
            if size < 8 && v >> (8 * size) != 0 {
                return None;
            }
            out.copy_from_slice(&v.to_le_bytes()[..size]);
        }
        FieldType::Signed => {
            let v: i64 = text.parse().ok()?;
            let bits = 8 * size as u32;
            if size < 8 && (v < -(1i64 << (bits - 1)) || v >= 1i64 << (bits - 1)) {
                return None;
            }
            out.copy_from_slice(&v.to_le_bytes()[..size]);
        }
    }
    Some(())
}

fn format_record(header: &PointCloudHeader, record: &[u8], out: &mut String) {
    let mut offset = 0;
    let mut first = true;
    for ((&size, &ty), &count) in header.sizes.iter().zip(&header.types).zip(&header.counts) {
        for _ in 0..count {
            if !first {
                out.push(' ');
            }
            first = false;
            let bytes = &record[offset..offset + size];
            let mut wide = [0u8; 8];
            wide[..size].copy_from_slice(bytes);
            let text = match (ty, size) {
                (FieldType::Float, 4) => {
                    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]).to_string()
                }
                (FieldType::Float, _) => f64::from_le_bytes(wide).to_string(),
                (FieldType::Unsigned, _) => u64::from_le_bytes(wide).to_string(),
                (FieldType::Signed, _) => {
                    let shift = 64 - 8 * size as u32;
                    ((i64::from_le_bytes(wide) << shift) >> shift).to_string()
                }
            };
            out.push_str(&text);
            offset += size;
        }
    }
}
