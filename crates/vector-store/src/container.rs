//! Embedding containers: `.npy` arrays, usually wrapped in a `.npz` zip archive.
//!
//! Only two-dimensional little-endian `f32` arrays are supported:
//!
//! ```text
//! 0      1..6     6     7     8..10 (v1) / 8..12 (v2+)   header          payload
//! 0x93  "NUMPY"  major minor header length (LE)          {'descr': '<f4', 'shape': (N, D)}  N*D f32
//! ```

use crate::error::{Result, VectorStoreError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const DEFAULT_ENTRY: &str = "arr_0.npy";

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'descr':\s*'<f4'.*'shape':\s*\((\d+),\s*(\d+)\)")
        .expect("npy header pattern is valid")
});

/// Row-major `rows x dimension` matrix of raw embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    pub rows: usize,
    pub dimension: usize,
    pub data: Vec<f32>,
}

impl EmbeddingMatrix {
    pub fn row(&self, idx: usize) -> Option<&[f32]> {
        let start = idx.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }
}

/// Parse a raw `.npy` buffer.
pub fn parse_npy(bytes: &[u8]) -> Result<EmbeddingMatrix> {
    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err(VectorStoreError::ContainerError(
            "Invalid NPY magic".to_string(),
        ));
    }

    let major = bytes[6];
    let (header_len, header_start) = if major == 1 {
        (usize::from(u16::from_le_bytes([bytes[8], bytes[9]])), 10)
    } else {
        let raw = bytes.get(8..12).ok_or_else(|| {
            VectorStoreError::ContainerError("Truncated NPY preamble".to_string())
        })?;
        let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        (len as usize, 12)
    };

    let header_end = header_start + header_len;
    let header = bytes
        .get(header_start..header_end)
        .ok_or_else(|| VectorStoreError::ContainerError("Truncated NPY header".to_string()))?;
    let header = String::from_utf8_lossy(header);

    let caps = HEADER_RE.captures(&header).ok_or_else(|| {
        VectorStoreError::ContainerError(format!("Unsupported NPY header: {}", header.trim()))
    })?;
    let rows: usize = caps[1]
        .parse()
        .map_err(|_| VectorStoreError::ContainerError(format!("Invalid row count '{}'", &caps[1])))?;
    let dimension: usize = caps[2].parse().map_err(|_| {
        VectorStoreError::ContainerError(format!("Invalid dimension '{}'", &caps[2]))
    })?;

    let expected = rows
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| VectorStoreError::ContainerError("NPY shape overflows".to_string()))?;
    let payload = &bytes[header_end..];
    if payload.len() < expected {
        return Err(VectorStoreError::ContainerError(format!(
            "NPY payload too short: expected {expected} bytes, got {}",
            payload.len()
        )));
    }

    let data = payload[..expected]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(EmbeddingMatrix {
        rows,
        dimension,
        data,
    })
}

/// Parse a `.npz` archive held in memory.
pub fn parse_npz(bytes: &[u8]) -> Result<EmbeddingMatrix> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let entry = if archive.file_names().any(|name| name == DEFAULT_ENTRY) {
        DEFAULT_ENTRY.to_string()
    } else {
        archive
            .file_names()
            .find(|name| name.ends_with(".npy"))
            .map(str::to_string)
            .ok_or_else(|| {
                VectorStoreError::ContainerError(format!("{DEFAULT_ENTRY} not found in npz"))
            })?
    };

    let mut file = archive.by_name(&entry)?;
    let mut npy = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
    file.read_to_end(&mut npy)?;
    parse_npy(&npy)
}

/// Read an embedding container from disk. Bare `.npy` files are accepted too.
pub fn read_embeddings(path: &Path) -> Result<EmbeddingMatrix> {
    let bytes = std::fs::read(path)?;
    if bytes.starts_with(NPY_MAGIC) {
        parse_npy(&bytes)
    } else {
        parse_npz(&bytes)
    }
}

/// Encode a matrix as a version 1.0 `.npy` buffer.
pub fn encode_npy(matrix: &EmbeddingMatrix) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        matrix.rows, matrix.dimension
    );
    // Header is padded with spaces so the payload starts on a 64-byte boundary.
    let unpadded = 10 + dict.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    let header_len = dict.len() + padding + 1;

    let mut out = Vec::with_capacity(10 + header_len + matrix.data.len() * 4);
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend(std::iter::repeat(b' ').take(padding));
    out.push(b'\n');
    for value in &matrix.data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Write a single-array `.npz` archive (entry `arr_0.npy`).
pub fn write_npz(path: &Path, matrix: &EmbeddingMatrix) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file(DEFAULT_ENTRY, options)?;
    zip.write_all(&encode_npy(matrix))?;
    zip.finish()?;
    Ok(())
}
