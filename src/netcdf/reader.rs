//! Classic NetCDF reader.

use std::fs::File;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use smallvec::SmallVec;

#[cfg(feature = "mmap")]
use memmap2::Mmap;

use super::format::*;
use crate::core::{ArrayData, ArrayValues, AttrValue, DatasetReader, Dimension, VarSchema};
use crate::util::{Error, NcType, Result};

#[derive(Debug)]
enum Backing {
    #[cfg(feature = "mmap")]
    Mmap(Mmap),
    #[cfg(not(feature = "mmap"))]
    Heap(Vec<u8>),
}

impl Backing {
    #[inline]
    fn as_slice(&self) -> &[u8] {
        match self {
            #[cfg(feature = "mmap")]
            Backing::Mmap(m) => m,
            #[cfg(not(feature = "mmap"))]
            Backing::Heap(v) => v,
        }
    }
}

/// Per-variable layout information not exposed through the schema.
#[derive(Debug)]
struct VarMeta {
    dimids: SmallVec<[usize; 4]>,
    begin: u64,
    /// Elements per record (record variables) or in total (fixed ones).
    elems: usize,
    is_record: bool,
}

/// Read access to one classic NetCDF file.
///
/// The whole file is memory-mapped (heap-buffered without the `mmap`
/// feature); header structures are parsed eagerly, data lazily per read.
#[derive(Debug)]
pub struct NcReader {
    path: PathBuf,
    buf: Backing,
    version: NcVersion,
    numrecs: usize,
    dims: Vec<Dimension>,
    gattrs: Vec<(String, AttrValue)>,
    schemas: Vec<VarSchema>,
    meta: Vec<VarMeta>,
    recsize: u64,
}

/// Bounds-checked cursor over the header bytes.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(Error::UnexpectedEof(self.data.len() as u64));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    fn read_nonneg(&mut self, what: &str) -> Result<usize> {
        let v = self.read_i32()?;
        if v < 0 {
            return Err(Error::invalid(format!("negative {what}: {v}")));
        }
        Ok(v as usize)
    }

    fn read_name(&mut self) -> Result<String> {
        let len = self.read_nonneg("name length")?;
        let bytes = self.take(len)?.to_vec();
        self.take(pad4(len))?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Read a list header, returning the element count. `ABSENT` lists
    /// (zero tag, zero count) yield 0.
    fn read_list(&mut self, tag: i32, what: &str) -> Result<usize> {
        let seen = self.read_i32()?;
        let count = self.read_nonneg("list length")?;
        if seen == tag || (seen == TAG_ABSENT && count == 0) {
            Ok(count)
        } else {
            Err(Error::invalid(format!("bad {what} list tag: {seen:#x}")))
        }
    }

    fn read_attr(&mut self) -> Result<(String, AttrValue)> {
        let name = self.read_name()?;
        let code = self.read_i32()?;
        let nc_type =
            NcType::from_code(code).ok_or_else(|| Error::invalid(format!("bad attribute type {code}")))?;
        let nelems = self.read_nonneg("attribute length")?;
        let bytes = self.take(nelems * nc_type.num_bytes())?;
        self.take(pad4(nelems * nc_type.num_bytes()))?;
        let value = match decode_slice(nc_type, bytes) {
            ArrayValues::Bytes(v) => AttrValue::Bytes(v),
            ArrayValues::Chars(v) => AttrValue::Text(String::from_utf8(v)?),
            ArrayValues::Shorts(v) => AttrValue::Shorts(v),
            ArrayValues::Ints(v) => AttrValue::Ints(v),
            ArrayValues::Floats(v) => AttrValue::Floats(v),
            ArrayValues::Doubles(v) => AttrValue::Doubles(v),
        };
        Ok((name, value))
    }

    fn read_attr_list(&mut self) -> Result<Vec<(String, AttrValue)>> {
        let count = self.read_list(TAG_ATTRIBUTE, "attribute")?;
        (0..count).map(|_| self.read_attr()).collect()
    }
}

/// Decode big-endian elements of one external type.
pub(super) fn decode_slice(nc_type: NcType, bytes: &[u8]) -> ArrayValues {
    match nc_type {
        NcType::Byte => ArrayValues::Bytes(bytes.iter().map(|&b| b as i8).collect()),
        NcType::Char => ArrayValues::Chars(bytes.to_vec()),
        NcType::Short => {
            ArrayValues::Shorts(bytes.chunks_exact(2).map(BigEndian::read_i16).collect())
        }
        NcType::Int => ArrayValues::Ints(bytes.chunks_exact(4).map(BigEndian::read_i32).collect()),
        NcType::Float => {
            ArrayValues::Floats(bytes.chunks_exact(4).map(BigEndian::read_f32).collect())
        }
        NcType::Double => {
            ArrayValues::Doubles(bytes.chunks_exact(8).map(BigEndian::read_f64).collect())
        }
    }
}

impl NcReader {
    /// Open and parse a classic NetCDF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        #[cfg(feature = "mmap")]
        let buf = {
            // Safety: the file is opened read-only and only read through
            // the map.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            Backing::Mmap(mmap)
        };
        #[cfg(not(feature = "mmap"))]
        let buf = {
            use std::io::Read;
            let mut file = file;
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            Backing::Heap(bytes)
        };

        Self::parse(path.to_path_buf(), buf)
    }

    fn parse(path: PathBuf, buf: Backing) -> Result<Self> {
        let data = buf.as_slice();
        if data.len() < 4 || &data[0..3] != MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = NcVersion::from_byte(data[3]).ok_or(Error::UnsupportedVersion(data[3]))?;

        let mut cur = Cursor { data, pos: 4 };
        let numrecs = cur.read_nonneg("record count")?;

        // Dimension list.
        let ndims = cur.read_list(TAG_DIMENSION, "dimension")?;
        let mut dims = Vec::with_capacity(ndims);
        for _ in 0..ndims {
            let name = cur.read_name()?;
            let size = cur.read_nonneg("dimension size")?;
            if size == 0 {
                if dims.iter().any(|d: &Dimension| d.unlimited) {
                    return Err(Error::invalid("more than one unlimited dimension"));
                }
                dims.push(Dimension {
                    name,
                    len: numrecs,
                    unlimited: true,
                });
            } else {
                dims.push(Dimension::fixed(name, size));
            }
        }

        let gattrs = cur.read_attr_list()?;

        // Variable list.
        let nvars = cur.read_list(TAG_VARIABLE, "variable")?;
        let mut schemas = Vec::with_capacity(nvars);
        let mut meta = Vec::with_capacity(nvars);
        for _ in 0..nvars {
            let name = cur.read_name()?;
            let ndims = cur.read_nonneg("dimension count")?;
            let mut dimids: SmallVec<[usize; 4]> = SmallVec::with_capacity(ndims);
            for _ in 0..ndims {
                let id = cur.read_nonneg("dimension id")?;
                if id >= dims.len() {
                    return Err(Error::invalid(format!("dimension id {id} out of range")));
                }
                dimids.push(id);
            }
            let attrs = cur.read_attr_list()?;
            let code = cur.read_i32()?;
            let nc_type = NcType::from_code(code)
                .ok_or_else(|| Error::invalid(format!("bad variable type {code}")))?;
            let _vsize = cur.read_i32()?; // redundant; layout is recomputed
            let begin = match version {
                NcVersion::Classic => cur.read_i32()? as i64,
                NcVersion::Offset64 => cur.read_i64()?,
            };
            if begin < 0 {
                return Err(Error::invalid(format!("negative data offset for '{name}'")));
            }

            let is_record = dimids.first().is_some_and(|&id| dims[id].unlimited);
            if dimids.iter().skip(1).any(|&id| dims[id].unlimited) {
                return Err(Error::invalid(format!(
                    "unlimited dimension of '{name}' is not the leading one"
                )));
            }
            let elems: usize = dimids
                .iter()
                .skip(if is_record { 1 } else { 0 })
                .map(|&id| dims[id].len)
                .product();

            schemas.push(VarSchema {
                name,
                nc_type,
                dims: dimids.iter().map(|&id| dims[id].name.clone()).collect(),
                attrs,
            });
            meta.push(VarMeta {
                dimids,
                begin: begin as u64,
                elems,
                is_record,
            });
        }

        let recsize = record_size(&schemas, &meta);

        Ok(Self {
            path,
            buf,
            version,
            numrecs,
            dims,
            gattrs,
            schemas,
            meta,
            recsize,
        })
    }

    /// Format flavor of the file.
    #[inline]
    pub fn version(&self) -> NcVersion {
        self.version
    }

    fn find(&self, name: &str) -> Result<(&VarSchema, &VarMeta)> {
        self.schemas
            .iter()
            .position(|v| v.name == name)
            .map(|i| (&self.schemas[i], &self.meta[i]))
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }

    fn slice(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let data = self.buf.as_slice();
        let start = offset as usize;
        if start + len > data.len() {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        Ok(&data[start..start + len])
    }

    fn shape_of(&self, meta: &VarMeta) -> Vec<usize> {
        meta.dimids.iter().map(|&id| self.dims[id].len).collect()
    }
}

/// Byte stride of one whole record.
///
/// Each record variable contributes its per-record size rounded up to four
/// bytes; when there is exactly one record variable no padding applies.
fn record_size(schemas: &[VarSchema], meta: &[VarMeta]) -> u64 {
    let record_vars: Vec<usize> = (0..meta.len()).filter(|&i| meta[i].is_record).collect();
    let mut total = 0u64;
    for &i in &record_vars {
        let bytes = meta[i].elems * schemas[i].nc_type.num_bytes();
        total += if record_vars.len() == 1 {
            bytes as u64
        } else {
            padded4(bytes) as u64
        };
    }
    total
}

impl DatasetReader for NcReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dims
    }

    fn variables(&self) -> &[VarSchema] {
        &self.schemas
    }

    fn global_attrs(&self) -> &[(String, AttrValue)] {
        &self.gattrs
    }

    fn num_frames(&self) -> usize {
        self.numrecs
    }

    fn read_all(&self, name: &str) -> Result<ArrayData> {
        let (schema, meta) = self.find(name)?;
        let elem_bytes = schema.nc_type.num_bytes();
        if meta.is_record {
            let row_bytes = meta.elems * elem_bytes;
            let mut bytes = Vec::with_capacity(row_bytes * self.numrecs);
            for rec in 0..self.numrecs {
                let offset = meta.begin + rec as u64 * self.recsize;
                bytes.extend_from_slice(self.slice(offset, row_bytes)?);
            }
            Ok(ArrayData::new(
                decode_slice(schema.nc_type, &bytes),
                self.shape_of(meta),
            ))
        } else {
            let bytes = self.slice(meta.begin, meta.elems * elem_bytes)?;
            Ok(ArrayData::new(
                decode_slice(schema.nc_type, bytes),
                self.shape_of(meta),
            ))
        }
    }

    fn read_frame(&self, name: &str, frame: usize) -> Result<ArrayData> {
        let (schema, meta) = self.find(name)?;
        if !meta.is_record {
            return Err(Error::invalid(format!(
                "variable '{name}' has no frame dimension"
            )));
        }
        if frame >= self.numrecs {
            return Err(Error::FrameOutOfBounds {
                index: frame,
                count: self.numrecs,
            });
        }
        let row_bytes = meta.elems * schema.nc_type.num_bytes();
        let offset = meta.begin + frame as u64 * self.recsize;
        let bytes = self.slice(offset, row_bytes)?;
        let shape = self.shape_of(meta)[1..].to_vec();
        Ok(ArrayData::new(decode_slice(schema.nc_type, bytes), shape))
    }
}
