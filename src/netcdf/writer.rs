//! Classic NetCDF writer.
//!
//! Follows the library-standard define-then-write lifecycle: dimensions,
//! variables, and attributes are declared first; the first data write
//! commits the header, after which the schema is frozen. Record counts are
//! patched into the header when the file is finalized.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, WriteBytesExt};
use smallvec::SmallVec;

use super::format::*;
use crate::core::{ArrayData, ArrayValues, AttrValue, DatasetWriter, Dimension, VarSchema};
use crate::util::{Error, Result};

#[derive(Debug)]
struct WVar {
    schema: VarSchema,
    dimids: SmallVec<[usize; 4]>,
    is_record: bool,
    /// Elements per record (record variables) or in total (fixed ones).
    elems: usize,
    vsize: u64,
    begin: u64,
}

/// Write access to a new classic NetCDF file.
#[derive(Debug)]
pub struct NcWriter {
    path: PathBuf,
    file: File,
    version: NcVersion,
    define: bool,
    dims: Vec<Dimension>,
    gattrs: Vec<(String, AttrValue)>,
    vars: Vec<WVar>,
    recsize: u64,
    numrecs: usize,
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_i64(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn encode_values(values: &ArrayValues, out: &mut Vec<u8>) {
    match values {
        ArrayValues::Bytes(v) => out.extend(v.iter().map(|&b| b as u8)),
        ArrayValues::Chars(v) => out.extend_from_slice(v),
        ArrayValues::Shorts(v) => {
            for &x in v {
                out.extend_from_slice(&x.to_be_bytes());
            }
        }
        ArrayValues::Ints(v) => {
            for &x in v {
                put_i32(out, x);
            }
        }
        ArrayValues::Floats(v) => {
            for &x in v {
                out.extend_from_slice(&x.to_be_bytes());
            }
        }
        ArrayValues::Doubles(v) => {
            for &x in v {
                out.extend_from_slice(&x.to_be_bytes());
            }
        }
    }
}

fn attr_values(value: &AttrValue) -> ArrayValues {
    match value {
        AttrValue::Bytes(v) => ArrayValues::Bytes(v.clone()),
        AttrValue::Text(s) => ArrayValues::Chars(s.as_bytes().to_vec()),
        AttrValue::Shorts(v) => ArrayValues::Shorts(v.clone()),
        AttrValue::Ints(v) => ArrayValues::Ints(v.clone()),
        AttrValue::Floats(v) => ArrayValues::Floats(v.clone()),
        AttrValue::Doubles(v) => ArrayValues::Doubles(v.clone()),
    }
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    put_i32(out, name.len() as i32);
    out.extend_from_slice(name.as_bytes());
    out.extend(std::iter::repeat(0u8).take(pad4(name.len())));
}

fn write_attr_list(out: &mut Vec<u8>, attrs: &[(String, AttrValue)]) {
    if attrs.is_empty() {
        put_i32(out, TAG_ABSENT);
        put_i32(out, 0);
        return;
    }
    put_i32(out, TAG_ATTRIBUTE);
    put_i32(out, attrs.len() as i32);
    for (name, value) in attrs {
        write_name(out, name);
        put_i32(out, value.nc_type().code());
        put_i32(out, value.len() as i32);
        let bytes_before = out.len();
        encode_values(&attr_values(value), out);
        out.extend(std::iter::repeat(0u8).take(pad4(out.len() - bytes_before)));
    }
}

impl NcWriter {
    /// Create a new file; an existing file at the path is an error, never
    /// overwritten.
    pub fn create(path: impl AsRef<Path>, version: NcVersion) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    Error::OutputExists(path.to_path_buf())
                } else {
                    Error::Io(e)
                }
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            version,
            define: true,
            dims: Vec::new(),
            gattrs: Vec::new(),
            vars: Vec::new(),
            recsize: 0,
            numrecs: 0,
        })
    }

    /// Format flavor being written.
    #[inline]
    pub fn version(&self) -> NcVersion {
        self.version
    }

    fn check_define(&self, what: &str) -> Result<()> {
        if self.define {
            Ok(())
        } else {
            Err(Error::DefineMode(format!("cannot add {what}")))
        }
    }

    fn find(&self, name: &str) -> Result<usize> {
        self.vars
            .iter()
            .position(|v| v.schema.name == name)
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }

    /// Compute the data layout and commit the header. Idempotent; called
    /// automatically by the first data write.
    pub fn end_define(&mut self) -> Result<()> {
        if !self.define {
            return Ok(());
        }
        self.define = false;

        let record_count = self.vars.iter().filter(|v| v.is_record).count();
        for var in &mut self.vars {
            let bytes = var.elems * var.schema.nc_type.num_bytes();
            var.vsize = if var.is_record && record_count == 1 {
                // The sole record variable is stored without padding.
                bytes as u64
            } else {
                padded4(bytes) as u64
            };
        }

        // A first pass with zero offsets fixes the header length (offset
        // fields are fixed-width), a second pass fills in the real offsets.
        let header_len = self.build_header().len() as u64;
        let mut pos = header_len;
        for var in self.vars.iter_mut().filter(|v| !v.is_record) {
            var.begin = pos;
            pos += var.vsize;
        }
        let mut roff = 0u64;
        for var in self.vars.iter_mut().filter(|v| v.is_record) {
            var.begin = pos + roff;
            roff += var.vsize;
        }
        self.recsize = roff;

        let header = self.build_header();
        debug_assert_eq!(header.len() as u64, header_len);
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header)?;
        Ok(())
    }

    fn build_header(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(self.version.byte());
        put_i32(&mut out, self.numrecs as i32);

        if self.dims.is_empty() {
            put_i32(&mut out, TAG_ABSENT);
            put_i32(&mut out, 0);
        } else {
            put_i32(&mut out, TAG_DIMENSION);
            put_i32(&mut out, self.dims.len() as i32);
            for dim in &self.dims {
                write_name(&mut out, &dim.name);
                let size = if dim.unlimited { 0 } else { dim.len };
                put_i32(&mut out, size as i32);
            }
        }

        write_attr_list(&mut out, &self.gattrs);

        if self.vars.is_empty() {
            put_i32(&mut out, TAG_ABSENT);
            put_i32(&mut out, 0);
        } else {
            put_i32(&mut out, TAG_VARIABLE);
            put_i32(&mut out, self.vars.len() as i32);
            for var in &self.vars {
                write_name(&mut out, &var.schema.name);
                put_i32(&mut out, var.dimids.len() as i32);
                for &id in &var.dimids {
                    put_i32(&mut out, id as i32);
                }
                write_attr_list(&mut out, &var.schema.attrs);
                put_i32(&mut out, var.schema.nc_type.code());
                put_i32(&mut out, var.vsize.min(i32::MAX as u64) as i32);
                match self.version {
                    NcVersion::Classic => put_i32(&mut out, var.begin as i32),
                    NcVersion::Offset64 => put_i64(&mut out, var.begin as i64),
                }
            }
        }
        out
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    fn check_payload(&self, i: usize, data: &ArrayData) -> Result<()> {
        let var = &self.vars[i];
        if data.nc_type() != var.schema.nc_type {
            return Err(Error::invalid(format!(
                "variable '{}' is {} but payload is {}",
                var.schema.name,
                var.schema.nc_type,
                data.nc_type()
            )));
        }
        if data.len() != var.elems {
            return Err(Error::invalid(format!(
                "variable '{}' takes {} elements per write, got {}",
                var.schema.name,
                var.elems,
                data.len()
            )));
        }
        Ok(())
    }

    /// Patch the final record count and flush.
    pub fn finish(mut self) -> Result<()> {
        self.end_define()?;
        self.file.seek(SeekFrom::Start(4))?;
        self.file.write_i32::<BigEndian>(self.numrecs as i32)?;
        self.file.flush()?;
        Ok(())
    }
}

impl DatasetWriter for NcWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn has_dimension(&self, name: &str) -> bool {
        self.dims.iter().any(|d| d.name == name)
    }

    fn has_variable(&self, name: &str) -> bool {
        self.vars.iter().any(|v| v.schema.name == name)
    }

    fn add_dimension(&mut self, name: &str, len: Option<usize>) -> Result<()> {
        self.check_define("dimension")?;
        if self.has_dimension(name) {
            return Err(Error::invalid(format!("dimension '{name}' exists already")));
        }
        match len {
            Some(n) => self.dims.push(Dimension::fixed(name, n)),
            None => {
                if self.dims.iter().any(|d| d.unlimited) {
                    return Err(Error::invalid("more than one unlimited dimension"));
                }
                self.dims.push(Dimension::unlimited(name));
            }
        }
        Ok(())
    }

    fn add_variable(&mut self, schema: &VarSchema) -> Result<()> {
        self.check_define("variable")?;
        if self.has_variable(&schema.name) {
            return Err(Error::invalid(format!(
                "variable '{}' exists already",
                schema.name
            )));
        }
        let mut dimids: SmallVec<[usize; 4]> = SmallVec::with_capacity(schema.dims.len());
        for dim_name in &schema.dims {
            let id = self
                .dims
                .iter()
                .position(|d| &d.name == dim_name)
                .ok_or_else(|| Error::DimensionNotFound(dim_name.clone()))?;
            dimids.push(id);
        }
        let is_record = dimids.first().is_some_and(|&id| self.dims[id].unlimited);
        if dimids.iter().skip(1).any(|&id| self.dims[id].unlimited) {
            return Err(Error::invalid(format!(
                "unlimited dimension of '{}' must come first",
                schema.name
            )));
        }
        let elems: usize = dimids
            .iter()
            .skip(if is_record { 1 } else { 0 })
            .map(|&id| self.dims[id].len)
            .product();
        self.vars.push(WVar {
            schema: schema.clone(),
            dimids,
            is_record,
            elems,
            vsize: 0,
            begin: 0,
        });
        Ok(())
    }

    fn put_global_attr(&mut self, name: &str, value: AttrValue) -> Result<()> {
        self.check_define("global attribute")?;
        if let Some(slot) = self.gattrs.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.gattrs.push((name.to_string(), value));
        }
        Ok(())
    }

    fn write_all(&mut self, name: &str, data: &ArrayData) -> Result<()> {
        self.end_define()?;
        let i = self.find(name)?;
        if self.vars[i].is_record {
            return Err(Error::invalid(format!(
                "variable '{name}' is frame-indexed; write it frame by frame"
            )));
        }
        self.check_payload(i, data)?;
        let mut bytes = Vec::with_capacity(data.len() * data.nc_type().num_bytes());
        encode_values(&data.values, &mut bytes);
        self.write_at(self.vars[i].begin, &bytes)
    }

    fn write_frame(&mut self, name: &str, frame: usize, data: &ArrayData) -> Result<()> {
        self.end_define()?;
        let i = self.find(name)?;
        if !self.vars[i].is_record {
            return Err(Error::invalid(format!(
                "variable '{name}' has no frame dimension"
            )));
        }
        self.check_payload(i, data)?;
        let mut bytes = Vec::with_capacity(data.len() * data.nc_type().num_bytes());
        encode_values(&data.values, &mut bytes);
        let offset = self.vars[i].begin + frame as u64 * self.recsize;
        self.write_at(offset, &bytes)?;
        self.numrecs = self.numrecs.max(frame + 1);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        (*self).finish()
    }
}
