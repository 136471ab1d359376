// Dense 2D sample grid shared by every solver stage

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use na::DMatrix;
use thiserror::Error;

/// Dimensionality tag written at the head of every saved field.
pub const FIELD_DIMENSIONALITY: u32 = 2;

/// Smallest usable side length: one interior cell plus the two border cells.
pub const MIN_FIELD_SIZE: usize = 3;

#[derive(Error, Debug)]
pub enum FieldError {
    #[error("field of {width}x{height} is too small; both sides must be at least {MIN_FIELD_SIZE}")]
    TooSmall { width: usize, height: usize },

    #[error("({x}, {y}) is outside of the {width}x{height} field")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("field dimensions differ: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error(
        "saved field header does not match: expected {expected_dims}D x {expected_len}, \
         found {found_dims}D x {found_len}"
    )]
    FormatMismatch {
        expected_dims: u32,
        found_dims: u32,
        expected_len: u32,
        found_len: u32,
    },

    #[error("field of {len} samples cannot be described by a saved field header")]
    TooLarge { len: usize },

    #[error("field i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A fixed-size grid of `f32` samples addressed by `(x, y)`.
///
/// The backing matrix has `width` rows and `height` columns, so the
/// column-major storage index of `(x, y)` is `y * width + x`. The outer
/// ring of cells holds boundary values written by the boundary operator.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    data: DMatrix<f32>,
}

impl Field {
    /// Create a zero-filled field
    ///
    /// Parameters
    /// - `width` - The number of cells along x, border included
    /// - `height` - The number of cells along y, border included
    pub fn new(width: usize, height: usize) -> Result<Self, FieldError> {
        if width < MIN_FIELD_SIZE || height < MIN_FIELD_SIZE {
            return Err(FieldError::TooSmall { width, height });
        }

        Ok(Field {
            data: DMatrix::zeros(width, height),
        })
    }

    /// Create a field with every sample computed from its coordinates
    pub fn from_fn(
        width: usize,
        height: usize,
        f: impl FnMut(usize, usize) -> f32,
    ) -> Result<Self, FieldError> {
        let mut field = Field::new(width, height)?;
        field.data = DMatrix::from_fn(width, height, f);
        Ok(field)
    }

    pub fn width(&self) -> usize {
        self.data.nrows()
    }

    pub fn height(&self) -> usize {
        self.data.ncols()
    }

    /// (width, height)
    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    /// Total number of samples, `width * height`
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read the sample at `(x, y)`. Panics when the coordinates fall outside the field.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[(x, y)]
    }

    /// Write the sample at `(x, y)`. Panics when the coordinates fall outside the field.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[(x, y)] = value;
    }

    pub fn try_get(&self, x: usize, y: usize) -> Result<f32, FieldError> {
        self.data
            .get((x, y))
            .copied()
            .ok_or_else(|| self.out_of_bounds(x, y))
    }

    pub fn try_set(&mut self, x: usize, y: usize, value: f32) -> Result<(), FieldError> {
        let err = self.out_of_bounds(x, y);
        let sample = self.data.get_mut((x, y)).ok_or(err)?;
        *sample = value;
        Ok(())
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn add_scalar(&mut self, value: f32) {
        self.data.add_scalar_mut(value);
    }

    pub fn scale(&mut self, value: f32) {
        self.data *= value;
    }

    /// Element-wise `self += other`
    pub fn add_field(&mut self, other: &Field) -> Result<(), FieldError> {
        self.check_shape(other)?;
        self.data += &other.data;
        Ok(())
    }

    /// Element-wise `self += other * factor`
    pub fn add_scaled_field(&mut self, other: &Field, factor: f32) -> Result<(), FieldError> {
        self.check_shape(other)?;
        for (sample, &addend) in self.data.iter_mut().zip(other.data.iter()) {
            *sample += addend * factor;
        }
        Ok(())
    }

    /// Overwrite every sample with the matching sample of `other`
    pub fn copy_from(&mut self, other: &Field) -> Result<(), FieldError> {
        self.check_shape(other)?;
        self.data.copy_from(&other.data);
        Ok(())
    }

    /// Samples in storage order (`index = y * width + x`)
    pub fn as_slice(&self) -> &[f32] {
        self.data.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.data.as_mut_slice()
    }

    /// The backing matrix, indexed `(x, y)`
    pub fn as_matrix(&self) -> &DMatrix<f32> {
        &self.data
    }

    /// Largest absolute sample value
    pub fn max_abs(&self) -> f32 {
        self.data.iter().fold(0.0f32, |m, &s| m.max(s.abs()))
    }

    /// Write the field as a `(dimensionality, length)` header followed by the
    /// raw samples, all little-endian.
    pub fn save(&self, path: &Path) -> Result<(), FieldError> {
        let header_len = encoded_len(self.len())?;
        let mut writer = BufWriter::new(File::create(path)?);

        writer.write_all(&FIELD_DIMENSIONALITY.to_le_bytes())?;
        writer.write_all(&header_len.to_le_bytes())?;

        for sample in self.data.iter() {
            writer.write_all(&sample.to_le_bytes())?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Read a field previously written by [`Field::save`].
    ///
    /// The header must describe a 2D field with exactly as many samples as
    /// this one. On any error the field is left untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), FieldError> {
        let expected_len = encoded_len(self.len())?;
        let mut reader = BufReader::new(File::open(path)?);

        let found_dims = read_u32(&mut reader)?;
        let found_len = read_u32(&mut reader)?;

        if found_dims != FIELD_DIMENSIONALITY || found_len != expected_len {
            return Err(FieldError::FormatMismatch {
                expected_dims: FIELD_DIMENSIONALITY,
                found_dims,
                expected_len,
                found_len,
            });
        }

        let mut payload = vec![0u8; self.len() * size_of::<f32>()];
        reader.read_exact(&mut payload)?;

        for (sample, bytes) in self
            .data
            .iter_mut()
            .zip(payload.chunks_exact(size_of::<f32>()))
        {
            *sample = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }

        Ok(())
    }

    fn check_shape(&self, other: &Field) -> Result<(), FieldError> {
        if self.shape() != other.shape() {
            return Err(FieldError::DimensionMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }

    fn out_of_bounds(&self, x: usize, y: usize) -> FieldError {
        FieldError::OutOfBounds {
            x,
            y,
            width: self.width(),
            height: self.height(),
        }
    }
}

/// The sample count as stored in a saved field header
fn encoded_len(len: usize) -> Result<u32, FieldError> {
    u32::try_from(len).map_err(|_| FieldError::TooLarge { len })
}

fn read_u32(reader: &mut impl Read) -> Result<u32, FieldError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}
