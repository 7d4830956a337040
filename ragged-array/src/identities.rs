//! Per-row provenance labels carried in parallel with the data.
//!
//! Every node may hold an [`Identities`] whose length matches the node's
//! length. Structural transformations propagate them alongside the rows:
//! range windows narrow the label block zero-copy and gathers re-gather it.

use std::sync::Arc;

use ragged_buffer::{Buffer, BufferMut};
use ragged_error::{RaggedResult, ragged_bail};

/// A shared handle to an [`Identities`] block.
pub type IdentitiesRef = Arc<Identities>;

/// A rectangular block of `width` integer labels per row, plus the field
/// path fragments (`fieldloc`) that interleave with the integers when a
/// label is rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identities {
    fieldloc: Vec<(i64, String)>,
    width: usize,
    buffer: Buffer<i64>,
}

impl Identities {
    /// Fresh labels `0..length`, one integer per row.
    pub fn new_arange(length: usize) -> Self {
        Self {
            fieldloc: Vec::new(),
            width: 1,
            buffer: Buffer::from_iter(0..length as i64),
        }
    }

    /// Construct from a row-major buffer of `width` labels per row.
    pub fn try_new(
        fieldloc: Vec<(i64, String)>,
        width: usize,
        buffer: Buffer<i64>,
    ) -> RaggedResult<Self> {
        if width == 0 {
            ragged_bail!("identities must label rows with at least one integer");
        }
        if buffer.len() % width != 0 {
            ragged_bail!(
                "identities buffer of {} labels is not a whole number of rows of width {}",
                buffer.len(),
                width
            );
        }
        Ok(Self {
            fieldloc,
            width,
            buffer,
        })
    }

    /// The number of labelled rows.
    pub fn len(&self) -> usize {
        self.buffer.len() / self.width
    }

    /// Whether no rows are labelled.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Labels per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The field path fragments.
    pub fn fieldloc(&self) -> &[(i64, String)] {
        &self.fieldloc
    }

    /// The labels of row `i`.
    pub fn row(&self, i: usize) -> &[i64] {
        &self.buffer.as_slice()[i * self.width..(i + 1) * self.width]
    }

    /// Zero-copy window of rows `start..stop`.
    pub fn range(&self, start: usize, stop: usize) -> Self {
        Self {
            fieldloc: self.fieldloc.clone(),
            width: self.width,
            buffer: self.buffer.slice(start * self.width..stop * self.width),
        }
    }

    /// Gather rows through an index, checking bounds.
    pub fn carry(&self, carry: &[i64]) -> RaggedResult<Self> {
        let len = self.len() as i64;
        let mut out = BufferMut::<i64>::with_capacity(carry.len() * self.width);
        for (i, &k) in carry.iter().enumerate() {
            if k < 0 || k >= len {
                ragged_bail!(
                    ValidityError: "identities carry index {} out of range for {} rows at i={}",
                    k,
                    len,
                    i
                );
            }
            out.extend_from_slice(self.row(k as usize));
        }
        Ok(Self {
            fieldloc: self.fieldloc.clone(),
            width: self.width,
            buffer: out.freeze(),
        })
    }

    /// A copy of self with a different field path.
    pub fn with_fieldloc(&self, fieldloc: Vec<(i64, String)>) -> Self {
        Self {
            fieldloc,
            width: self.width,
            buffer: self.buffer.clone(),
        }
    }

    /// A deep copy whose buffer no longer shares the original block.
    pub fn deep_copy(&self) -> Self {
        Self {
            fieldloc: self.fieldloc.clone(),
            width: self.width,
            buffer: Buffer::copy_from(self.buffer.as_slice()),
        }
    }
}

/// Narrow an optional identities handle to a row window.
pub fn range_identities(
    identities: Option<&IdentitiesRef>,
    start: usize,
    stop: usize,
) -> Option<IdentitiesRef> {
    identities.map(|ids| Arc::new(ids.range(start, stop)))
}

/// Gather an optional identities handle through an index.
pub fn carry_identities(
    identities: Option<&IdentitiesRef>,
    carry: &[i64],
) -> RaggedResult<Option<IdentitiesRef>> {
    identities
        .map(|ids| ids.carry(carry).map(Arc::new))
        .transpose()
}

#[cfg(test)]
mod test {
    use super::Identities;

    #[test]
    fn arange_rows() {
        let ids = Identities::new_arange(4);
        assert_eq!(ids.len(), 4);
        assert_eq!(ids.row(2), &[2]);
    }

    #[test]
    fn range_then_carry() {
        let ids = Identities::new_arange(5).range(1, 4);
        assert_eq!(ids.len(), 3);
        let carried = ids.carry(&[2, 0]).unwrap();
        assert_eq!(carried.row(0), &[3]);
        assert_eq!(carried.row(1), &[1]);
        assert!(ids.carry(&[3]).is_err());
    }
}
