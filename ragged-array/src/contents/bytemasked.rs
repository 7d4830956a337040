use ragged_buffer::{Buffer, BufferMut};
use ragged_error::{RaggedResult, ragged_bail};

use crate::contents::{ContentRef, IndexedOptionArray, IntoContent, scalar_i64};
use crate::identities::IdentitiesRef;
use crate::kernels;
use crate::parameters::Parameters;
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// One validity byte per row: row `i` is missing iff
/// `(mask[i] != 0) != valid_when`.
#[derive(Clone, Debug, PartialEq)]
pub struct ByteMaskedArray {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    mask: Buffer<i8>,
    content: ContentRef,
    valid_when: bool,
}

impl ByteMaskedArray {
    /// Mask rows of an aligned content.
    pub fn new(mask: Buffer<i8>, content: ContentRef, valid_when: bool) -> Self {
        Self {
            identities: None,
            parameters: Parameters::new(),
            mask,
            content,
            valid_when,
        }
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Attach identities.
    pub fn with_identities(&self, identities: Option<IdentitiesRef>) -> Self {
        let mut out = self.clone();
        out.identities = identities;
        out
    }

    /// The raw mask.
    pub fn mask(&self) -> &Buffer<i8> {
        &self.mask
    }

    /// The sense of the mask: whether nonzero means present.
    pub fn valid_when(&self) -> bool {
        self.valid_when
    }

    /// The masked content.
    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    fn is_missing(&self, i: usize) -> bool {
        (self.mask.as_slice()[i] != 0) != self.valid_when
    }

    /// The is-missing byte mask, regardless of `valid_when`.
    pub fn bytemask(&self) -> Buffer<i8> {
        Buffer::from_iter((0..self.length()).map(|i| self.is_missing(i) as i8))
    }

    /// The per-row option index: the row's own position when present, `-1`
    /// when missing.
    pub(crate) fn option_index(&self) -> Buffer<i64> {
        Buffer::from_iter((0..self.length()).map(|i| {
            if self.is_missing(i) { -1 } else { i as i64 }
        }))
    }

    /// The present rows, densely.
    pub fn project(&self) -> RaggedResult<ContentRef> {
        let (nextcarry, _, _) =
            kernels::bytemask_carry_outindex(self.mask.as_slice(), self.valid_when);
        self.content.carry(&nextcarry)
    }

    /// The present rows after intersecting with another is-missing mask.
    pub fn project_with_mask(&self, mask: &Buffer<i8>) -> RaggedResult<ContentRef> {
        if mask.len() != self.length() {
            ragged_bail!(
                "mask of length {} cannot be applied to array of length {}",
                mask.len(),
                self.length()
            );
        }
        let combined = Buffer::from_iter(
            self.bytemask()
                .iter()
                .zip(mask.iter())
                .map(|(&a, &b)| ((a != 0) || (b != 0)) as i8),
        );
        ByteMaskedArray::new(combined, self.content.clone(), false).project()
    }

    /// This mask as an explicit 64-bit option index.
    pub fn to_indexed_option64(&self) -> IndexedOptionArray<i64> {
        IndexedOptionArray::new(self.option_index(), self.content.clone())
            .with_parameters(self.parameters.clone())
            .with_identities(self.identities.clone())
    }

    /// Collapse with the content when the content is itself an option or
    /// gather wrapper.
    pub fn simplify_optiontype(&self) -> RaggedResult<ContentRef> {
        if self.content.is_indexed_or_option() {
            self.to_indexed_option64().simplify_optiontype()
        } else {
            Ok(self.clone().into_ref())
        }
    }

    pub(crate) fn classname(&self) -> &'static str {
        "ByteMaskedArray"
    }

    pub(crate) fn length(&self) -> usize {
        self.mask.len()
    }

    pub(crate) fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub(crate) fn identities(&self) -> Option<&IdentitiesRef> {
        self.identities.as_ref()
    }

    pub(crate) fn deep_copy(
        &self,
        copyarrays: bool,
        copyindexes: bool,
        copyidentities: bool,
    ) -> ContentRef {
        let mut out = self.clone();
        if copyindexes {
            out.mask = Buffer::copy_from(self.mask.as_slice());
        }
        out.content = self.content.deep_copy(copyarrays, copyindexes, copyidentities);
        if copyidentities {
            out.identities = self
                .identities
                .as_ref()
                .map(|ids| std::sync::Arc::new(ids.deep_copy()));
        }
        out.into_ref()
    }

    pub(crate) fn getitem_at_nowrap(&self, at: usize) -> RaggedResult<ContentRef> {
        if self.is_missing(at) {
            let nothing = self.content.getitem_nothing()?;
            return Ok(
                IndexedOptionArray::<i64>::new(ragged_buffer::buffer![-1i64], nothing).into_ref(),
            );
        }
        self.content.getitem_at_nowrap(at)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: crate::identities::range_identities(self.identities.as_ref(), start, stop),
            parameters: self.parameters.clone(),
            mask: self.mask.slice(start..stop),
            content: self.content.getitem_range_nowrap(start, stop)?,
            valid_when: self.valid_when,
        }
        .into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            mask: self.mask.clone(),
            content: self.content.getitem_field(key)?,
            valid_when: self.valid_when,
        }
        .into_ref())
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            mask: self.mask.clone(),
            content: self.content.getitem_fields(keys)?,
            valid_when: self.valid_when,
        }
        .into_ref())
    }

    pub(crate) fn getitem_next(
        &self,
        head: &SliceItem,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        if let SliceItem::Jagged { offsets, item } = head {
            if advanced.is_some() {
                ragged_bail!("cannot mix jagged slices with NumPy-style advanced indexing");
            }
            let rows = offsets.len().saturating_sub(1);
            if rows != self.length() {
                ragged_bail!(
                    "cannot fit jagged slice with length {} into {} of length {}",
                    rows,
                    self.classname(),
                    self.length()
                );
            }
            let slicestarts = offsets.slice(0..rows);
            let slicestops = offsets.slice(1..rows + 1);
            return self.getitem_next_jagged(&slicestarts, &slicestops, item, tail);
        }
        let (nextcarry, outindex, _) =
            kernels::bytemask_carry_outindex(self.mask.as_slice(), self.valid_when);
        let next = self.content.carry(&nextcarry)?;
        let out = next.getitem_next(Some(head), tail, advanced)?;
        IndexedOptionArray::new(outindex, out)
            .with_parameters(self.parameters.clone())
            .into_content()
            .simplify()
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        let (nextcarry, outindex, _) =
            kernels::bytemask_carry_outindex(self.mask.as_slice(), self.valid_when);
        let mut validstarts = BufferMut::<i64>::with_capacity(nextcarry.len());
        let mut validstops = BufferMut::<i64>::with_capacity(nextcarry.len());
        for (i, &o) in outindex.iter().enumerate() {
            if o >= 0 {
                validstarts.push(slicestarts.as_slice()[i]);
                validstops.push(slicestops.as_slice()[i]);
            }
        }
        let next = self.content.carry(&nextcarry)?;
        let out =
            next.getitem_next_jagged(&validstarts.freeze(), &validstops.freeze(), item, tail)?;
        IndexedOptionArray::new(outindex, out)
            .with_parameters(self.parameters.clone())
            .into_content()
            .simplify()
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        let mask = kernels::index_carry(self.mask.as_slice(), carry.as_slice())
            .map_err(|e| crate::contents::kernel_error(self.classname(), e))?;
        let identities = crate::identities::carry_identities(self.identities.as_ref(), carry)?;
        Ok(Self {
            identities,
            parameters: self.parameters.clone(),
            mask,
            content: self.content.carry(carry)?,
            valid_when: self.valid_when,
        }
        .into_ref())
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(scalar_i64(self.length() as i64));
        }
        self.to_indexed_option64().num(axis, depth)
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        self.to_indexed_option64().offsets_and_flattened(axis, depth)
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        self.to_indexed_option64().merge(other)
    }

    pub(crate) fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        self.to_indexed_option64().fillna(value)
    }

    pub(crate) fn is_none(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::is_none_from_mask(
                self.bytemask().iter().map(|&m| m != 0),
            ));
        }
        self.to_indexed_option64().is_none(axis, depth)
    }

    pub(crate) fn rpad(
        &self,
        target: i64,
        axis: i64,
        depth: i64,
        clip: bool,
    ) -> RaggedResult<ContentRef> {
        if axis == depth {
            return crate::contents::rpad_axis0(&self.clone().into_content(), target, clip);
        }
        self.to_indexed_option64().rpad(target, axis, depth, clip)
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::localindex_axis0(self.length()));
        }
        self.to_indexed_option64().localindex(axis, depth)
    }

    pub(crate) fn combinations(
        &self,
        n: i64,
        replacement: bool,
        recordlookup: Option<&Vec<String>>,
        parameters: &Parameters,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<ContentRef> {
        if axis == depth {
            return crate::contents::combinations_axis0(
                &self.clone().into_content(),
                n,
                replacement,
                recordlookup,
                parameters,
            );
        }
        self.to_indexed_option64()
            .combinations(n, replacement, recordlookup, parameters, axis, depth)
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        if self.content.length() < self.mask.len() {
            return Some(format!(
                "at {} ({}): len(content) < len(mask)",
                path,
                self.classname()
            ));
        }
        self.content.validityerror(&format!("{}.content", path))
    }

    pub(crate) fn minmax_depth(&self) -> (i64, i64) {
        self.content.minmax_depth()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.content.keys()
    }

    pub(crate) fn tojson_row(&self, row: usize, sink: &mut dyn JsonSink) -> RaggedResult<()> {
        if self.is_missing(row) {
            sink.null();
            Ok(())
        } else {
            self.content.tojson_row(row, sink)
        }
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        self.to_indexed_option64().asslice()
    }
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use crate::contents::{
        ByteMaskedArray, Content, IndexedOptionArray, IntoContent, PrimitiveArray,
    };

    #[test]
    fn mask_sense_follows_valid_when() {
        let content = PrimitiveArray::new(buffer![1i64, 2, 3]).into_ref();
        let masked =
            ByteMaskedArray::new(buffer![1i8, 0, 1], content.clone(), true).into_content();
        assert_eq!(masked.to_json().unwrap(), serde_json::json!([1, null, 3]));
        let inverted = ByteMaskedArray::new(buffer![1i8, 0, 1], content, false).into_content();
        assert_eq!(inverted.to_json().unwrap(), serde_json::json!([null, 2, null]));
    }

    #[test]
    fn nested_option_collapses_to_one_layer() {
        let inner = IndexedOptionArray::new(
            buffer![0i64, -1, 1],
            PrimitiveArray::new(buffer![9i64, 10]).into_ref(),
        );
        let masked = ByteMaskedArray::new(buffer![1i8, 0, 1], inner.into_ref(), true);
        let simplified = masked.simplify_optiontype().unwrap();
        let Content::IndexedOption64(out) = simplified.as_ref() else {
            panic!("expected a 64-bit option gather");
        };
        // Missing where either layer says missing.
        assert_eq!(out.index().as_slice(), &[0, -1, 1]);
    }

    #[test]
    fn project_drops_missing_rows() {
        let masked = ByteMaskedArray::new(
            buffer![0i8, 1, 0, 1],
            PrimitiveArray::new(buffer![1i64, 2, 3, 4]).into_ref(),
            false,
        );
        let projected = masked.project().unwrap();
        let Content::Primitive(p) = projected.as_ref() else {
            panic!("expected a primitive");
        };
        assert_eq!(p.as_slice::<i64>(), &[1, 3]);
    }
}
