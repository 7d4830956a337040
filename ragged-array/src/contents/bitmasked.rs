use ragged_buffer::{Buffer, ByteBuffer};
use ragged_error::{RaggedResult, ragged_bail};

use crate::contents::{ByteMaskedArray, ContentRef, IndexedOptionArray, IntoContent};
use crate::identities::IdentitiesRef;
use crate::kernels;
use crate::parameters::Parameters;
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// One validity bit per row, packed eight to a byte. `lsb_order` selects
/// whether bit 0 of a byte is the first or the last of its eight rows.
#[derive(Clone, Debug, PartialEq)]
pub struct BitMaskedArray {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    mask: ByteBuffer,
    content: ContentRef,
    valid_when: bool,
    lsb_order: bool,
    length: usize,
}

impl BitMaskedArray {
    /// Mask rows of an aligned content with a packed bitmask.
    pub fn try_new(
        mask: ByteBuffer,
        content: ContentRef,
        valid_when: bool,
        lsb_order: bool,
        length: usize,
    ) -> RaggedResult<Self> {
        if mask.len() * 8 < length {
            ragged_bail!(
                ValidityError: "in BitMaskedArray: bitmask of {} bytes is shorter than length {}",
                mask.len(),
                length
            );
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            mask,
            content,
            valid_when,
            lsb_order,
            length,
        })
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// The packed mask.
    pub fn mask(&self) -> &ByteBuffer {
        &self.mask
    }

    /// The masked content.
    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    /// The sense of the mask: whether a set bit means present.
    pub fn valid_when(&self) -> bool {
        self.valid_when
    }

    /// Whether bit 0 of each byte is its first row.
    pub fn lsb_order(&self) -> bool {
        self.lsb_order
    }

    fn bit(&self, i: usize) -> bool {
        let byte = self.mask.as_slice()[i / 8];
        if self.lsb_order {
            (byte >> (i % 8)) & 1 != 0
        } else {
            (byte >> (7 - i % 8)) & 1 != 0
        }
    }

    fn is_missing(&self, i: usize) -> bool {
        self.bit(i) != self.valid_when
    }

    /// Unpack into one validity byte per row.
    pub fn to_bytemasked(&self) -> ByteMaskedArray {
        let bytes =
            kernels::bitmask_to_bytemask(self.mask.as_slice(), self.lsb_order, self.length);
        ByteMaskedArray::new(bytes, self.content.clone(), self.valid_when)
            .with_parameters(self.parameters.clone())
            .with_identities(self.identities.clone())
    }

    /// The is-missing byte mask.
    pub fn bytemask(&self) -> Buffer<i8> {
        self.to_bytemasked().bytemask()
    }

    /// The present rows, densely.
    pub fn project(&self) -> RaggedResult<ContentRef> {
        self.to_bytemasked().project()
    }

    /// This mask as an explicit 64-bit option index.
    pub fn to_indexed_option64(&self) -> IndexedOptionArray<i64> {
        self.to_bytemasked().to_indexed_option64()
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
        "BitMaskedArray"
    }

    pub(crate) fn length(&self) -> usize {
        self.length
    }

    pub(crate) fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub(crate) fn identities(&self) -> Option<&IdentitiesRef> {
        self.identities.as_ref()
    }

    pub(crate) fn with_identities(&self, identities: Option<IdentitiesRef>) -> Self {
        let mut out = self.clone();
        out.identities = identities;
        out
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
        self.to_bytemasked().getitem_at_nowrap(at)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        self.to_bytemasked().getitem_range_nowrap(start, stop)
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        self.to_bytemasked().getitem_field(key)
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        self.to_bytemasked().getitem_fields(keys)
    }

    pub(crate) fn getitem_next(
        &self,
        head: &SliceItem,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        self.to_bytemasked().getitem_next(head, tail, advanced)
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        self.to_bytemasked()
            .getitem_next_jagged(slicestarts, slicestops, item, tail)
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        self.to_bytemasked().carry(carry)
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        self.to_bytemasked().num(axis, depth)
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        self.to_bytemasked().offsets_and_flattened(axis, depth)
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        self.to_indexed_option64().merge(other)
    }

    pub(crate) fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        self.to_indexed_option64().fillna(value)
    }

    pub(crate) fn is_none(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        self.to_bytemasked().is_none(axis, depth)
    }

    pub(crate) fn rpad(
        &self,
        target: i64,
        axis: i64,
        depth: i64,
        clip: bool,
    ) -> RaggedResult<ContentRef> {
        self.to_bytemasked().rpad(target, axis, depth, clip)
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        self.to_bytemasked().localindex(axis, depth)
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
        self.to_bytemasked()
            .combinations(n, replacement, recordlookup, parameters, axis, depth)
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        if self.mask.len() * 8 < self.length {
            return Some(format!(
                "at {} ({}): len(mask) * 8 < length",
                path,
                self.classname()
            ));
        }
        if self.content.length() < self.length {
            return Some(format!(
                "at {} ({}): len(content) < length",
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

    use crate::contents::{BitMaskedArray, IntoContent, PrimitiveArray};

    #[test]
    fn lsb_and_msb_orders_agree_on_meaning() {
        let content = PrimitiveArray::new(buffer![1i64, 2, 3, 4]).into_ref();
        // rows 0 and 2 valid
        let lsb = BitMaskedArray::try_new(buffer![0b0000_0101u8], content.clone(), true, true, 4)
            .unwrap()
            .into_content();
        assert_eq!(lsb.to_json().unwrap(), serde_json::json!([1, null, 3, null]));
        let msb = BitMaskedArray::try_new(buffer![0b1010_0000u8], content, true, false, 4)
            .unwrap()
            .into_content();
        assert_eq!(msb.to_json().unwrap(), serde_json::json!([1, null, 3, null]));
    }

    #[test]
    fn bitmask_must_cover_length() {
        let content = PrimitiveArray::new(buffer![1i64; 9]).into_ref();
        assert!(BitMaskedArray::try_new(buffer![0u8], content, true, true, 9).is_err());
    }
}
