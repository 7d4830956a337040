use ragged_buffer::{Buffer, BufferMut};
use ragged_error::{RaggedResult, ragged_bail};

use crate::contents::list::merge_list_parts;
use crate::contents::{
    ContentRef, IntoContent, ListArray, PrimitiveArray, kernel_error, scalar_i64, widen_index,
};
use crate::identities::IdentitiesRef;
use crate::kernels;
use crate::parameters::Parameters;
use crate::ptype::{IndexPType, PType};
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// Variable-length lists whose row `i` is `content[offsets[i]..offsets[i+1])`;
/// the offsets are monotone non-decreasing.
#[derive(Clone, Debug, PartialEq)]
pub struct ListOffsetArray<O: IndexPType> {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    offsets: Buffer<O>,
    content: ContentRef,
}

impl<O: IndexPType> ListOffsetArray<O>
where
    Self: IntoContent,
    ListArray<O>: IntoContent,
{
    /// Lists over contiguous row boundaries.
    pub fn try_new(offsets: Buffer<O>, content: ContentRef) -> RaggedResult<Self> {
        if offsets.is_empty() {
            ragged_bail!("offsets must have at least one element, [0] for an empty list");
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            offsets,
            content,
        })
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// The row boundaries.
    pub fn offsets(&self) -> &Buffer<O> {
        &self.offsets
    }

    /// The list payload.
    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    /// The starts view of the boundaries.
    pub fn starts(&self) -> Buffer<O> {
        self.offsets.slice(0..self.offsets.len() - 1)
    }

    /// The stops view of the boundaries.
    pub fn stops(&self) -> Buffer<O> {
        self.offsets.slice(1..self.offsets.len())
    }

    fn as_list(&self) -> ListArray<O> {
        ListArray::from_parts(
            self.identities.clone(),
            self.parameters.clone(),
            self.starts(),
            self.stops(),
            self.content.clone(),
        )
    }

    fn offset_at(&self, i: usize) -> i64 {
        num_traits::AsPrimitive::<i64>::as_(self.offsets.as_slice()[i])
    }

    /// Rewrite with 64-bit offsets anchored at zero, trimming the content
    /// to the covered window.
    pub fn to_listoffset64(&self) -> RaggedResult<ListOffsetArray<i64>> {
        let first = self.offset_at(0);
        let last = self.offset_at(self.offsets.len() - 1);
        if first < 0 || last < first || last as usize > self.content.length() {
            ragged_bail!(
                ValidityError: "in {}: offsets cover [{}, {}) outside the content",
                self.classname(),
                first,
                last
            );
        }
        let offsets = Buffer::from_iter(
            self.offsets
                .iter()
                .map(|&o| num_traits::AsPrimitive::<i64>::as_(o) - first),
        );
        let content = self
            .content
            .getitem_range_nowrap(first as usize, last as usize)?;
        Ok(ListOffsetArray::<i64>::try_new(offsets, content)?
            .with_parameters(self.parameters.clone())
            .with_identities(self.identities.clone()))
    }

    pub(crate) fn classname(&self) -> &'static str {
        match O::PTYPE {
            PType::I32 => "ListOffsetArray32",
            PType::U32 => "ListOffsetArrayU32",
            _ => "ListOffsetArray64",
        }
    }

    pub(crate) fn length(&self) -> usize {
        self.offsets.len() - 1
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
            out.offsets = Buffer::copy_from(self.offsets.as_slice());
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
        let start = self.offset_at(at);
        let stop = self.offset_at(at + 1);
        if start < 0 || stop < start || stop as usize > self.content.length() {
            ragged_bail!(
                ValidityError: "in {}: row window [{}, {}) is malformed at i={}",
                self.classname(),
                start,
                stop,
                at
            );
        }
        self.content
            .getitem_range_nowrap(start as usize, stop as usize)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: crate::identities::range_identities(self.identities.as_ref(), start, stop),
            parameters: self.parameters.clone(),
            offsets: self.offsets.slice(start..stop + 1),
            content: self.content.clone(),
        }
        .into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            offsets: self.offsets.clone(),
            content: self.content.getitem_field(key)?,
        }
        .into_ref())
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            offsets: self.offsets.clone(),
            content: self.content.getitem_fields(keys)?,
        }
        .into_ref())
    }

    pub(crate) fn getitem_next(
        &self,
        head: &SliceItem,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        self.as_list().getitem_next(head, tail, advanced)
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        self.as_list()
            .getitem_next_jagged(slicestarts, slicestops, item, tail)
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        self.as_list().carry(carry)
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(scalar_i64(self.length() as i64));
        }
        if axis == depth + 1 {
            let counts = Buffer::from_iter(
                (0..self.length()).map(|i| self.offset_at(i + 1) - self.offset_at(i)),
            );
            return Ok(PrimitiveArray::from_i64(counts).into_ref());
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            offsets: self.offsets.clone(),
            content: self.content.num_depth(axis, depth + 1)?,
        }
        .into_ref())
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        if axis == depth {
            ragged_bail!("axis=0 not allowed for flatten");
        }
        if axis == depth + 1 {
            let compact = self.to_listoffset64()?;
            let offsets = compact.offsets().clone();
            let content = compact.content().clone();
            return Ok((offsets, content));
        }
        let (inneroffsets, flattened) =
            self.content.offsets_and_flattened_depth(axis, depth + 1)?;
        if inneroffsets.is_empty() {
            Ok((
                Buffer::empty(),
                Self {
                    identities: None,
                    parameters: Parameters::new(),
                    offsets: self.offsets.clone(),
                    content: flattened,
                }
                .into_ref(),
            ))
        } else {
            let own = widen_index(&self.offsets);
            let tooffsets = kernels::flatten_offsets(own.as_slice(), inneroffsets.as_slice())
                .map_err(|e| kernel_error(self.classname(), e))?;
            Ok((
                Buffer::empty(),
                ListOffsetArray::<i64>::try_new(tooffsets, flattened)?.into_ref(),
            ))
        }
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let mystarts = widen_index(&self.starts());
        let mystops = widen_index(&self.stops());
        merge_list_parts(
            (&mystarts, &mystops, &self.content),
            other,
            self.classname(),
        )
    }

    pub(crate) fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            offsets: self.offsets.clone(),
            content: self.content.fillna(value)?,
        }
        .into_ref())
    }

    pub(crate) fn is_none(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::is_none_axis0(self.length()));
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            offsets: self.offsets.clone(),
            content: self.content.is_none_depth(axis, depth + 1)?,
        }
        .into_ref())
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
        if axis == depth + 1 {
            return self.as_list().rpad(target, axis, depth, clip);
        }
        Ok(Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            offsets: self.offsets.clone(),
            content: self.content.rpad_depth(target, axis, depth + 1, clip)?,
        }
        .into_ref())
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::localindex_axis0(self.length()));
        }
        if axis == depth + 1 {
            let mut offsets = BufferMut::<i64>::with_capacity(self.length() + 1);
            let mut values = BufferMut::<i64>::empty();
            offsets.push(0);
            let mut total = 0i64;
            for i in 0..self.length() {
                let count = self.offset_at(i + 1) - self.offset_at(i);
                for k in 0..count {
                    values.push(k);
                }
                total += count;
                offsets.push(total);
            }
            let content = PrimitiveArray::from_i64(values.freeze()).into_ref();
            return Ok(ListOffsetArray::<i64>::try_new(offsets.freeze(), content)?.into_ref());
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            offsets: self.offsets.clone(),
            content: self.content.localindex_depth(axis, depth + 1)?,
        }
        .into_ref())
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
        self.as_list()
            .combinations(n, replacement, recordlookup, parameters, axis, depth)
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        let contentlen = self.content.length() as i64;
        if self.offset_at(0) < 0 {
            return Some(format!(
                "at {} ({}): offsets[0] < 0",
                path,
                self.classname()
            ));
        }
        for i in 0..self.length() {
            if self.offset_at(i + 1) < self.offset_at(i) {
                return Some(format!(
                    "at {} ({}): offsets[i+1] < offsets[i] at i={}",
                    path,
                    self.classname(),
                    i
                ));
            }
        }
        if self.offset_at(self.offsets.len() - 1) > contentlen {
            return Some(format!(
                "at {} ({}): offsets[-1] > len(content)",
                path,
                self.classname()
            ));
        }
        self.content.validityerror(&format!("{}.content", path))
    }

    pub(crate) fn minmax_depth(&self) -> (i64, i64) {
        let (min, max) = self.content.minmax_depth();
        (min + 1, max + 1)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.content.keys()
    }

    pub(crate) fn tojson_row(&self, row: usize, sink: &mut dyn JsonSink) -> RaggedResult<()> {
        let start = self.offset_at(row);
        let stop = self.offset_at(row + 1);
        sink.begin_list();
        for k in start..stop {
            self.content.tojson_row(k as usize, sink)?;
        }
        sink.end_list();
        Ok(())
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        let compact = self.to_listoffset64()?;
        let item = compact.content().asslice()?;
        Ok(SliceItem::Jagged {
            offsets: compact.offsets().clone(),
            item: Box::new(item),
        })
    }
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use crate::contents::{Content, IntoContent, ListOffsetArray, PrimitiveArray};

    fn ragged() -> Content {
        // [[1.1, 2.2], [], [3.3, 4.4, 5.5]]
        ListOffsetArray::try_new(
            buffer![0i32, 2, 2, 5],
            PrimitiveArray::new(buffer![1.1f64, 2.2, 3.3, 4.4, 5.5]).into_ref(),
        )
        .unwrap()
        .into_content()
    }

    #[test]
    fn offsets_need_not_start_at_zero() {
        let array = ListOffsetArray::try_new(
            buffer![2i64, 4, 5],
            PrimitiveArray::new(buffer![9i64, 9, 1, 2, 3]).into_ref(),
        )
        .unwrap();
        assert_eq!(array.length(), 2);
        let compact = array.to_listoffset64().unwrap();
        assert_eq!(compact.offsets().as_slice(), &[0, 2, 3]);
        assert_eq!(compact.content().length(), 3);
    }

    #[test]
    fn flatten_removes_the_list_axis() {
        let (offsets, flat) = ragged().offsets_and_flattened(1).unwrap();
        assert_eq!(offsets.as_slice(), &[0, 2, 2, 5]);
        assert_eq!(flat.length(), 5);
    }

    #[test]
    fn flatten_axis0_is_rejected() {
        assert!(ragged().flatten(0).is_err());
    }

    #[test]
    fn merge_concatenates_rows() {
        let left = ragged();
        let right = ragged().shallow_copy();
        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.length(), 6);
        assert_eq!(
            merged.to_json().unwrap(),
            serde_json::json!([
                [1.1, 2.2], [], [3.3, 4.4, 5.5],
                [1.1, 2.2], [], [3.3, 4.4, 5.5]
            ])
        );
    }

    #[test]
    fn monotonicity_is_checked() {
        let array = ListOffsetArray::try_new(
            buffer![0i64, 3, 2],
            PrimitiveArray::new(buffer![1i64, 2, 3]).into_ref(),
        )
        .unwrap()
        .into_content();
        let err = array.validityerror("layout").unwrap();
        assert!(err.contains("offsets[i+1] < offsets[i]"), "{}", err);
    }
}
