use ragged_buffer::Buffer;
use ragged_error::{RaggedResult, ragged_bail};

use crate::contents::{ContentRef, IndexedOptionArray, IntoContent, scalar_i64};
use crate::identities::IdentitiesRef;
use crate::kernels;
use crate::parameters::Parameters;
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// A logically option-typed wrapper in which every row is present.
#[derive(Clone, Debug, PartialEq)]
pub struct UnmaskedArray {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    content: ContentRef,
}

impl UnmaskedArray {
    /// Wrap a content without masking anything out.
    pub fn new(content: ContentRef) -> Self {
        Self {
            identities: None,
            parameters: Parameters::new(),
            content,
        }
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// The wrapped content.
    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    /// The all-present equivalent of this wrapper.
    pub fn project(&self) -> ContentRef {
        self.content.clone()
    }

    /// The is-missing byte mask: all zeros.
    pub fn bytemask(&self) -> Buffer<i8> {
        Buffer::full(0, self.length())
    }

    /// Rewrite as an explicit 64-bit option index over the content.
    pub fn to_indexed_option64(&self) -> IndexedOptionArray<i64> {
        IndexedOptionArray::new(kernels::carry_arange(self.length()), self.content.clone())
            .with_parameters(self.parameters.clone())
            .with_identities(self.identities.clone())
    }

    /// Collapse with the content when the content is itself an option or
    /// gather wrapper.
    pub fn simplify_optiontype(&self) -> RaggedResult<ContentRef> {
        if self.content.is_indexed_or_option() {
            Ok(self.content.clone())
        } else {
            Ok(self.clone().into_ref())
        }
    }

    pub(crate) fn classname(&self) -> &'static str {
        "UnmaskedArray"
    }

    pub(crate) fn length(&self) -> usize {
        self.content.length()
    }

    pub(crate) fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub(crate) fn identities(&self) -> Option<&IdentitiesRef> {
        self.identities.as_ref()
    }

    pub(crate) fn with_identities(&self, identities: Option<IdentitiesRef>) -> Self {
        Self {
            identities,
            parameters: self.parameters.clone(),
            content: self.content.clone(),
        }
    }

    fn rewrap(&self, content: ContentRef) -> Self {
        Self {
            identities: None,
            parameters: Parameters::new(),
            content,
        }
    }

    pub(crate) fn deep_copy(
        &self,
        copyarrays: bool,
        copyindexes: bool,
        copyidentities: bool,
    ) -> ContentRef {
        let identities = if copyidentities {
            self.identities
                .as_ref()
                .map(|ids| std::sync::Arc::new(ids.deep_copy()))
        } else {
            self.identities.clone()
        };
        Self {
            identities,
            parameters: self.parameters.clone(),
            content: self.content.deep_copy(copyarrays, copyindexes, copyidentities),
        }
        .into_ref()
    }

    pub(crate) fn getitem_at_nowrap(&self, at: usize) -> RaggedResult<ContentRef> {
        self.content.getitem_at_nowrap(at)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        let out = self
            .rewrap(self.content.getitem_range_nowrap(start, stop)?)
            .with_parameters(self.parameters.clone());
        Ok(out
            .with_identities(crate::identities::range_identities(
                self.identities.as_ref(),
                start,
                stop,
            ))
            .into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        Ok(self.rewrap(self.content.getitem_field(key)?).into_ref())
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        Ok(self.rewrap(self.content.getitem_fields(keys)?).into_ref())
    }

    pub(crate) fn getitem_next(
        &self,
        head: &SliceItem,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        let out = self.content.getitem_next(Some(head), tail, advanced)?;
        self.rewrap(out)
            .with_parameters(self.parameters.clone())
            .simplify_optiontype()
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        let out = self
            .content
            .getitem_next_jagged(slicestarts, slicestops, item, tail)?;
        self.rewrap(out).simplify_optiontype()
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        let identities = crate::identities::carry_identities(self.identities.as_ref(), carry)?;
        Ok(self
            .rewrap(self.content.carry(carry)?)
            .with_parameters(self.parameters.clone())
            .with_identities(identities)
            .into_ref())
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            Ok(scalar_i64(self.length() as i64))
        } else {
            Ok(self.rewrap(self.content.num_depth(axis, depth)?).into_ref())
        }
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        if axis == depth {
            ragged_bail!("axis=0 not allowed for flatten");
        }
        let (offsets, flattened) = self.content.offsets_and_flattened_depth(axis, depth)?;
        if offsets.is_empty() {
            Ok((offsets, self.rewrap(flattened).into_ref()))
        } else {
            Ok((offsets, flattened))
        }
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        self.to_indexed_option64().into_content().merge(other)
    }

    pub(crate) fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        self.content.fillna(value)
    }

    pub(crate) fn is_none(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            Ok(crate::contents::is_none_axis0(self.length()))
        } else {
            Ok(self.rewrap(self.content.is_none_depth(axis, depth)?).into_ref())
        }
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
        self.rewrap(self.content.rpad_depth(target, axis, depth, clip)?)
            .with_parameters(self.parameters.clone())
            .simplify_optiontype()
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            Ok(crate::contents::localindex_axis0(self.length()))
        } else {
            Ok(self
                .rewrap(self.content.localindex_depth(axis, depth)?)
                .into_ref())
        }
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
        Ok(self
            .rewrap(self.content.combinations_depth(
                n,
                replacement,
                recordlookup,
                parameters,
                axis,
                depth,
            )?)
            .into_ref())
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        self.content.validityerror(&format!("{}.content", path))
    }

    pub(crate) fn minmax_depth(&self) -> (i64, i64) {
        self.content.minmax_depth()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.content.keys()
    }

    pub(crate) fn tojson_row(&self, row: usize, sink: &mut dyn JsonSink) -> RaggedResult<()> {
        self.content.tojson_row(row, sink)
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        self.content.asslice()
    }
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use crate::contents::{Content, IndexedOptionArray, IntoContent, PrimitiveArray, UnmaskedArray};

    #[test]
    fn simplify_collapses_option_content() {
        let inner = IndexedOptionArray::new(
            buffer![0i64, -1, 1],
            PrimitiveArray::new(buffer![9i64, 10]).into_ref(),
        );
        let unmasked = UnmaskedArray::new(inner.into_ref());
        let simplified = unmasked.simplify_optiontype().unwrap();
        assert!(matches!(simplified.as_ref(), Content::IndexedOption64(_)));
    }

    #[test]
    fn simplify_keeps_plain_content() {
        let unmasked = UnmaskedArray::new(PrimitiveArray::new(buffer![7i64, 8]).into_ref());
        let simplified = unmasked.simplify_optiontype().unwrap();
        assert!(matches!(simplified.as_ref(), Content::Unmasked(_)));
    }
}
