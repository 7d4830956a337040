use ragged_buffer::Buffer;
use ragged_error::{RaggedResult, ragged_bail};

use crate::contents::{ContentRef, IntoContent, scalar_i64};
use crate::identities::IdentitiesRef;
use crate::parameters::Parameters;
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// A typeless, length-zero array. Merges into anything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmptyArray {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
}

impl EmptyArray {
    /// A fresh empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub(crate) fn classname(&self) -> &'static str {
        "EmptyArray"
    }

    pub(crate) fn length(&self) -> usize {
        0
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
        }
    }

    pub(crate) fn deep_copy(&self, _: bool, _: bool, copyidentities: bool) -> ContentRef {
        let identities = if copyidentities {
            self.identities
                .as_ref()
                .map(|ids| std::sync::Arc::new(ids.deep_copy()))
        } else {
            self.identities.clone()
        };
        self.with_identities(identities).into_ref()
    }

    pub(crate) fn getitem_at_nowrap(&self, _at: usize) -> RaggedResult<ContentRef> {
        ragged_bail!(ValidityError: "in EmptyArray: array is empty");
    }

    pub(crate) fn getitem_range_nowrap(&self, _start: usize, _stop: usize) -> RaggedResult<ContentRef> {
        Ok(self.clone().into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        ragged_bail!("cannot slice EmptyArray by field name {:?}", key);
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        ragged_bail!("cannot slice EmptyArray by field names {:?}", keys);
    }

    pub(crate) fn getitem_next(
        &self,
        head: &SliceItem,
        _tail: &Slice,
        _advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        match head {
            SliceItem::Range { .. } => Ok(self.clone().into_ref()),
            SliceItem::Array { index, .. } if index.is_empty() => Ok(self.clone().into_ref()),
            _ => ragged_bail!(ValidityError: "in EmptyArray: array is empty"),
        }
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        _slicestops: &Buffer<i64>,
        _item: &SliceItem,
        _tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        if slicestarts.is_empty() {
            Ok(self.clone().into_ref())
        } else {
            ragged_bail!(ValidityError: "in EmptyArray: array is empty");
        }
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        if carry.is_empty() {
            Ok(self.clone().into_ref())
        } else {
            ragged_bail!(ValidityError: "in EmptyArray: index out of range");
        }
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            Ok(scalar_i64(0))
        } else {
            ragged_bail!("'axis' out of range for 'num'");
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
        Ok((Buffer::empty(), self.clone().into_ref()))
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        Ok(other.clone())
    }

    pub(crate) fn fillna(&self, _value: &ContentRef) -> RaggedResult<ContentRef> {
        Ok(self.clone().into_ref())
    }

    pub(crate) fn is_none(&self, _axis: i64, _depth: i64) -> RaggedResult<ContentRef> {
        Ok(crate::contents::is_none_axis0(0))
    }

    pub(crate) fn rpad(
        &self,
        target: i64,
        _axis: i64,
        _depth: i64,
        clip: bool,
    ) -> RaggedResult<ContentRef> {
        crate::contents::rpad_axis0(&self.clone().into_content(), target, clip)
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            Ok(crate::contents::localindex_axis0(0))
        } else {
            ragged_bail!("'axis' out of range for 'localindex'");
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
            crate::contents::combinations_axis0(
                &self.clone().into_content(),
                n,
                replacement,
                recordlookup,
                parameters,
            )
        } else {
            ragged_bail!("'axis' out of range for 'combinations'");
        }
    }

    pub(crate) fn validityerror(&self, _path: &str) -> Option<String> {
        None
    }

    pub(crate) fn minmax_depth(&self) -> (i64, i64) {
        (1, 1)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    pub(crate) fn tojson_row(&self, _row: usize, _sink: &mut dyn JsonSink) -> RaggedResult<()> {
        ragged_bail!(Internal: "EmptyArray has no rows to emit");
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        Ok(SliceItem::array(Buffer::<i64>::empty()))
    }
}

#[cfg(test)]
mod test {
    use crate::contents::{Content, EmptyArray, IntoContent, PrimitiveArray};

    #[test]
    fn empty_is_identity_for_merge() {
        let empty = EmptyArray::new().into_content();
        let other = PrimitiveArray::new(ragged_buffer::buffer![1i64, 2]).into_ref();
        let merged = empty.merge(&other).unwrap();
        assert_eq!(merged.as_ref(), other.as_ref());
        let merged = other.merge(&EmptyArray::new().into_ref()).unwrap();
        assert_eq!(merged.as_ref(), other.as_ref());
    }

    #[test]
    fn empty_mergeable_with_anything() {
        let empty = EmptyArray::new().into_content();
        let other = PrimitiveArray::new(ragged_buffer::buffer![1.5f64]).into_content();
        assert!(empty.mergeable(&other, false));
        assert!(other.mergeable(&empty, false));
        assert!(matches!(empty.merge(&other.shallow_copy()).unwrap().as_ref(), Content::Primitive(_)));
    }
}
