//! The node variants and the recursive operations over them.
//!
//! A [`Content`] is a tree of typed nodes backed by flat buffers. Children
//! are shared by reference ([`ContentRef`]); every transformation returns a
//! new tree and shares buffers with its input wherever a zero-copy window
//! suffices.

use std::sync::Arc;

use ragged_buffer::Buffer;
use ragged_error::{RaggedError, RaggedResult, ragged_bail, ragged_err};

use crate::identities::IdentitiesRef;
use crate::kernels::{self, KernelError};
use crate::parameters::Parameters;
use crate::ptype::IndexPType;
use crate::slice::{Slice, SliceItem};
use crate::tojson::{JsonBuilder, JsonSink};

mod bitmasked;
mod bytemasked;
mod empty;
mod indexed;
mod list;
mod listoffset;
mod primitive;
mod record;
mod regular;
mod union;
mod unmasked;

pub use bitmasked::BitMaskedArray;
pub use bytemasked::ByteMaskedArray;
pub use empty::EmptyArray;
pub use indexed::{IndexedArray, IndexedOptionArray};
pub use list::ListArray;
pub use listoffset::ListOffsetArray;
pub use primitive::PrimitiveArray;
pub use record::RecordArray;
pub use regular::RegularArray;
pub use union::{MAX_UNION_ARMS, UnionArray};
pub use unmasked::UnmaskedArray;

/// A shared handle to a node.
pub type ContentRef = Arc<Content>;

/// The closed sum of node variants.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// A typeless, length-zero array.
    Empty(EmptyArray),
    /// A dense primitive leaf.
    Primitive(PrimitiveArray),
    /// Fixed-size lists.
    Regular(RegularArray),
    /// Variable-length lists addressed by independent starts/stops.
    List32(ListArray<i32>),
    /// Variable-length lists addressed by independent starts/stops.
    ListU32(ListArray<u32>),
    /// Variable-length lists addressed by independent starts/stops.
    List64(ListArray<i64>),
    /// Variable-length lists addressed by monotone offsets.
    ListOffset32(ListOffsetArray<i32>),
    /// Variable-length lists addressed by monotone offsets.
    ListOffsetU32(ListOffsetArray<u32>),
    /// Variable-length lists addressed by monotone offsets.
    ListOffset64(ListOffsetArray<i64>),
    /// A lazy gather.
    Indexed32(IndexedArray<i32>),
    /// A lazy gather.
    IndexedU32(IndexedArray<u32>),
    /// A lazy gather.
    Indexed64(IndexedArray<i64>),
    /// A lazy gather with negative positions denoting missing rows.
    IndexedOption32(IndexedOptionArray<i32>),
    /// A lazy gather with negative positions denoting missing rows.
    IndexedOption64(IndexedOptionArray<i64>),
    /// One validity byte per row.
    ByteMasked(ByteMaskedArray),
    /// One validity bit per row.
    BitMasked(BitMaskedArray),
    /// Option-typed in principle, all rows present.
    Unmasked(UnmaskedArray),
    /// A struct-of-arrays of named or positional fields.
    Record(RecordArray),
    /// A tagged choice among several content arrays.
    Union32(UnionArray<i32>),
    /// A tagged choice among several content arrays.
    UnionU32(UnionArray<u32>),
    /// A tagged choice among several content arrays.
    Union64(UnionArray<i64>),
}

macro_rules! match_each_content {
    ($self:expr, |$array:ident| $($body:tt)*) => {
        match $self {
            Content::Empty($array) => { $($body)* }
            Content::Primitive($array) => { $($body)* }
            Content::Regular($array) => { $($body)* }
            Content::List32($array) => { $($body)* }
            Content::ListU32($array) => { $($body)* }
            Content::List64($array) => { $($body)* }
            Content::ListOffset32($array) => { $($body)* }
            Content::ListOffsetU32($array) => { $($body)* }
            Content::ListOffset64($array) => { $($body)* }
            Content::Indexed32($array) => { $($body)* }
            Content::IndexedU32($array) => { $($body)* }
            Content::Indexed64($array) => { $($body)* }
            Content::IndexedOption32($array) => { $($body)* }
            Content::IndexedOption64($array) => { $($body)* }
            Content::ByteMasked($array) => { $($body)* }
            Content::BitMasked($array) => { $($body)* }
            Content::Unmasked($array) => { $($body)* }
            Content::Record($array) => { $($body)* }
            Content::Union32($array) => { $($body)* }
            Content::UnionU32($array) => { $($body)* }
            Content::Union64($array) => { $($body)* }
        }
    };
}
pub(crate) use match_each_content;

/// Conversion of a variant struct into the [`Content`] sum.
pub trait IntoContent: Sized {
    /// Wrap self in the matching [`Content`] arm.
    fn into_content(self) -> Content;

    /// Wrap self in a shared [`ContentRef`].
    fn into_ref(self) -> ContentRef {
        Arc::new(self.into_content())
    }
}

macro_rules! into_content {
    ($struct:ty, $arm:ident) => {
        impl IntoContent for $struct {
            fn into_content(self) -> Content {
                Content::$arm(self)
            }
        }
    };
}

into_content!(EmptyArray, Empty);
into_content!(PrimitiveArray, Primitive);
into_content!(RegularArray, Regular);
into_content!(ListArray<i32>, List32);
into_content!(ListArray<u32>, ListU32);
into_content!(ListArray<i64>, List64);
into_content!(ListOffsetArray<i32>, ListOffset32);
into_content!(ListOffsetArray<u32>, ListOffsetU32);
into_content!(ListOffsetArray<i64>, ListOffset64);
into_content!(IndexedArray<i32>, Indexed32);
into_content!(IndexedArray<u32>, IndexedU32);
into_content!(IndexedArray<i64>, Indexed64);
into_content!(IndexedOptionArray<i32>, IndexedOption32);
into_content!(IndexedOptionArray<i64>, IndexedOption64);
into_content!(ByteMaskedArray, ByteMasked);
into_content!(BitMaskedArray, BitMasked);
into_content!(UnmaskedArray, Unmasked);
into_content!(RecordArray, Record);
into_content!(UnionArray<i32>, Union32);
into_content!(UnionArray<u32>, UnionU32);
into_content!(UnionArray<i64>, Union64);

impl IntoContent for Content {
    fn into_content(self) -> Content {
        self
    }
}

/// Attach node context to a kernel failure.
pub(crate) fn kernel_error(classname: &str, err: KernelError) -> RaggedError {
    match err.at {
        Some(at) => ragged_err!(ValidityError: "in {}: {} at i={}", classname, err.message, at),
        None => ragged_err!(ValidityError: "in {}: {}", classname, err.message),
    }
}

/// Widen an index buffer to 64 bits.
pub(crate) fn widen_index<O: IndexPType>(index: &Buffer<O>) -> Buffer<i64> {
    Buffer::from_iter(index.iter().map(|v| {
        let v: i64 = num_traits::AsPrimitive::<i64>::as_(*v);
        v
    }))
}

fn wrap_axis(axis: i64) -> RaggedResult<i64> {
    if axis < 0 {
        ragged_bail!("negative axis is not allowed here");
    }
    Ok(axis)
}

impl Content {
    /// The number of rows.
    pub fn length(&self) -> usize {
        match_each_content!(self, |a| a.length())
    }

    /// Whether the array has no rows.
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// The variant name used in error messages.
    pub fn classname(&self) -> &'static str {
        match_each_content!(self, |a| a.classname())
    }

    /// The node's free-form annotations.
    pub fn parameters(&self) -> &Parameters {
        match_each_content!(self, |a| a.parameters())
    }

    /// The node's provenance labels, if attached.
    pub fn identities(&self) -> Option<&IdentitiesRef> {
        match_each_content!(self, |a| a.identities())
    }

    /// Whether two nodes' parameter maps compare equal.
    pub fn parameters_equal(&self, other: &Content) -> bool {
        self.parameters() == other.parameters()
    }

    /// A copy of self with different provenance labels.
    pub fn with_identities(&self, identities: Option<IdentitiesRef>) -> ContentRef {
        match_each_content!(self, |a| a.with_identities(identities).into_ref())
    }

    /// Attach fresh `0..length` provenance labels.
    pub fn setidentities(&self) -> ContentRef {
        self.with_identities(Some(Arc::new(crate::identities::Identities::new_arange(
            self.length(),
        ))))
    }

    /// A copy sharing all children and buffers.
    pub fn shallow_copy(&self) -> ContentRef {
        self.clone().into_ref()
    }

    /// A copy that optionally severs buffer sharing. `copyarrays` copies
    /// leaf payloads, `copyindexes` copies structural integer buffers, and
    /// `copyidentities` copies provenance labels.
    pub fn deep_copy(
        &self,
        copyarrays: bool,
        copyindexes: bool,
        copyidentities: bool,
    ) -> ContentRef {
        match_each_content!(self, |a| a.deep_copy(
            copyarrays,
            copyindexes,
            copyidentities
        ))
    }

    /// Whether this node is option-typed (it can hold missing rows).
    pub fn is_option_type(&self) -> bool {
        matches!(
            self,
            Content::IndexedOption32(_)
                | Content::IndexedOption64(_)
                | Content::ByteMasked(_)
                | Content::BitMasked(_)
                | Content::Unmasked(_)
        )
    }

    /// Whether this node is an option or plain gather wrapper.
    pub fn is_indexed_or_option(&self) -> bool {
        self.is_option_type()
            || matches!(
                self,
                Content::Indexed32(_) | Content::IndexedU32(_) | Content::Indexed64(_)
            )
    }

    /// Whether this node is a union.
    pub fn is_union_type(&self) -> bool {
        matches!(
            self,
            Content::Union32(_) | Content::UnionU32(_) | Content::Union64(_)
        )
    }

    /// The record field keys reachable through this node. Wrappers pass
    /// through; unions intersect their arms; everything else has none.
    pub fn keys(&self) -> Vec<String> {
        match_each_content!(self, |a| a.keys())
    }

    /// The minimum and maximum nesting depth across the tree.
    pub fn minmax_depth(&self) -> (i64, i64) {
        match_each_content!(self, |a| a.minmax_depth())
    }

    /// View an option or gather wrapper as a 64-bit option index over its
    /// content, with `-1` denoting missing.
    pub(crate) fn to_indexed_option_parts(&self) -> Option<(Buffer<i64>, ContentRef)> {
        match self {
            Content::Indexed32(a) => Some((widen_index(a.index()), a.content().clone())),
            Content::IndexedU32(a) => Some((widen_index(a.index()), a.content().clone())),
            Content::Indexed64(a) => Some((a.index().clone(), a.content().clone())),
            Content::IndexedOption32(a) => Some((widen_index(a.index()), a.content().clone())),
            Content::IndexedOption64(a) => Some((a.index().clone(), a.content().clone())),
            Content::ByteMasked(a) => Some((a.option_index(), a.content().clone())),
            Content::BitMasked(a) => a.to_bytemasked().into_content().to_indexed_option_parts(),
            Content::Unmasked(a) => {
                Some((kernels::carry_arange(a.length()), a.content().clone()))
            }
            _ => None,
        }
    }

    /// Rewrite an option or gather wrapper into an `IndexedOptionArray64`
    /// over the same content, preserving identities and parameters.
    pub fn to_indexed_option64(&self) -> Option<IndexedOptionArray<i64>> {
        let (index, content) = self.to_indexed_option_parts()?;
        Some(
            IndexedOptionArray::new(index, content)
                .with_parameters(self.parameters().clone())
                .with_identities(self.identities().cloned()),
        )
    }

    /// Collapse nested option wrappers and single-arm unions one level.
    pub fn simplify(&self) -> RaggedResult<ContentRef> {
        match self {
            Content::IndexedOption32(a) => a.simplify_optiontype(),
            Content::IndexedOption64(a) => a.simplify_optiontype(),
            Content::Indexed32(a) => a.simplify_optiontype(),
            Content::IndexedU32(a) => a.simplify_optiontype(),
            Content::Indexed64(a) => a.simplify_optiontype(),
            Content::ByteMasked(a) => a.simplify_optiontype(),
            Content::BitMasked(a) => a.simplify_optiontype(),
            Content::Unmasked(a) => a.simplify_optiontype(),
            Content::Union32(a) => a.simplify_uniontype(false),
            Content::UnionU32(a) => a.simplify_uniontype(false),
            Content::Union64(a) => a.simplify_uniontype(false),
            _ => Ok(self.shallow_copy()),
        }
    }

    /// Emit the array into a JSON sink.
    pub fn tojson_part(
        &self,
        sink: &mut dyn JsonSink,
        include_beginendlist: bool,
    ) -> RaggedResult<()> {
        if let Content::Primitive(p) = self {
            if p.ndim() == 0 {
                return p.tojson_row(0, sink);
            }
        }
        if include_beginendlist {
            sink.begin_list();
        }
        for i in 0..self.length() {
            self.tojson_row(i, sink)?;
        }
        if include_beginendlist {
            sink.end_list();
        }
        Ok(())
    }

    pub(crate) fn tojson_row(&self, row: usize, sink: &mut dyn JsonSink) -> RaggedResult<()> {
        match_each_content!(self, |a| a.tojson_row(row, sink))
    }

    /// Render the array as a `serde_json::Value`.
    pub fn to_json(&self) -> RaggedResult<serde_json::Value> {
        let mut builder = JsonBuilder::new();
        self.tojson_part(&mut builder, true)?;
        Ok(builder.into_value())
    }

    /// Convert the array into a slice item, so it can index another array.
    pub fn asslice(&self) -> RaggedResult<SliceItem> {
        match_each_content!(self, |a| a.asslice())
    }

    /// Check every invariant of the tree, returning a human-readable
    /// description of the first violation.
    pub fn validityerror(&self, path: &str) -> Option<String> {
        match_each_content!(self, |a| a.validityerror(path))
    }

    // ------------------------------------------------------------------
    // getitem
    // ------------------------------------------------------------------

    /// Apply a multi-dimensional slice.
    pub fn getitem(&self, slice: &Slice) -> RaggedResult<ContentRef> {
        let next = RegularArray::try_new(self.shallow_copy(), self.length(), 1)?;
        let out = next
            .into_content()
            .getitem_next(slice.head(), &slice.tail(), None)?;
        if out.length() == 0 {
            out.getitem_nothing()
        } else {
            out.getitem_at_nowrap(0)
        }
    }

    /// One row, with negative wrapping.
    pub fn getitem_at(&self, at: i64) -> RaggedResult<ContentRef> {
        let length = self.length() as i64;
        let regular = kernels::regularize_index(at, length)
            .map_err(|e| kernel_error(self.classname(), e))?;
        self.getitem_at_nowrap(regular as usize)
    }

    pub(crate) fn getitem_at_nowrap(&self, at: usize) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.getitem_at_nowrap(at))
    }

    /// A row range, with python regularization.
    pub fn getitem_range(&self, start: Option<i64>, stop: Option<i64>) -> RaggedResult<ContentRef> {
        let (first, _, count) =
            kernels::regularize_range(start, stop, None, self.length() as i64)
                .map_err(|e| kernel_error(self.classname(), e))?;
        self.getitem_range_nowrap(first as usize, (first + count) as usize)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.getitem_range_nowrap(start, stop))
    }

    /// An empty window of the same type.
    pub fn getitem_nothing(&self) -> RaggedResult<ContentRef> {
        self.getitem_range_nowrap(0, 0)
    }

    /// Project one record field.
    pub fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.getitem_field(key))
    }

    /// Project a sub-record.
    pub fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.getitem_fields(keys))
    }

    /// Consume the head of a slice against this node.
    pub(crate) fn getitem_next(
        &self,
        head: Option<&SliceItem>,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        let Some(head) = head else {
            return Ok(self.shallow_copy());
        };
        match head {
            SliceItem::Ellipsis => self.getitem_next_ellipsis(tail, advanced),
            SliceItem::NewAxis => {
                let out = self.getitem_next(tail.head(), &tail.tail(), advanced)?;
                let length = out.length();
                Ok(RegularArray::try_new(out, 1, length)?.into_ref())
            }
            SliceItem::Field(key) => self
                .getitem_field(key)?
                .getitem_next(tail.head(), &tail.tail(), advanced),
            SliceItem::Fields(keys) => self
                .getitem_fields(keys)?
                .getitem_next(tail.head(), &tail.tail(), advanced),
            SliceItem::Missing { index, item } => {
                self.getitem_next_missing(index, item, tail, advanced)
            }
            _ => match_each_content!(self, |a| a.getitem_next(head, tail, advanced)),
        }
    }

    fn getitem_next_ellipsis(
        &self,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        let (mindepth, maxdepth) = self.minmax_depth();
        let dimlength = tail.dimlength();
        if tail.is_empty() || (mindepth - 1 == dimlength && maxdepth - 1 == dimlength) {
            self.getitem_next(tail.head(), &tail.tail(), advanced)
        } else if mindepth - 1 > dimlength {
            let nexttail = tail.prepended(SliceItem::Ellipsis);
            self.getitem_next(Some(&SliceItem::full_range()), &nexttail, advanced)
        } else {
            Err(ragged_err!(
                "ellipsis reaches beyond the depth of this array, or the depth is ambiguous"
            ))
        }
    }

    fn getitem_next_missing(
        &self,
        missingindex: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        if advanced.is_some() {
            ragged_bail!("cannot mix missing values in slice with NumPy-style advanced indexing");
        }
        let tmp = self.getitem_next(Some(item), tail, advanced)?;
        match tmp.as_ref() {
            Content::Regular(raw) => {
                let size = raw.size() as i64;
                let mut outindex =
                    ragged_buffer::BufferMut::<i64>::with_capacity(raw.length() * missingindex.len());
                for i in 0..raw.length() as i64 {
                    for &m in missingindex.iter() {
                        outindex.push(if m < 0 { -1 } else { m + i * size });
                    }
                }
                let content = IndexedOptionArray::new(outindex.freeze(), raw.content().clone())
                    .into_content()
                    .simplify()?;
                Ok(
                    RegularArray::try_new(content, missingindex.len(), raw.length())?
                        .into_ref(),
                )
            }
            Content::Record(record) => {
                let mut contents = Vec::with_capacity(record.contents().len());
                for field in record.contents() {
                    contents.push(
                        IndexedOptionArray::new(missingindex.clone(), field.clone())
                            .into_content()
                            .simplify()?,
                    );
                }
                Ok(RecordArray::try_new(
                    contents,
                    record.recordlookup().cloned(),
                    Some(missingindex.len()),
                )?
                .into_ref())
            }
            _ => IndexedOptionArray::new(missingindex.clone(), tmp)
                .into_content()
                .simplify(),
        }
    }

    /// Apply a jagged slice, already split into per-row windows.
    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.getitem_next_jagged(
            slicestarts,
            slicestops,
            item,
            tail
        ))
    }

    /// Rebuild the fixed-size layers described by an advanced index's shape.
    pub(crate) fn getitem_next_array_wrap(
        out: ContentRef,
        shape: &[i64],
    ) -> RaggedResult<ContentRef> {
        let mut out = out;
        for &size in shape.iter().rev() {
            let size = size as usize;
            let length = if size == 0 { 0 } else { out.length() / size };
            out = RegularArray::try_new(out, size, length)?.into_ref();
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // carry / merge / simplify
    // ------------------------------------------------------------------

    /// Gather rows through a 64-bit index.
    pub fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.carry(carry))
    }

    /// Whether `self.merge(other)` can produce a single node rather than a
    /// union.
    pub fn mergeable(&self, other: &Content, mergebool: bool) -> bool {
        if !self.parameters_equal(other) {
            return false;
        }
        if matches!(self, Content::Empty(_)) || matches!(other, Content::Empty(_)) {
            return true;
        }
        if self.is_union_type() || other.is_union_type() {
            return true;
        }
        if self.is_indexed_or_option() {
            let (_, content) = self
                .to_indexed_option_parts()
                .unwrap_or_else(|| unreachable!("wrapper always has parts"));
            return content.mergeable(other, mergebool);
        }
        if other.is_indexed_or_option() {
            let (_, content) = other
                .to_indexed_option_parts()
                .unwrap_or_else(|| unreachable!("wrapper always has parts"));
            return self.mergeable(&content, mergebool);
        }
        match (self, other) {
            (Content::Primitive(a), Content::Primitive(b)) => a.kind_mergeable(b, mergebool),
            (Content::Record(a), Content::Record(b)) => a.fields_mergeable(b, mergebool),
            (a, b) if a.is_list_like() && b.is_list_like() => {
                match (list_parts(a), list_parts(b)) {
                    (Some((_, _, ac)), Some((_, _, bc))) => ac.mergeable(&bc, mergebool),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    pub(crate) fn is_list_like(&self) -> bool {
        matches!(
            self,
            Content::Regular(_)
                | Content::List32(_)
                | Content::ListU32(_)
                | Content::List64(_)
                | Content::ListOffset32(_)
                | Content::ListOffsetU32(_)
                | Content::ListOffset64(_)
        )
    }

    fn owns_reverse_merge(&self) -> bool {
        self.is_indexed_or_option() || self.is_union_type()
    }

    /// Concatenate `self` then `other`.
    pub fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        if matches!(self, Content::Empty(_)) {
            return Ok(other.clone());
        }
        if !self.parameters_equal(other) {
            return self.merge_as_union(other);
        }
        if matches!(other.as_ref(), Content::Empty(_)) {
            return Ok(self.shallow_copy());
        }
        if other.owns_reverse_merge() && !(self.is_union_type() && other.is_union_type()) {
            return other.reverse_merge(&self.shallow_copy());
        }
        match_each_content!(self, |a| a.merge(other))
    }

    /// Concatenation in which `self` is the right operand; owned by the
    /// gather, option and union variants.
    pub(crate) fn reverse_merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        match self {
            Content::Indexed32(a) => a.reverse_merge(other),
            Content::IndexedU32(a) => a.reverse_merge(other),
            Content::Indexed64(a) => a.reverse_merge(other),
            Content::IndexedOption32(a) => a.reverse_merge(other),
            Content::IndexedOption64(a) => a.reverse_merge(other),
            Content::ByteMasked(_) | Content::BitMasked(_) | Content::Unmasked(_) => self
                .to_indexed_option64()
                .ok_or_else(|| ragged_err!(Internal: "option node without an index view"))?
                .reverse_merge(other),
            Content::Union32(a) => a.reverse_merge(other),
            Content::UnionU32(a) => a.reverse_merge(other),
            Content::Union64(a) => a.reverse_merge(other),
            _ => Err(ragged_err!(
                Internal: "reverse_merge is not owned by {}",
                self.classname()
            )),
        }
    }

    /// Concatenate by wrapping both operands in a fresh two-arm union.
    pub fn merge_as_union(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        log::debug!(
            "merging {} with {} as a union",
            self.classname(),
            other.classname()
        );
        let mylength = self.length();
        let theirlength = other.length();
        let mut tags = ragged_buffer::BufferMut::<i8>::with_capacity(mylength + theirlength);
        let mut index = ragged_buffer::BufferMut::<i64>::with_capacity(mylength + theirlength);
        for i in 0..mylength {
            tags.push(0);
            index.push(i as i64);
        }
        for i in 0..theirlength {
            tags.push(1);
            index.push(i as i64);
        }
        Ok(UnionArray::try_new(
            tags.freeze(),
            index.freeze(),
            vec![self.shallow_copy(), other.clone()],
        )?
        .into_ref())
    }

    // ------------------------------------------------------------------
    // axis-wise operations
    // ------------------------------------------------------------------

    /// The number of elements at `axis`, as an array of counts (or a scalar
    /// count at axis 0).
    pub fn num(&self, axis: i64) -> RaggedResult<ContentRef> {
        let axis = wrap_axis(axis)?;
        self.num_depth(axis, 0)
    }

    pub(crate) fn num_depth(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.num(axis, depth))
    }

    /// Remove one list axis, concatenating its sublists.
    pub fn flatten(&self, axis: i64) -> RaggedResult<ContentRef> {
        Ok(self.offsets_and_flattened(axis)?.1)
    }

    /// Remove one list axis, returning the removed row offsets alongside
    /// the flattened content.
    pub fn offsets_and_flattened(&self, axis: i64) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        let axis = wrap_axis(axis)?;
        self.offsets_and_flattened_depth(axis, 0)
    }

    pub(crate) fn offsets_and_flattened_depth(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        match_each_content!(self, |a| a.offsets_and_flattened(axis, depth))
    }

    /// Replace missing rows with the single row of `value`.
    pub fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.fillna(value))
    }

    /// A boolean array marking the missing rows at `axis`.
    pub fn is_none(&self, axis: i64) -> RaggedResult<ContentRef> {
        let axis = wrap_axis(axis)?;
        self.is_none_depth(axis, 0)
    }

    pub(crate) fn is_none_depth(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.is_none(axis, depth))
    }

    /// Pad the lists at `axis` with missing rows up to at least `target`.
    pub fn rpad(&self, target: i64, axis: i64) -> RaggedResult<ContentRef> {
        let axis = wrap_axis(axis)?;
        self.rpad_depth(target, axis, 0, false)
    }

    /// Pad and truncate the lists at `axis` to exactly `target`.
    pub fn rpad_and_clip(&self, target: i64, axis: i64) -> RaggedResult<ContentRef> {
        let axis = wrap_axis(axis)?;
        self.rpad_depth(target, axis, 0, true)
    }

    pub(crate) fn rpad_depth(
        &self,
        target: i64,
        axis: i64,
        depth: i64,
        clip: bool,
    ) -> RaggedResult<ContentRef> {
        if target < 0 {
            ragged_bail!("pad target must be non-negative, not {}", target);
        }
        match_each_content!(self, |a| a.rpad(target, axis, depth, clip))
    }

    /// Each element's position within its own list at `axis`.
    pub fn localindex(&self, axis: i64) -> RaggedResult<ContentRef> {
        let axis = wrap_axis(axis)?;
        self.localindex_depth(axis, 0)
    }

    pub(crate) fn localindex_depth(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.localindex(axis, depth))
    }

    /// Records of all n-element combinations of the lists at `axis`.
    pub fn combinations(
        &self,
        n: i64,
        replacement: bool,
        recordlookup: Option<&Vec<String>>,
        parameters: &Parameters,
        axis: i64,
    ) -> RaggedResult<ContentRef> {
        if n < 1 {
            ragged_bail!("in combinations, 'n' must be at least 1");
        }
        let axis = wrap_axis(axis)?;
        self.combinations_depth(n, replacement, recordlookup, parameters, axis, 0)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn combinations_depth(
        &self,
        n: i64,
        replacement: bool,
        recordlookup: Option<&Vec<String>>,
        parameters: &Parameters,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<ContentRef> {
        match_each_content!(self, |a| a.combinations(
            n,
            replacement,
            recordlookup,
            parameters,
            axis,
            depth
        ))
    }
}

// ----------------------------------------------------------------------
// shared axis-0 helpers
// ----------------------------------------------------------------------

/// A 0-dimensional integer scalar.
pub(crate) fn scalar_i64(value: i64) -> ContentRef {
    PrimitiveArray::scalar_i64(value).into_ref()
}

/// The whole-array padding of axis 0: existing rows keep their position,
/// the tail is missing.
pub(crate) fn rpad_axis0(content: &Content, target: i64, clip: bool) -> RaggedResult<ContentRef> {
    let length = content.length() as i64;
    if !clip && target < length {
        return Ok(content.shallow_copy());
    }
    let index = kernels::rpad_index_axis0(target, length);
    IndexedOptionArray::new(index, content.shallow_copy())
        .with_parameters(content.parameters().clone())
        .into_content()
        .simplify()
}

/// The whole-array local index of axis 0: `0..length`.
pub(crate) fn localindex_axis0(length: usize) -> ContentRef {
    PrimitiveArray::from_i64(kernels::carry_arange(length)).into_ref()
}

/// The whole-array combinations of axis 0: a record of n parallel gathers.
pub(crate) fn combinations_axis0(
    content: &Content,
    n: i64,
    replacement: bool,
    recordlookup: Option<&Vec<String>>,
    parameters: &Parameters,
) -> RaggedResult<ContentRef> {
    let length = content.length() as i64;
    let (offsets, tocarries) =
        kernels::list_combinations(&[0], &[length], n as usize, replacement);
    let total = offsets.as_slice()[1] as usize;
    let mut contents = Vec::with_capacity(tocarries.len());
    for tocarry in &tocarries {
        contents.push(content.carry(tocarry)?);
    }
    Ok(RecordArray::try_new(contents, recordlookup.cloned(), Some(total))?
        .with_parameters(parameters.clone())
        .into_ref())
}

/// The all-present missing-mask of axis 0: `length` falses.
pub(crate) fn is_none_axis0(length: usize) -> ContentRef {
    PrimitiveArray::from_bool_iter(std::iter::repeat(false).take(length)).into_ref()
}

/// A boolean array from an is-missing byte mask.
pub(crate) fn is_none_from_mask(mask: impl Iterator<Item = bool>) -> ContentRef {
    PrimitiveArray::from_bool_iter(mask).into_ref()
}

/// The starts/stops/content view of any list-like node, widened to 64 bits.
pub(crate) fn list_parts(content: &Content) -> Option<(Buffer<i64>, Buffer<i64>, ContentRef)> {
    match content {
        Content::Regular(a) => {
            let size = a.size() as i64;
            let starts = Buffer::from_iter((0..a.length() as i64).map(|i| i * size));
            let stops = Buffer::from_iter((0..a.length() as i64).map(|i| (i + 1) * size));
            Some((starts, stops, a.content().clone()))
        }
        Content::List32(a) => Some((widen_index(a.starts()), widen_index(a.stops()), a.content().clone())),
        Content::ListU32(a) => Some((widen_index(a.starts()), widen_index(a.stops()), a.content().clone())),
        Content::List64(a) => Some((a.starts().clone(), a.stops().clone(), a.content().clone())),
        Content::ListOffset32(a) => {
            Some((widen_index(&a.starts()), widen_index(&a.stops()), a.content().clone()))
        }
        Content::ListOffsetU32(a) => {
            Some((widen_index(&a.starts()), widen_index(&a.stops()), a.content().clone()))
        }
        Content::ListOffset64(a) => Some((a.starts(), a.stops(), a.content().clone())),
        _ => None,
    }
}

/// The tags/index/arms view of any union node, widened to 64 bits.
pub(crate) fn union_parts(
    content: &Content,
) -> Option<(Buffer<i8>, Buffer<i64>, Vec<ContentRef>)> {
    match content {
        Content::Union32(a) => Some((a.tags().clone(), widen_index(a.index()), a.contents().to_vec())),
        Content::UnionU32(a) => Some((a.tags().clone(), widen_index(a.index()), a.contents().to_vec())),
        Content::Union64(a) => Some((a.tags().clone(), a.index().clone(), a.contents().to_vec())),
        _ => None,
    }
}
