use itertools::Itertools;
use ragged_buffer::{Buffer, BufferMut};
use ragged_error::{RaggedResult, ragged_bail, ragged_err};

use crate::contents::{
    ContentRef, IntoContent, kernel_error, scalar_i64, union_parts,
};
use crate::identities::IdentitiesRef;
use crate::kernels;
use crate::parameters::Parameters;
use crate::ptype::{IndexPType, PType};
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// The maximum number of arms a union can address with 8-bit tags.
pub const MAX_UNION_ARMS: usize = 127;

/// A tagged choice among several content arrays: row `i` is
/// `contents[tags[i]][index[i]]`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnionArray<I: IndexPType> {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    tags: Buffer<i8>,
    index: Buffer<I>,
    contents: Vec<ContentRef>,
}

impl<I: IndexPType> UnionArray<I>
where
    Self: IntoContent,
{
    /// A union over at least one arm.
    pub fn try_new(
        tags: Buffer<i8>,
        index: Buffer<I>,
        contents: Vec<ContentRef>,
    ) -> RaggedResult<Self> {
        if contents.is_empty() {
            ragged_bail!("UnionArray must have at least one content");
        }
        if contents.len() > MAX_UNION_ARMS {
            ragged_bail!(
                CapacityExceeded: "UnionArray cannot address {} contents with 8-bit tags",
                contents.len()
            );
        }
        if index.len() < tags.len() {
            ragged_bail!("UnionArray index must not be shorter than its tags");
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            tags,
            index,
            contents,
        })
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

    /// The per-row arm choices.
    pub fn tags(&self) -> &Buffer<i8> {
        &self.tags
    }

    /// The per-row positions within the chosen arm.
    pub fn index(&self) -> &Buffer<I> {
        &self.index
    }

    /// The arms.
    pub fn contents(&self) -> &[ContentRef] {
        &self.contents
    }

    /// The number of arms.
    pub fn numcontents(&self) -> usize {
        self.contents.len()
    }

    /// One arm.
    pub fn content(&self, index: usize) -> RaggedResult<&ContentRef> {
        self.contents.get(index).ok_or_else(|| {
            ragged_err!(
                "index {} out of range for {} with {} contents",
                index,
                self.classname(),
                self.numcontents()
            )
        })
    }

    /// `0, 1, 2, ..`: the index of a union whose rows line up with one arm.
    pub fn sparse_index(length: usize) -> Buffer<I> {
        Buffer::from_iter((0..length as i64).map(|i| I::from_i64(i).unwrap_or_else(I::zero)))
    }

    /// The per-arm running position for each row.
    pub fn regular_index(tags: &Buffer<i8>) -> Buffer<I> {
        kernels::union_regular_index(tags.as_slice())
    }

    /// The dense rows belonging to one arm, in row order.
    pub fn project(&self, which: usize) -> RaggedResult<ContentRef> {
        if which >= self.numcontents() {
            ragged_bail!(
                "index {} out of range for {} with {} contents",
                which,
                self.classname(),
                self.numcontents()
            );
        }
        if self.index.len() < self.tags.len() {
            ragged_bail!(ValidityError: "in {}: len(index) < len(tags)", self.classname());
        }
        let nextcarry =
            kernels::union_project(self.tags.as_slice(), self.index.as_slice(), which as i64)
                .map_err(|e| kernel_error(self.classname(), e))?;
        self.contents[which].carry(&nextcarry)
    }

    /// Collapse nested unions and merge compatible arms into one flat
    /// 8-bit/64-bit union. A single surviving arm degenerates into a plain
    /// gather of that arm.
    pub fn simplify_uniontype(&self, mergebool: bool) -> RaggedResult<ContentRef> {
        let length = self.tags.len();
        if self.index.len() < length {
            ragged_bail!(ValidityError: "in {}: len(index) < len(tags)", self.classname());
        }
        let mut tags = BufferMut::<i8>::zeroed(length);
        let mut index = BufferMut::<i64>::zeroed(length);
        let mut contents: Vec<ContentRef> = Vec::new();

        for (i, arm) in self.contents.iter().enumerate() {
            if let Some((innertags, innerindex, innercontents)) = union_parts(arm.as_ref()) {
                for (j, inner) in innercontents.iter().enumerate() {
                    let merged_into = contents
                        .iter()
                        .position(|existing| existing.mergeable(inner, mergebool));
                    match merged_into {
                        Some(k) => {
                            kernels::union_simplify_nested(
                                tags.as_mut_slice(),
                                index.as_mut_slice(),
                                self.tags.as_slice(),
                                self.index.as_slice(),
                                innertags.as_slice(),
                                innerindex.as_slice(),
                                k,
                                j,
                                i,
                                contents[k].length() as i64,
                            )
                            .map_err(|e| kernel_error(self.classname(), e))?;
                            contents[k] = contents[k].merge(inner)?;
                        }
                        None => {
                            kernels::union_simplify_nested(
                                tags.as_mut_slice(),
                                index.as_mut_slice(),
                                self.tags.as_slice(),
                                self.index.as_slice(),
                                innertags.as_slice(),
                                innerindex.as_slice(),
                                contents.len(),
                                j,
                                i,
                                0,
                            )
                            .map_err(|e| kernel_error(self.classname(), e))?;
                            contents.push(inner.clone());
                        }
                    }
                }
            } else {
                let merged_into = contents
                    .iter()
                    .position(|existing| existing.mergeable(arm, mergebool));
                match merged_into {
                    Some(k) => {
                        kernels::union_simplify_one(
                            tags.as_mut_slice(),
                            index.as_mut_slice(),
                            self.tags.as_slice(),
                            self.index.as_slice(),
                            k,
                            i,
                            contents[k].length() as i64,
                        );
                        contents[k] = contents[k].merge(arm)?;
                    }
                    None => {
                        kernels::union_simplify_one(
                            tags.as_mut_slice(),
                            index.as_mut_slice(),
                            self.tags.as_slice(),
                            self.index.as_slice(),
                            contents.len(),
                            i,
                            0,
                        );
                        contents.push(arm.clone());
                    }
                }
            }
        }

        if contents.len() > MAX_UNION_ARMS {
            ragged_bail!(
                CapacityExceeded: "simplification left {} contents, more than 8-bit tags can address",
                contents.len()
            );
        }

        if contents.len() == 1 {
            return contents[0].carry(&index.freeze());
        }
        Ok(UnionArray::<i64>::try_new(tags.freeze(), index.freeze(), contents)?
            .with_parameters(self.parameters.clone())
            .with_identities(self.identities.clone())
            .into_ref())
    }

    pub(crate) fn classname(&self) -> &'static str {
        match I::PTYPE {
            PType::I32 => "UnionArray8_32",
            PType::U32 => "UnionArray8_U32",
            _ => "UnionArray8_64",
        }
    }

    pub(crate) fn length(&self) -> usize {
        self.tags.len()
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
            out.tags = Buffer::copy_from(self.tags.as_slice());
            out.index = Buffer::copy_from(self.index.as_slice());
        }
        out.contents = self
            .contents
            .iter()
            .map(|c| c.deep_copy(copyarrays, copyindexes, copyidentities))
            .collect();
        if copyidentities {
            out.identities = self
                .identities
                .as_ref()
                .map(|ids| std::sync::Arc::new(ids.deep_copy()));
        }
        out.into_ref()
    }

    pub(crate) fn getitem_at_nowrap(&self, at: usize) -> RaggedResult<ContentRef> {
        let tag = self.tags.as_slice()[at];
        if tag < 0 || tag as usize >= self.numcontents() {
            ragged_bail!(
                ValidityError: "in {}: not 0 <= tags[i] < numcontents at i={}",
                self.classname(),
                at
            );
        }
        let ix: i64 = num_traits::AsPrimitive::<i64>::as_(self.index.as_slice()[at]);
        let content = &self.contents[tag as usize];
        if ix < 0 || ix as usize >= content.length() {
            ragged_bail!(
                ValidityError: "in {}: index[i] > len(content(tags[i])) at i={}",
                self.classname(),
                at
            );
        }
        content.getitem_at_nowrap(ix as usize)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: crate::identities::range_identities(self.identities.as_ref(), start, stop),
            parameters: self.parameters.clone(),
            tags: self.tags.slice(start..stop),
            index: self.index.slice(start..stop),
            contents: self.contents.clone(),
        }
        .into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        let contents = self
            .contents
            .iter()
            .map(|c| c.getitem_field(key))
            .try_collect()?;
        Ok(Self {
            identities: self.identities.clone(),
            parameters: Parameters::new(),
            tags: self.tags.clone(),
            index: self.index.clone(),
            contents,
        }
        .into_ref())
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        let contents = self
            .contents
            .iter()
            .map(|c| c.getitem_fields(keys))
            .try_collect()?;
        Ok(Self {
            identities: self.identities.clone(),
            parameters: Parameters::new(),
            tags: self.tags.clone(),
            index: self.index.clone(),
            contents,
        }
        .into_ref())
    }

    pub(crate) fn getitem_next(
        &self,
        head: &SliceItem,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        let mut outcontents = Vec::with_capacity(self.numcontents());
        for i in 0..self.numcontents() {
            let projection = self.project(i)?;
            outcontents.push(projection.getitem_next(Some(head), tail, advanced)?);
        }
        let outindex = Self::regular_index(&self.tags);
        let out = Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            tags: self.tags.clone(),
            index: outindex,
            contents: outcontents,
        };
        out.simplify_uniontype(false)
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        let simplified = self.simplify_uniontype(false)?;
        if simplified.is_union_type() {
            ragged_bail!("cannot apply jagged slices to irreducible union arrays");
        }
        simplified.getitem_next_jagged(slicestarts, slicestops, item, tail)
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        let nexttags = kernels::index_carry(self.tags.as_slice(), carry.as_slice())
            .map_err(|e| kernel_error(self.classname(), e))?;
        let nextindex = kernels::index_carry_nocheck(self.index.as_slice(), carry.as_slice());
        let identities = crate::identities::carry_identities(self.identities.as_ref(), carry)?;
        Ok(Self {
            identities,
            parameters: self.parameters.clone(),
            tags: nexttags,
            index: nextindex,
            contents: self.contents.clone(),
        }
        .into_ref())
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(scalar_i64(self.length() as i64));
        }
        let contents = self
            .contents
            .iter()
            .map(|c| c.num_depth(axis, depth))
            .try_collect()?;
        let out = Self {
            identities: None,
            parameters: Parameters::new(),
            tags: self.tags.clone(),
            index: self.index.clone(),
            contents,
        };
        out.simplify_uniontype(false)
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        if axis == depth {
            ragged_bail!("axis=0 not allowed for flatten");
        }
        let mut offsets_per_arm = Vec::with_capacity(self.numcontents());
        let mut contents = Vec::with_capacity(self.numcontents());
        for content in &self.contents {
            let (offsets, flattened) = content.offsets_and_flattened_depth(axis, depth)?;
            offsets_per_arm.push(offsets);
            contents.push(flattened);
        }
        let nonempty = offsets_per_arm.iter().filter(|o| !o.is_empty()).count();
        if nonempty == 0 {
            return Ok((
                Buffer::empty(),
                Self {
                    identities: None,
                    parameters: Parameters::new(),
                    tags: self.tags.clone(),
                    index: self.index.clone(),
                    contents,
                }
                .into_ref(),
            ));
        }
        if nonempty != offsets_per_arm.len() {
            ragged_bail!(
                Internal: "flattening a {} produced offsets for only some of its contents",
                self.classname()
            );
        }
        let offsetsraws: Vec<&[i64]> = offsets_per_arm.iter().map(|o| o.as_slice()).collect();
        let total_length =
            kernels::union_flatten_length(self.tags.as_slice(), self.index.as_slice(), &offsetsraws)
                .map_err(|e| kernel_error(self.classname(), e))?;
        let (totags, toindex, tooffsets) = kernels::union_flatten_combine(
            self.tags.as_slice(),
            self.index.as_slice(),
            &offsetsraws,
            total_length,
        )
        .map_err(|e| kernel_error(self.classname(), e))?;
        Ok((
            tooffsets,
            UnionArray::<i64>::try_new(totags, toindex, contents)?.into_ref(),
        ))
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let mylength = self.length();
        let theirlength = other.length();
        let mut tags = BufferMut::<i8>::zeroed(mylength + theirlength);
        let mut index = BufferMut::<i64>::zeroed(mylength + theirlength);
        kernels::union_filltags_from(tags.as_mut_slice(), 0, self.tags.as_slice(), 0);
        kernels::union_fillindex_from(index.as_mut_slice(), 0, self.index.as_slice());

        let mut contents = self.contents.clone();
        if let Some((theirtags, theirindex, theircontents)) = union_parts(other.as_ref()) {
            kernels::union_filltags_from(
                tags.as_mut_slice(),
                mylength,
                theirtags.as_slice(),
                self.numcontents() as i64,
            );
            kernels::union_fillindex_from(index.as_mut_slice(), mylength, theirindex.as_slice());
            contents.extend(theircontents);
        } else {
            kernels::union_filltags_const(
                tags.as_mut_slice(),
                mylength,
                theirlength,
                self.numcontents() as i64,
            );
            kernels::union_fillindex_count(index.as_mut_slice(), mylength, theirlength);
            contents.push(other.clone());
        }

        Ok(UnionArray::<i64>::try_new(tags.freeze(), index.freeze(), contents)?.into_ref())
    }

    pub(crate) fn reverse_merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let mylength = self.length();
        let theirlength = other.length();
        let mut tags = BufferMut::<i8>::zeroed(theirlength + mylength);
        let mut index = BufferMut::<i64>::zeroed(theirlength + mylength);
        kernels::union_filltags_const(tags.as_mut_slice(), 0, theirlength, 0);
        kernels::union_fillindex_count(index.as_mut_slice(), 0, theirlength);
        kernels::union_filltags_from(tags.as_mut_slice(), theirlength, self.tags.as_slice(), 1);
        kernels::union_fillindex_from(index.as_mut_slice(), theirlength, self.index.as_slice());

        let mut contents = Vec::with_capacity(1 + self.numcontents());
        contents.push(other.clone());
        contents.extend(self.contents.iter().cloned());

        Ok(UnionArray::<i64>::try_new(tags.freeze(), index.freeze(), contents)?.into_ref())
    }

    pub(crate) fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        let contents = self
            .contents
            .iter()
            .map(|c| c.fillna(value))
            .try_collect()?;
        let out = Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            tags: self.tags.clone(),
            index: self.index.clone(),
            contents,
        };
        out.simplify_uniontype(false)
    }

    pub(crate) fn is_none(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::is_none_axis0(self.length()));
        }
        let contents = self
            .contents
            .iter()
            .map(|c| c.is_none_depth(axis, depth))
            .try_collect()?;
        let out = Self {
            identities: None,
            parameters: Parameters::new(),
            tags: self.tags.clone(),
            index: self.index.clone(),
            contents,
        };
        out.simplify_uniontype(false)
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
        let contents = self
            .contents
            .iter()
            .map(|c| c.rpad_depth(target, axis, depth, clip))
            .try_collect()?;
        let out = Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            tags: self.tags.clone(),
            index: self.index.clone(),
            contents,
        };
        out.simplify_uniontype(false)
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::localindex_axis0(self.length()));
        }
        let contents = self
            .contents
            .iter()
            .map(|c| c.localindex_depth(axis, depth))
            .try_collect()?;
        Ok(Self {
            identities: self.identities.clone(),
            parameters: Parameters::new(),
            tags: self.tags.clone(),
            index: self.index.clone(),
            contents,
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
        let contents = self
            .contents
            .iter()
            .map(|c| c.combinations_depth(n, replacement, recordlookup, parameters, axis, depth))
            .try_collect()?;
        Ok(Self {
            identities: self.identities.clone(),
            parameters: Parameters::new(),
            tags: self.tags.clone(),
            index: self.index.clone(),
            contents,
        }
        .into_ref())
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        let lencontents: Vec<usize> = self.contents.iter().map(|c| c.length()).collect();
        if let Err(err) =
            kernels::union_validity(self.tags.as_slice(), self.index.as_slice(), &lencontents)
        {
            let where_ = err
                .at
                .map(|i| format!(" at i={}", i))
                .unwrap_or_default();
            return Some(format!(
                "at {} ({}): {}{}",
                path,
                self.classname(),
                err.message,
                where_
            ));
        }
        for (i, content) in self.contents.iter().enumerate() {
            if let Some(error) = content.validityerror(&format!("{}.content({})", path, i)) {
                return Some(error);
            }
        }
        None
    }

    pub(crate) fn minmax_depth(&self) -> (i64, i64) {
        if self.contents.is_empty() {
            return (0, 0);
        }
        let mut min = i64::MAX;
        let mut max = 0;
        for content in &self.contents {
            let (cmin, cmax) = content.minmax_depth();
            min = min.min(cmin);
            max = max.max(cmax);
        }
        (min, max)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let Some(first) = self.contents.first() else {
            return Vec::new();
        };
        let mut out = first.keys();
        for content in self.contents.iter().skip(1) {
            let theirs = content.keys();
            out.retain(|key| theirs.contains(key));
        }
        out
    }

    pub(crate) fn tojson_row(&self, row: usize, sink: &mut dyn JsonSink) -> RaggedResult<()> {
        let tag = self.tags.as_slice()[row];
        let ix: i64 = num_traits::AsPrimitive::<i64>::as_(self.index.as_slice()[row]);
        if tag < 0 || tag as usize >= self.numcontents() || ix < 0 {
            ragged_bail!(
                ValidityError: "in {}: not 0 <= tags[i] < numcontents at i={}",
                self.classname(),
                row
            );
        }
        self.contents[tag as usize].tojson_row(ix as usize, sink)
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        let simplified = self.simplify_uniontype(false)?;
        if simplified.is_union_type() {
            ragged_bail!("cannot use a union of different types as a slice");
        }
        simplified.asslice()
    }
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use crate::contents::{Content, IntoContent, PrimitiveArray, UnionArray};
    use crate::ptype::PType;

    fn number_or_bool() -> UnionArray<i64> {
        UnionArray::try_new(
            buffer![0i8, 1],
            buffer![0i64, 0],
            vec![
                PrimitiveArray::new(buffer![1.5f64]).into_ref(),
                PrimitiveArray::from_bool_iter([true].into_iter()).into_ref(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rows_resolve_through_tags() {
        let array = number_or_bool().into_content();
        assert_eq!(array.length(), 2);
        assert_eq!(array.to_json().unwrap(), serde_json::json!([1.5, true]));
    }

    #[test]
    fn project_extracts_one_arm() {
        let array = number_or_bool();
        let floats = array.project(0).unwrap();
        let Content::Primitive(p) = floats.as_ref() else {
            panic!("expected a primitive");
        };
        assert_eq!(p.ptype(), PType::F64);
        assert_eq!(p.length(), 1);
    }

    #[test]
    fn merge_with_compatible_arm_stays_mergeable_under_simplify() {
        // float/bool union merged with a float: simplification folds the new
        // float arm into the existing float arm.
        let array = number_or_bool().into_content();
        let more = PrimitiveArray::new(buffer![2.5f64]).into_ref();
        let merged = array.merge(&more).unwrap();
        assert_eq!(merged.length(), 3);
        let Content::Union64(u) = merged.as_ref() else {
            panic!("expected a union");
        };
        assert_eq!(u.numcontents(), 3);
        let simplified = u.simplify_uniontype(false).unwrap();
        let Content::Union64(s) = simplified.as_ref() else {
            panic!("expected a union");
        };
        assert_eq!(s.numcontents(), 2);
        assert_eq!(
            simplified.to_json().unwrap(),
            serde_json::json!([1.5, true, 2.5])
        );
    }

    #[test]
    fn single_arm_union_collapses() {
        let array = UnionArray::try_new(
            buffer![0i8, 0, 0],
            buffer![2i64, 0, 1],
            vec![PrimitiveArray::new(buffer![10i64, 20, 30]).into_ref()],
        )
        .unwrap();
        let simplified = array.simplify_uniontype(false).unwrap();
        let Content::Primitive(p) = simplified.as_ref() else {
            panic!("expected the union to collapse");
        };
        assert_eq!(p.as_slice::<i64>(), &[30, 10, 20]);
    }

    #[test]
    fn nested_union_flattens_into_one_level() {
        let inner = UnionArray::try_new(
            buffer![0i8, 1],
            buffer![0i64, 0],
            vec![
                PrimitiveArray::new(buffer![1i64]).into_ref(),
                PrimitiveArray::from_bool_iter([false].into_iter()).into_ref(),
            ],
        )
        .unwrap()
        .into_ref();
        let outer = UnionArray::try_new(
            buffer![0i8, 1, 1],
            buffer![0i64, 0, 1],
            vec![PrimitiveArray::new(buffer![0.5f64]).into_ref(), inner],
        )
        .unwrap();
        let simplified = outer.simplify_uniontype(false).unwrap();
        let Content::Union64(s) = simplified.as_ref() else {
            panic!("expected a union");
        };
        // float and i64 arms merge; bool stays separate
        assert_eq!(s.numcontents(), 2);
        assert!(!s.contents().iter().any(|c| c.is_union_type()));
        assert_eq!(
            simplified.to_json().unwrap(),
            serde_json::json!([0.5, 1.0, false])
        );
    }

    #[test]
    fn arm_capacity_is_bounded() {
        let arms: Vec<_> = (0..128)
            .map(|i| {
                PrimitiveArray::new(buffer![i as i64])
                    .with_parameters(
                        crate::Parameters::from_iter([("arm", i.to_string())]),
                    )
                    .into_ref()
            })
            .collect();
        let tags = ragged_buffer::Buffer::from(vec![0i8; 128]);
        let index = ragged_buffer::Buffer::from(vec![0i64; 128]);
        assert!(UnionArray::try_new(tags, index, arms).is_err());
    }
}
