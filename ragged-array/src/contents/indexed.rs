use ragged_buffer::{Buffer, BufferMut};
use ragged_error::{RaggedResult, ragged_bail};

use crate::contents::{ContentRef, IntoContent, UnionArray, kernel_error, scalar_i64};
use crate::identities::IdentitiesRef;
use crate::kernels;
use crate::parameters::Parameters;
use crate::ptype::{IndexPType, PType};
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// A lazy gather: logical row `i` is `content[index[i]]`. Never missing.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedArray<O: IndexPType> {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    index: Buffer<O>,
    content: ContentRef,
}

/// A lazy gather in which a negative position denotes a missing row.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedOptionArray<O: IndexPType> {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    index: Buffer<O>,
    content: ContentRef,
}

impl<O: IndexPType> IndexedArray<O>
where
    Self: IntoContent,
{
    /// A gather over the content.
    pub fn new(index: Buffer<O>, content: ContentRef) -> Self {
        Self {
            identities: None,
            parameters: Parameters::new(),
            index,
            content,
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

    /// The gather positions.
    pub fn index(&self) -> &Buffer<O> {
        &self.index
    }

    /// The gathered content.
    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    /// Materialize the gather.
    pub fn project(&self) -> RaggedResult<ContentRef> {
        let nextcarry = kernels::indexed_carry(self.index.as_slice(), self.content.length())
            .map_err(|e| kernel_error(self.classname(), e))?;
        self.content.carry(&nextcarry)
    }

    /// Compose with the content when the content is itself a gather or an
    /// option wrapper, yielding a single 64-bit layer.
    pub fn simplify_optiontype(&self) -> RaggedResult<ContentRef> {
        let Some((inner_index, inner_content)) = self.content.to_indexed_option_parts() else {
            return Ok(self.clone().into_ref());
        };
        let innerlen = inner_index.len() as i64;
        let mut composed = BufferMut::<i64>::with_capacity(self.index.len());
        let mut has_missing = false;
        for (i, &ix) in self.index.iter().enumerate() {
            let ix: i64 = num_traits::AsPrimitive::<i64>::as_(ix);
            if ix < 0 || ix >= innerlen {
                ragged_bail!(
                    ValidityError: "in {}: index[i] > len(content) at i={}",
                    self.classname(),
                    i
                );
            }
            let v = inner_index.as_slice()[ix as usize];
            has_missing |= v < 0;
            composed.push(v);
        }
        if has_missing || self.content.is_option_type() {
            IndexedOptionArray::<i64>::new(composed.freeze(), inner_content)
                .with_parameters(self.parameters.clone())
                .into_content()
                .simplify()
        } else {
            IndexedArray::<i64>::new(composed.freeze(), inner_content)
                .with_parameters(self.parameters.clone())
                .into_content()
                .simplify()
        }
    }

    pub(crate) fn classname(&self) -> &'static str {
        match O::PTYPE {
            PType::I32 => "IndexedArray32",
            PType::U32 => "IndexedArrayU32",
            _ => "IndexedArray64",
        }
    }

    pub(crate) fn length(&self) -> usize {
        self.index.len()
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
            out.index = Buffer::copy_from(self.index.as_slice());
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
        let ix: i64 = num_traits::AsPrimitive::<i64>::as_(self.index.as_slice()[at]);
        if ix < 0 || ix as usize >= self.content.length() {
            ragged_bail!(
                ValidityError: "in {}: index[i] > len(content) at i={}",
                self.classname(),
                at
            );
        }
        self.content.getitem_at_nowrap(ix as usize)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: crate::identities::range_identities(self.identities.as_ref(), start, stop),
            parameters: self.parameters.clone(),
            index: self.index.slice(start..stop),
            content: self.content.clone(),
        }
        .into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            index: self.index.clone(),
            content: self.content.getitem_field(key)?,
        }
        .into_ref())
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            index: self.index.clone(),
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
        let next = self.project()?;
        next.getitem_next(Some(head), tail, advanced)
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        let next = self.project()?;
        next.getitem_next_jagged(slicestarts, slicestops, item, tail)
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        let index = kernels::index_carry(self.index.as_slice(), carry.as_slice())
            .map_err(|e| kernel_error(self.classname(), e))?;
        let identities = crate::identities::carry_identities(self.identities.as_ref(), carry)?;
        Ok(Self {
            identities,
            parameters: self.parameters.clone(),
            index,
            content: self.content.clone(),
        }
        .into_ref())
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(scalar_i64(self.length() as i64));
        }
        self.project()?.num_depth(axis, depth)
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        if axis == depth {
            ragged_bail!("axis=0 not allowed for flatten");
        }
        self.project()?.offsets_and_flattened_depth(axis, depth)
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let theirlength = other.length();
        let contentlength = self.content.length() as i64;
        let mut index = BufferMut::<i64>::with_capacity(self.length() + theirlength);
        for &ix in self.index.iter() {
            index.push(num_traits::AsPrimitive::<i64>::as_(ix));
        }
        for j in 0..theirlength as i64 {
            index.push(contentlength + j);
        }
        let content = self.content.merge(other)?;
        Ok(IndexedArray::<i64>::new(index.freeze(), content).into_ref())
    }

    pub(crate) fn reverse_merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let theirlength = other.length() as i64;
        let mut index = BufferMut::<i64>::with_capacity(theirlength as usize + self.length());
        for j in 0..theirlength {
            index.push(j);
        }
        for &ix in self.index.iter() {
            index.push(num_traits::AsPrimitive::<i64>::as_(ix) + theirlength);
        }
        let content = other.merge(&self.content)?;
        Ok(IndexedArray::<i64>::new(index.freeze(), content).into_ref())
    }

    pub(crate) fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            index: self.index.clone(),
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
            index: self.index.clone(),
            content: self.content.is_none_depth(axis, depth)?,
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
        Ok(Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            index: self.index.clone(),
            content: self.content.rpad_depth(target, axis, depth, clip)?,
        }
        .into_ref())
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::localindex_axis0(self.length()));
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            index: self.index.clone(),
            content: self.content.localindex_depth(axis, depth)?,
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
        self.project()?
            .combinations_depth(n, replacement, recordlookup, parameters, axis, depth)
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        let contentlen = self.content.length() as i64;
        for (i, &ix) in self.index.iter().enumerate() {
            let ix: i64 = num_traits::AsPrimitive::<i64>::as_(ix);
            if ix < 0 {
                return Some(format!(
                    "at {} ({}): index[i] < 0 at i={}",
                    path,
                    self.classname(),
                    i
                ));
            }
            if ix >= contentlen {
                return Some(format!(
                    "at {} ({}): index[i] >= len(content) at i={}",
                    path,
                    self.classname(),
                    i
                ));
            }
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
        let ix: i64 = num_traits::AsPrimitive::<i64>::as_(self.index.as_slice()[row]);
        self.content.tojson_row(ix as usize, sink)
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        self.project()?.asslice()
    }
}

impl<O: IndexPType> IndexedOptionArray<O>
where
    Self: IntoContent,
{
    /// An option-typed gather over the content.
    pub fn new(index: Buffer<O>, content: ContentRef) -> Self {
        Self {
            identities: None,
            parameters: Parameters::new(),
            index,
            content,
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

    /// The gather positions; negative means missing.
    pub fn index(&self) -> &Buffer<O> {
        &self.index
    }

    /// The gathered content.
    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    /// The present rows, densely.
    pub fn project(&self) -> RaggedResult<ContentRef> {
        let (nextcarry, _, _) =
            kernels::indexedoption_carry_outindex(self.index.as_slice(), self.content.length())
                .map_err(|e| kernel_error(self.classname(), e))?;
        self.content.carry(&nextcarry)
    }

    /// The is-missing byte mask.
    pub fn bytemask(&self) -> Buffer<i8> {
        Buffer::from_iter(self.index.iter().map(|&ix| {
            let ix: i64 = num_traits::AsPrimitive::<i64>::as_(ix);
            (ix < 0) as i8
        }))
    }

    /// Compose with the content when the content is itself a gather or an
    /// option wrapper, yielding a single 64-bit option layer.
    pub fn simplify_optiontype(&self) -> RaggedResult<ContentRef> {
        let Some((inner_index, inner_content)) = self.content.to_indexed_option_parts() else {
            return Ok(self.clone().into_ref());
        };
        let innerlen = inner_index.len() as i64;
        let mut composed = BufferMut::<i64>::with_capacity(self.index.len());
        for (i, &ix) in self.index.iter().enumerate() {
            let ix: i64 = num_traits::AsPrimitive::<i64>::as_(ix);
            if ix < 0 {
                composed.push(-1);
            } else if ix >= innerlen {
                ragged_bail!(
                    ValidityError: "in {}: index[i] > len(content) at i={}",
                    self.classname(),
                    i
                );
            } else {
                composed.push(inner_index.as_slice()[ix as usize]);
            }
        }
        IndexedOptionArray::<i64>::new(composed.freeze(), inner_content)
            .with_parameters(self.parameters.clone())
            .into_content()
            .simplify()
    }

    pub(crate) fn classname(&self) -> &'static str {
        match O::PTYPE {
            PType::I32 => "IndexedOptionArray32",
            _ => "IndexedOptionArray64",
        }
    }

    pub(crate) fn length(&self) -> usize {
        self.index.len()
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
            out.index = Buffer::copy_from(self.index.as_slice());
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
        let ix: i64 = num_traits::AsPrimitive::<i64>::as_(self.index.as_slice()[at]);
        if ix < 0 {
            let nothing = self.content.getitem_nothing()?;
            return Ok(IndexedOptionArray::<i64>::new(
                ragged_buffer::buffer![-1i64],
                nothing,
            )
            .into_ref());
        }
        if ix as usize >= self.content.length() {
            ragged_bail!(
                ValidityError: "in {}: index[i] > len(content) at i={}",
                self.classname(),
                at
            );
        }
        self.content.getitem_at_nowrap(ix as usize)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: crate::identities::range_identities(self.identities.as_ref(), start, stop),
            parameters: self.parameters.clone(),
            index: self.index.slice(start..stop),
            content: self.content.clone(),
        }
        .into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            index: self.index.clone(),
            content: self.content.getitem_field(key)?,
        }
        .into_ref())
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            index: self.index.clone(),
            content: self.content.getitem_fields(keys)?,
        }
        .into_ref())
    }

    fn carry_outindex(&self) -> RaggedResult<(Buffer<i64>, Buffer<i64>)> {
        let (nextcarry, outindex, _) =
            kernels::indexedoption_carry_outindex(self.index.as_slice(), self.content.length())
                .map_err(|e| kernel_error(self.classname(), e))?;
        Ok((nextcarry, outindex))
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
        let (nextcarry, outindex) = self.carry_outindex()?;
        let next = self.content.carry(&nextcarry)?;
        let out = next.getitem_next(Some(head), tail, advanced)?;
        IndexedOptionArray::<i64>::new(outindex, out)
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
        let (nextcarry, outindex) = self.carry_outindex()?;
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
        IndexedOptionArray::<i64>::new(outindex, out)
            .with_parameters(self.parameters.clone())
            .into_content()
            .simplify()
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        let index = kernels::index_carry(self.index.as_slice(), carry.as_slice())
            .map_err(|e| kernel_error(self.classname(), e))?;
        let identities = crate::identities::carry_identities(self.identities.as_ref(), carry)?;
        Ok(Self {
            identities,
            parameters: self.parameters.clone(),
            index,
            content: self.content.clone(),
        }
        .into_ref())
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(scalar_i64(self.length() as i64));
        }
        let (nextcarry, outindex) = self.carry_outindex()?;
        let next = self.content.carry(&nextcarry)?;
        IndexedOptionArray::<i64>::new(outindex, next.num_depth(axis, depth)?)
            .into_content()
            .simplify()
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        if axis == depth {
            ragged_bail!("axis=0 not allowed for flatten");
        }
        let (nextcarry, outindex) = self.carry_outindex()?;
        let next = self.content.carry(&nextcarry)?;
        let (inneroffsets, flattened) = next.offsets_and_flattened_depth(axis, depth)?;
        if inneroffsets.is_empty() {
            let wrapped = IndexedOptionArray::<i64>::new(outindex, flattened)
                .into_content()
                .simplify()?;
            Ok((inneroffsets, wrapped))
        } else {
            // Missing rows flatten into nothing.
            let mut outoffsets = BufferMut::<i64>::with_capacity(outindex.len() + 1);
            outoffsets.push(0);
            let mut total = 0i64;
            for &o in outindex.iter() {
                if o >= 0 {
                    let k = o as usize;
                    total += inneroffsets.as_slice()[k + 1] - inneroffsets.as_slice()[k];
                }
                outoffsets.push(total);
            }
            Ok((outoffsets.freeze(), flattened))
        }
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let theirlength = other.length();
        let contentlength = self.content.length() as i64;
        let mut index = BufferMut::<i64>::with_capacity(self.length() + theirlength);
        for &ix in self.index.iter() {
            let ix: i64 = num_traits::AsPrimitive::<i64>::as_(ix);
            index.push(if ix < 0 { -1 } else { ix });
        }
        for j in 0..theirlength as i64 {
            index.push(contentlength + j);
        }
        let content = self.content.merge(other)?;
        Ok(IndexedOptionArray::<i64>::new(index.freeze(), content).into_ref())
    }

    pub(crate) fn reverse_merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let theirlength = other.length() as i64;
        let mut index = BufferMut::<i64>::with_capacity(theirlength as usize + self.length());
        for j in 0..theirlength {
            index.push(j);
        }
        for &ix in self.index.iter() {
            let ix: i64 = num_traits::AsPrimitive::<i64>::as_(ix);
            index.push(if ix < 0 { -1 } else { ix + theirlength });
        }
        let content = other.merge(&self.content)?;
        Ok(IndexedOptionArray::<i64>::new(index.freeze(), content).into_ref())
    }

    pub(crate) fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        if value.length() != 1 {
            ragged_bail!(
                "fillna value length is {}, not 1",
                value.length()
            );
        }
        let mut tags = BufferMut::<i8>::with_capacity(self.length());
        let mut index = BufferMut::<i64>::with_capacity(self.length());
        for &ix in self.index.iter() {
            let ix: i64 = num_traits::AsPrimitive::<i64>::as_(ix);
            if ix < 0 {
                tags.push(0);
                index.push(0);
            } else {
                tags.push(1);
                index.push(ix);
            }
        }
        UnionArray::<i64>::try_new(
            tags.freeze(),
            index.freeze(),
            vec![value.clone(), self.content.clone()],
        )?
        .simplify_uniontype(true)
    }

    pub(crate) fn is_none(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::is_none_from_mask(
                self.bytemask().iter().map(|&m| m != 0),
            ));
        }
        let (nextcarry, outindex) = self.carry_outindex()?;
        let next = self.content.carry(&nextcarry)?;
        IndexedOptionArray::<i64>::new(outindex, next.is_none_depth(axis, depth)?)
            .into_content()
            .simplify()
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
        IndexedOptionArray::new(
            self.index.clone(),
            self.content.rpad_depth(target, axis, depth, clip)?,
        )
        .with_parameters(self.parameters.clone())
        .into_content()
        .simplify()
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::localindex_axis0(self.length()));
        }
        let (nextcarry, outindex) = self.carry_outindex()?;
        let next = self.content.carry(&nextcarry)?;
        IndexedOptionArray::<i64>::new(outindex, next.localindex_depth(axis, depth)?)
            .into_content()
            .simplify()
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
        let (nextcarry, outindex) = self.carry_outindex()?;
        let next = self.content.carry(&nextcarry)?;
        IndexedOptionArray::<i64>::new(
            outindex,
            next.combinations_depth(n, replacement, recordlookup, parameters, axis, depth)?,
        )
        .into_content()
        .simplify()
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        let contentlen = self.content.length() as i64;
        for (i, &ix) in self.index.iter().enumerate() {
            let ix: i64 = num_traits::AsPrimitive::<i64>::as_(ix);
            if ix >= contentlen {
                return Some(format!(
                    "at {} ({}): index[i] >= len(content) at i={}",
                    path,
                    self.classname(),
                    i
                ));
            }
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
        let ix: i64 = num_traits::AsPrimitive::<i64>::as_(self.index.as_slice()[row]);
        if ix < 0 {
            sink.null();
            Ok(())
        } else {
            self.content.tojson_row(ix as usize, sink)
        }
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        let mut outindex = BufferMut::<i64>::with_capacity(self.length());
        let mut valids = BufferMut::<i64>::empty();
        for &ix in self.index.iter() {
            let ix: i64 = num_traits::AsPrimitive::<i64>::as_(ix);
            if ix < 0 {
                outindex.push(-1);
            } else {
                outindex.push(valids.len() as i64);
                valids.push(ix);
            }
        }
        let flat = self.content.carry(&valids.freeze())?;
        let item = flat.asslice()?;
        if !matches!(item, SliceItem::Array { .. }) {
            ragged_bail!("cannot use a missing-value array of this type as a slice");
        }
        Ok(SliceItem::Missing {
            index: outindex.freeze(),
            item: Box::new(item),
        })
    }
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use crate::contents::{
        Content, IndexedArray, IndexedOptionArray, IntoContent, PrimitiveArray, UnmaskedArray,
    };

    #[test]
    fn option_rows_render_as_null() {
        let array = IndexedOptionArray::new(
            buffer![-1i64, 0, 1],
            PrimitiveArray::new(buffer![7i64, 8]).into_ref(),
        )
        .into_content();
        assert_eq!(array.to_json().unwrap(), serde_json::json!([null, 7, 8]));
    }

    #[test]
    fn simplify_unwraps_unmasked_content() {
        // Option over an all-present wrapper collapses to one option layer.
        let array = IndexedOptionArray::new(
            buffer![-1i64, 0, 1],
            UnmaskedArray::new(PrimitiveArray::new(buffer![7i64, 8]).into_ref()).into_ref(),
        )
        .into_content();
        let simplified = array.simplify().unwrap();
        let Content::IndexedOption64(out) = simplified.as_ref() else {
            panic!("expected a 64-bit option gather");
        };
        assert_eq!(out.index().as_slice(), &[-1, 0, 1]);
        assert!(matches!(out.content().as_ref(), Content::Primitive(_)));
    }

    #[test]
    fn nested_option_composes_missing() {
        let inner = IndexedOptionArray::new(
            buffer![0i64, -1, 1],
            PrimitiveArray::new(buffer![9i64, 10]).into_ref(),
        );
        let outer = IndexedOptionArray::new(buffer![2i64, -1, 0, 1], inner.into_ref());
        let simplified = outer.simplify_optiontype().unwrap();
        let Content::IndexedOption64(out) = simplified.as_ref() else {
            panic!("expected a 64-bit option gather");
        };
        assert_eq!(out.index().as_slice(), &[1, -1, 0, -1]);
    }

    #[test]
    fn indexed_composes_with_indexed() {
        let inner = IndexedArray::new(
            buffer![1i32, 0],
            PrimitiveArray::new(buffer![5i64, 6]).into_ref(),
        );
        let outer = IndexedArray::new(buffer![0i64, 0, 1], inner.into_ref());
        let simplified = outer.simplify_optiontype().unwrap();
        let Content::Indexed64(out) = simplified.as_ref() else {
            panic!("expected a 64-bit gather");
        };
        assert_eq!(out.index().as_slice(), &[1, 1, 0]);
    }

    #[test]
    fn merge_keeps_missing_rows() {
        let left = IndexedOptionArray::new(
            buffer![0i64, -1],
            PrimitiveArray::new(buffer![1i64]).into_ref(),
        )
        .into_content();
        let right = PrimitiveArray::new(buffer![2i64, 3]).into_ref();
        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.length(), 4);
        assert_eq!(merged.to_json().unwrap(), serde_json::json!([1, null, 2, 3]));
    }

    #[test]
    fn reverse_merge_offsets_the_right_operand() {
        let left = PrimitiveArray::new(buffer![2i64, 3]).into_content();
        let right = IndexedOptionArray::new(
            buffer![-1i64, 0],
            PrimitiveArray::new(buffer![1i64]).into_ref(),
        )
        .into_ref();
        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.to_json().unwrap(), serde_json::json!([2, 3, null, 1]));
    }
}
