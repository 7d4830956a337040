use ragged_buffer::{Buffer, BufferMut};
use ragged_error::{RaggedResult, ragged_bail};

use crate::contents::{
    Content, ContentRef, IndexedOptionArray, IntoContent, ListOffsetArray, PrimitiveArray,
    kernel_error, scalar_i64,
};
use crate::identities::IdentitiesRef;
use crate::kernels;
use crate::parameters::Parameters;
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// `length` lists of exactly `size` elements each.
#[derive(Clone, Debug, PartialEq)]
pub struct RegularArray {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    content: ContentRef,
    size: usize,
    length: usize,
}

impl RegularArray {
    /// Fixed-size lists with an explicit row count.
    pub fn try_new(content: ContentRef, size: usize, length: usize) -> RaggedResult<Self> {
        if content.length() < size * length {
            ragged_bail!(
                ValidityError: "in RegularArray: len(content) {} < size {} * length {}",
                content.length(),
                size,
                length
            );
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            content,
            size,
            length,
        })
    }

    /// Fixed-size lists over as many whole rows as the content provides.
    pub fn new(content: ContentRef, size: usize) -> Self {
        let length = if size == 0 { 0 } else { content.length() / size };
        Self {
            identities: None,
            parameters: Parameters::new(),
            content,
            size,
            length,
        }
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// The list payload.
    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    /// Elements per list.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Rewrite as offset-addressed lists, trimming the content to the rows
    /// this array actually covers.
    pub fn to_listoffset64(&self) -> RaggedResult<ListOffsetArray<i64>> {
        let offsets =
            Buffer::from_iter((0..=self.length as i64).map(|i| i * self.size as i64));
        let content = self
            .content
            .getitem_range_nowrap(0, self.size * self.length)?;
        Ok(ListOffsetArray::try_new(offsets, content)?
            .with_parameters(self.parameters.clone())
            .with_identities(self.identities.clone()))
    }

    pub(crate) fn classname(&self) -> &'static str {
        "RegularArray"
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
        self.content
            .getitem_range_nowrap(at * self.size, (at + 1) * self.size)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        let content = self
            .content
            .getitem_range_nowrap(start * self.size, stop * self.size)?;
        Ok(Self {
            identities: crate::identities::range_identities(self.identities.as_ref(), start, stop),
            parameters: self.parameters.clone(),
            content,
            size: self.size,
            length: stop - start,
        }
        .into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            content: self.content.getitem_field(key)?,
            size: self.size,
            length: self.length,
        }
        .into_ref())
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            content: self.content.getitem_fields(keys)?,
            size: self.size,
            length: self.length,
        }
        .into_ref())
    }

    pub(crate) fn getitem_next(
        &self,
        head: &SliceItem,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        match head {
            SliceItem::At(at) => {
                let size = self.size as i64;
                let regular = kernels::regularize_index(*at, size)
                    .map_err(|e| kernel_error(self.classname(), e))?;
                let nextcarry = Buffer::from_iter(
                    (0..self.length as i64).map(|i| i * size + regular),
                );
                let next = self.content.carry(&nextcarry)?;
                next.getitem_next(tail.head(), &tail.tail(), advanced)
            }
            SliceItem::Range { start, stop, step } => {
                let (first, step, count) =
                    kernels::regularize_range(*start, *stop, *step, self.size as i64)
                        .map_err(|e| kernel_error(self.classname(), e))?;
                let size = self.size as i64;
                let mut nextcarry =
                    BufferMut::<i64>::with_capacity(self.length * count as usize);
                for i in 0..self.length as i64 {
                    for k in 0..count {
                        nextcarry.push(i * size + first + k * step);
                    }
                }
                let next = self.content.carry(&nextcarry.freeze())?;
                let out = match advanced {
                    None => next.getitem_next(tail.head(), &tail.tail(), None)?,
                    Some(advanced) => {
                        let mut nextadvanced =
                            BufferMut::<i64>::with_capacity(self.length * count as usize);
                        for i in 0..self.length {
                            nextadvanced.push_n(advanced.as_slice()[i], count as usize);
                        }
                        next.getitem_next(tail.head(), &tail.tail(), Some(&nextadvanced.freeze()))?
                    }
                };
                Ok(Self {
                    identities: self.identities.clone(),
                    parameters: self.parameters.clone(),
                    content: out,
                    size: count as usize,
                    length: self.length,
                }
                .into_ref())
            }
            SliceItem::Array { index, shape } => {
                let size = self.size as i64;
                match advanced {
                    None => {
                        let m = index.len();
                        let mut nextcarry = BufferMut::<i64>::with_capacity(self.length * m);
                        let mut nextadvanced = BufferMut::<i64>::with_capacity(self.length * m);
                        for i in 0..self.length as i64 {
                            for (j, &h) in index.iter().enumerate() {
                                let regular = kernels::regularize_index(h, size)
                                    .map_err(|e| kernel_error(self.classname(), e))?;
                                nextcarry.push(i * size + regular);
                                nextadvanced.push(j as i64);
                            }
                        }
                        let next = self.content.carry(&nextcarry.freeze())?;
                        let out = next.getitem_next(
                            tail.head(),
                            &tail.tail(),
                            Some(&nextadvanced.freeze()),
                        )?;
                        Content::getitem_next_array_wrap(out, shape)
                    }
                    Some(advanced) => {
                        let mut nextcarry = BufferMut::<i64>::with_capacity(self.length);
                        let mut nextadvanced = BufferMut::<i64>::with_capacity(self.length);
                        for i in 0..self.length as i64 {
                            let j = advanced.as_slice()[i as usize];
                            if j < 0 || j as usize >= index.len() {
                                ragged_bail!(
                                    ValidityError: "in {}: advanced index out of range at i={}",
                                    self.classname(),
                                    i
                                );
                            }
                            let regular =
                                kernels::regularize_index(index.as_slice()[j as usize], size)
                                    .map_err(|e| kernel_error(self.classname(), e))?;
                            nextcarry.push(i * size + regular);
                            nextadvanced.push(j);
                        }
                        let next = self.content.carry(&nextcarry.freeze())?;
                        next.getitem_next(tail.head(), &tail.tail(), Some(&nextadvanced.freeze()))
                    }
                }
            }
            SliceItem::Jagged { offsets, item } => {
                if advanced.is_some() {
                    ragged_bail!(
                        "cannot mix jagged slices with NumPy-style advanced indexing"
                    );
                }
                let rows = offsets.len().saturating_sub(1);
                if rows != self.size {
                    ragged_bail!(
                        "cannot fit jagged slice with length {} into {} of size {}",
                        rows,
                        self.classname(),
                        self.size
                    );
                }
                let mut multistarts =
                    BufferMut::<i64>::with_capacity(self.length * self.size);
                let mut multistops = BufferMut::<i64>::with_capacity(self.length * self.size);
                for _ in 0..self.length {
                    for j in 0..self.size {
                        multistarts.push(offsets.as_slice()[j]);
                        multistops.push(offsets.as_slice()[j + 1]);
                    }
                }
                let down = self
                    .content
                    .getitem_range_nowrap(0, self.length * self.size)?;
                let out = down.getitem_next_jagged(
                    &multistarts.freeze(),
                    &multistops.freeze(),
                    item,
                    tail,
                )?;
                Ok(Self {
                    identities: self.identities.clone(),
                    parameters: self.parameters.clone(),
                    content: out,
                    size: self.size,
                    length: self.length,
                }
                .into_ref())
            }
            _ => ragged_bail!(Internal: "unhandled slice item for {}", self.classname()),
        }
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        self.to_listoffset64()?
            .getitem_next_jagged(slicestarts, slicestops, item, tail)
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        let length = self.length as i64;
        let size = self.size as i64;
        let mut nextcarry = BufferMut::<i64>::with_capacity(carry.len() * self.size);
        for (i, &k) in carry.iter().enumerate() {
            if k < 0 || k >= length {
                ragged_bail!(
                    ValidityError: "in {}: index {} out of range for {} rows at i={}",
                    self.classname(),
                    k,
                    length,
                    i
                );
            }
            for j in 0..size {
                nextcarry.push(k * size + j);
            }
        }
        let content = self.content.carry(&nextcarry.freeze())?;
        let identities = crate::identities::carry_identities(self.identities.as_ref(), carry)?;
        Ok(Self {
            identities,
            parameters: self.parameters.clone(),
            content,
            size: self.size,
            length: carry.len(),
        }
        .into_ref())
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            Ok(scalar_i64(self.length as i64))
        } else if axis == depth + 1 {
            Ok(
                PrimitiveArray::from_i64(Buffer::full(self.size as i64, self.length))
                    .into_ref(),
            )
        } else {
            let trimmed = self
                .content
                .getitem_range_nowrap(0, self.size * self.length)?;
            let content = trimmed.num_depth(axis, depth + 1)?;
            Ok(Self {
                identities: None,
                parameters: Parameters::new(),
                content,
                size: self.size,
                length: self.length,
            }
            .into_ref())
        }
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        self.to_listoffset64()?.offsets_and_flattened(axis, depth)
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        self.to_listoffset64()?.merge(other)
    }

    pub(crate) fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            content: self.content.fillna(value)?,
            size: self.size,
            length: self.length,
        }
        .into_ref())
    }

    pub(crate) fn is_none(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::is_none_axis0(self.length));
        }
        let trimmed = self
            .content
            .getitem_range_nowrap(0, self.size * self.length)?;
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            content: trimmed.is_none_depth(axis, depth + 1)?,
            size: self.size,
            length: self.length,
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
            let size = self.size as i64;
            if !clip && target <= size {
                return Ok(self.clone().into_ref());
            }
            let mut index = BufferMut::<i64>::with_capacity(self.length * target as usize);
            for i in 0..self.length as i64 {
                for k in 0..target {
                    index.push(if k < size { i * size + k } else { -1 });
                }
            }
            let trimmed = self
                .content
                .getitem_range_nowrap(0, self.size * self.length)?;
            let padded = IndexedOptionArray::new(index.freeze(), trimmed)
                .into_content()
                .simplify()?;
            return Ok(Self {
                identities: self.identities.clone(),
                parameters: self.parameters.clone(),
                content: padded,
                size: target as usize,
                length: self.length,
            }
            .into_ref());
        }
        let trimmed = self
            .content
            .getitem_range_nowrap(0, self.size * self.length)?;
        Ok(Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            content: trimmed.rpad_depth(target, axis, depth + 1, clip)?,
            size: self.size,
            length: self.length,
        }
        .into_ref())
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::localindex_axis0(self.length));
        }
        if axis == depth + 1 {
            let mut values = BufferMut::<i64>::with_capacity(self.length * self.size);
            for _ in 0..self.length {
                for j in 0..self.size as i64 {
                    values.push(j);
                }
            }
            let content = PrimitiveArray::from_i64(values.freeze()).into_ref();
            return Ok(Self {
                identities: None,
                parameters: Parameters::new(),
                content,
                size: self.size,
                length: self.length,
            }
            .into_ref());
        }
        let trimmed = self
            .content
            .getitem_range_nowrap(0, self.size * self.length)?;
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            content: trimmed.localindex_depth(axis, depth + 1)?,
            size: self.size,
            length: self.length,
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
        if axis == depth + 1 {
            return self
                .to_listoffset64()?
                .combinations(n, replacement, recordlookup, parameters, axis, depth);
        }
        let trimmed = self
            .content
            .getitem_range_nowrap(0, self.size * self.length)?;
        Ok(Self {
            identities: self.identities.clone(),
            parameters: Parameters::new(),
            content: trimmed.combinations_depth(
                n,
                replacement,
                recordlookup,
                parameters,
                axis,
                depth + 1,
            )?,
            size: self.size,
            length: self.length,
        }
        .into_ref())
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        if self.content.length() < self.size * self.length {
            return Some(format!(
                "at {} ({}): len(content) < size * length",
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
        sink.begin_list();
        for i in row * self.size..(row + 1) * self.size {
            self.content.tojson_row(i, sink)?;
        }
        sink.end_list();
        Ok(())
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        self.to_listoffset64()?.asslice()
    }
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use crate::contents::{Content, IntoContent, PrimitiveArray, RegularArray};
    use crate::slice::{Slice, SliceItem};

    fn squares() -> Content {
        // [[0, 1, 2], [3, 4, 5], [6, 7, 8]]
        RegularArray::try_new(
            PrimitiveArray::new(buffer![0i64, 1, 2, 3, 4, 5, 6, 7, 8]).into_ref(),
            3,
            3,
        )
        .unwrap()
        .into_content()
    }

    #[test]
    fn at_consumes_inner_axis() {
        let out = squares()
            .getitem(&Slice::new(vec![SliceItem::full_range(), SliceItem::At(-1)]).unwrap())
            .unwrap();
        let Content::Primitive(p) = out.as_ref() else {
            panic!("expected a primitive");
        };
        assert_eq!(p.as_slice::<i64>(), &[2, 5, 8]);
    }

    #[test]
    fn range_stays_regular() {
        let out = squares()
            .getitem(&Slice::new(vec![SliceItem::full_range(), SliceItem::range(1, 3)]).unwrap())
            .unwrap();
        let Content::Regular(r) = out.as_ref() else {
            panic!("expected a regular layer");
        };
        assert_eq!(r.size(), 2);
        assert_eq!(out.to_json().unwrap(), serde_json::json!([[1, 2], [4, 5], [7, 8]]));
    }

    #[test]
    fn advanced_arrays_broadcast_pairwise() {
        // squares[[0, 2], [2, 0]] -> [2, 6]
        let out = squares()
            .getitem(
                &Slice::new(vec![
                    SliceItem::array(buffer![0i64, 2]),
                    SliceItem::array(buffer![2i64, 0]),
                ])
                .unwrap(),
            )
            .unwrap();
        let Content::Primitive(p) = out.as_ref() else {
            panic!("expected a primitive");
        };
        assert_eq!(p.as_slice::<i64>(), &[2, 6]);
    }

    #[test]
    fn carry_repeats_rows() {
        let out = squares().carry(&buffer![2i64, 2, 0]).unwrap();
        assert_eq!(
            out.to_json().unwrap(),
            serde_json::json!([[6, 7, 8], [6, 7, 8], [0, 1, 2]])
        );
    }
}
