use ragged_buffer::{Buffer, BufferMut};
use ragged_error::{RaggedResult, ragged_bail};

use crate::contents::{
    Content, ContentRef, IndexedOptionArray, IntoContent, ListOffsetArray, PrimitiveArray,
    RecordArray, kernel_error, list_parts, scalar_i64, widen_index,
};
use crate::identities::IdentitiesRef;
use crate::kernels;
use crate::parameters::Parameters;
use crate::ptype::{IndexPType, PType};
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// Variable-length lists whose rows are independent `starts[i]..stops[i]`
/// windows into the content. Rows may overlap, be out of order, or leave
/// gaps.
#[derive(Clone, Debug, PartialEq)]
pub struct ListArray<O: IndexPType> {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    starts: Buffer<O>,
    stops: Buffer<O>,
    content: ContentRef,
}

impl<O: IndexPType> ListArray<O>
where
    Self: IntoContent,
    ListOffsetArray<i64>: IntoContent,
{
    /// Lists over independent row windows.
    pub fn try_new(
        starts: Buffer<O>,
        stops: Buffer<O>,
        content: ContentRef,
    ) -> RaggedResult<Self> {
        if stops.len() < starts.len() {
            ragged_bail!(
                ValidityError: "in {}: len(stops) {} < len(starts) {}",
                Self::static_classname(),
                stops.len(),
                starts.len()
            );
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            starts,
            stops,
            content,
        })
    }

    pub(crate) fn from_parts(
        identities: Option<IdentitiesRef>,
        parameters: Parameters,
        starts: Buffer<O>,
        stops: Buffer<O>,
        content: ContentRef,
    ) -> Self {
        Self {
            identities,
            parameters,
            starts,
            stops,
            content,
        }
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// The row window starts.
    pub fn starts(&self) -> &Buffer<O> {
        &self.starts
    }

    /// The row window stops.
    pub fn stops(&self) -> &Buffer<O> {
        &self.stops
    }

    /// The list payload.
    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    fn static_classname() -> &'static str {
        match O::PTYPE {
            PType::I32 => "ListArray32",
            PType::U32 => "ListArrayU32",
            _ => "ListArray64",
        }
    }

    /// The stops trimmed to the row count.
    fn trimmed_stops(&self) -> Buffer<O> {
        self.stops.slice(0..self.starts.len())
    }

    /// Rewrite as compact offset-addressed lists, gathering the content so
    /// rows become contiguous and start at zero.
    pub fn to_listoffset64(&self) -> RaggedResult<ListOffsetArray<i64>> {
        let stops = self.trimmed_stops();
        let offsets = kernels::compact_offsets(self.starts.as_slice(), stops.as_slice())
            .map_err(|e| kernel_error(self.classname(), e))?;
        let total = *offsets.as_slice().last().unwrap_or(&0) as usize;
        let carry =
            kernels::list_broadcast_carry(self.starts.as_slice(), stops.as_slice(), total);
        let content = self.content.carry(&carry)?;
        Ok(ListOffsetArray::<i64>::try_new(offsets, content)?
            .with_parameters(self.parameters.clone())
            .with_identities(self.identities.clone()))
    }

    pub(crate) fn classname(&self) -> &'static str {
        Self::static_classname()
    }

    pub(crate) fn length(&self) -> usize {
        self.starts.len()
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
            out.starts = Buffer::copy_from(self.starts.as_slice());
            out.stops = Buffer::copy_from(self.stops.as_slice());
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

    fn row_window(&self, at: usize) -> RaggedResult<(usize, usize)> {
        let start: i64 = num_traits::AsPrimitive::<i64>::as_(self.starts.as_slice()[at]);
        let stop: i64 = num_traits::AsPrimitive::<i64>::as_(self.stops.as_slice()[at]);
        if start < 0 || stop < start || stop as usize > self.content.length() {
            ragged_bail!(
                ValidityError: "in {}: row window [{}, {}) is malformed at i={}",
                self.classname(),
                start,
                stop,
                at
            );
        }
        Ok((start as usize, stop as usize))
    }

    pub(crate) fn getitem_at_nowrap(&self, at: usize) -> RaggedResult<ContentRef> {
        let (start, stop) = self.row_window(at)?;
        self.content.getitem_range_nowrap(start, stop)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: crate::identities::range_identities(self.identities.as_ref(), start, stop),
            parameters: self.parameters.clone(),
            starts: self.starts.slice(start..stop),
            stops: self.stops.slice(start..stop),
            content: self.content.clone(),
        }
        .into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            starts: self.starts.clone(),
            stops: self.stops.clone(),
            content: self.content.getitem_field(key)?,
        }
        .into_ref())
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            starts: self.starts.clone(),
            stops: self.stops.clone(),
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
        let stops = self.trimmed_stops();
        match head {
            SliceItem::At(at) => {
                let nextcarry = kernels::list_at(self.starts.as_slice(), stops.as_slice(), *at)
                    .map_err(|e| kernel_error(self.classname(), e))?;
                let next = self.content.carry(&nextcarry)?;
                next.getitem_next(tail.head(), &tail.tail(), advanced)
            }
            SliceItem::Range { start, stop, step } => {
                let (offsets, nextcarry) = kernels::list_range(
                    self.starts.as_slice(),
                    stops.as_slice(),
                    *start,
                    *stop,
                    *step,
                )
                .map_err(|e| kernel_error(self.classname(), e))?;
                let next = self.content.carry(&nextcarry)?;
                let out = match advanced {
                    None => next.getitem_next(tail.head(), &tail.tail(), None)?,
                    Some(advanced) => {
                        let nextadvanced =
                            kernels::spread_advanced(advanced.as_slice(), offsets.as_slice());
                        next.getitem_next(tail.head(), &tail.tail(), Some(&nextadvanced))?
                    }
                };
                Ok(ListOffsetArray::<i64>::try_new(offsets, out)?
                    .with_parameters(self.parameters.clone())
                    .with_identities(self.identities.clone())
                    .into_ref())
            }
            SliceItem::Array { index, shape } => match advanced {
                None => {
                    let (nextcarry, nextadvanced) = kernels::list_array(
                        self.starts.as_slice(),
                        stops.as_slice(),
                        index.as_slice(),
                    )
                    .map_err(|e| kernel_error(self.classname(), e))?;
                    let next = self.content.carry(&nextcarry)?;
                    let out = next.getitem_next(tail.head(), &tail.tail(), Some(&nextadvanced))?;
                    Content::getitem_next_array_wrap(out, shape)
                }
                Some(advanced) => {
                    let (nextcarry, nextadvanced) = kernels::list_array_advanced(
                        self.starts.as_slice(),
                        stops.as_slice(),
                        index.as_slice(),
                        advanced.as_slice(),
                    )
                    .map_err(|e| kernel_error(self.classname(), e))?;
                    let next = self.content.carry(&nextcarry)?;
                    next.getitem_next(tail.head(), &tail.tail(), Some(&nextadvanced))
                }
            },
            SliceItem::Jagged { offsets, item } => {
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
                self.getitem_next_jagged(&slicestarts, &slicestops, item, tail)
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
        if slicestarts.len() != self.length() {
            ragged_bail!(
                "cannot fit jagged slice with length {} into {} of length {}",
                slicestarts.len(),
                self.classname(),
                self.length()
            );
        }
        let stops = self.trimmed_stops();
        match item {
            SliceItem::Array { index, .. } => {
                let (outoffsets, nextcarry) = kernels::jagged_apply(
                    slicestarts.as_slice(),
                    slicestops.as_slice(),
                    index.as_slice(),
                    self.starts.as_slice(),
                    stops.as_slice(),
                )
                .map_err(|e| kernel_error(self.classname(), e))?;
                let next = self.content.carry(&nextcarry)?;
                let out = next.getitem_next(tail.head(), &tail.tail(), None)?;
                Ok(ListOffsetArray::<i64>::try_new(outoffsets, out)?.into_ref())
            }
            SliceItem::Missing { index, item } => {
                let SliceItem::Array { index: valids, .. } = item.as_ref() else {
                    ragged_bail!(Internal: "missing slice does not select with an array");
                };
                let (outoffsets, outindex, nextcarry) = kernels::jagged_apply_missing(
                    slicestarts.as_slice(),
                    slicestops.as_slice(),
                    index.as_slice(),
                    valids.as_slice(),
                    self.starts.as_slice(),
                    stops.as_slice(),
                )
                .map_err(|e| kernel_error(self.classname(), e))?;
                let next = self.content.carry(&nextcarry)?;
                let out = next.getitem_next(tail.head(), &tail.tail(), None)?;
                let wrapped = IndexedOptionArray::new(outindex, out)
                    .into_content()
                    .simplify()?;
                Ok(ListOffsetArray::<i64>::try_new(outoffsets, wrapped)?.into_ref())
            }
            SliceItem::Jagged { offsets: inneroffsets, item: inneritem } => {
                let mut nextcarry = BufferMut::<i64>::empty();
                let mut downstarts = BufferMut::<i64>::empty();
                let mut downstops = BufferMut::<i64>::empty();
                let mut outoffsets = BufferMut::<i64>::with_capacity(self.length() + 1);
                outoffsets.push(0);
                let mut total = 0i64;
                for i in 0..self.length() {
                    let (start, stop) = self.row_window(i)?;
                    let rowlen = (stop - start) as i64;
                    let slicelen = slicestops.as_slice()[i] - slicestarts.as_slice()[i];
                    if slicelen != rowlen {
                        ragged_bail!(
                            "cannot fit jagged slice of size {} into {} row of size {} at i={}",
                            slicelen,
                            self.classname(),
                            rowlen,
                            i
                        );
                    }
                    for k in 0..rowlen {
                        let w = (slicestarts.as_slice()[i] + k) as usize;
                        if w + 1 >= inneroffsets.len() {
                            ragged_bail!(
                                ValidityError: "in {}: jagged slice window out of range at i={}",
                                self.classname(),
                                i
                            );
                        }
                        nextcarry.push(start as i64 + k);
                        downstarts.push(inneroffsets.as_slice()[w]);
                        downstops.push(inneroffsets.as_slice()[w + 1]);
                    }
                    total += rowlen;
                    outoffsets.push(total);
                }
                let next = self.content.carry(&nextcarry.freeze())?;
                let out = next.getitem_next_jagged(
                    &downstarts.freeze(),
                    &downstops.freeze(),
                    inneritem,
                    tail,
                )?;
                Ok(ListOffsetArray::<i64>::try_new(outoffsets.freeze(), out)?.into_ref())
            }
            _ => ragged_bail!(Internal: "unhandled jagged slice item for {}", self.classname()),
        }
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        let stops = self.trimmed_stops();
        let nextstarts = kernels::index_carry(self.starts.as_slice(), carry.as_slice())
            .map_err(|e| kernel_error(self.classname(), e))?;
        let nextstops = kernels::index_carry(stops.as_slice(), carry.as_slice())
            .map_err(|e| kernel_error(self.classname(), e))?;
        let identities = crate::identities::carry_identities(self.identities.as_ref(), carry)?;
        Ok(Self {
            identities,
            parameters: self.parameters.clone(),
            starts: nextstarts,
            stops: nextstops,
            content: self.content.clone(),
        }
        .into_ref())
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(scalar_i64(self.length() as i64));
        }
        if axis == depth + 1 {
            let stops = self.trimmed_stops();
            let counts = Buffer::from_iter(self.starts.iter().zip(stops.iter()).map(
                |(&start, &stop)| {
                    let start: i64 = num_traits::AsPrimitive::<i64>::as_(start);
                    let stop: i64 = num_traits::AsPrimitive::<i64>::as_(stop);
                    stop - start
                },
            ));
            return Ok(PrimitiveArray::from_i64(counts).into_ref());
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            starts: self.starts.clone(),
            stops: self.stops.clone(),
            content: self.content.num_depth(axis, depth + 1)?,
        }
        .into_ref())
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        self.to_listoffset64()?.offsets_and_flattened(axis, depth)
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let mystarts = widen_index(&self.starts);
        let mystops = widen_index(&self.trimmed_stops());
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
            starts: self.starts.clone(),
            stops: self.stops.clone(),
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
            starts: self.starts.clone(),
            stops: self.stops.clone(),
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
            let mut offsets = BufferMut::<i64>::with_capacity(self.length() + 1);
            let mut index = BufferMut::<i64>::empty();
            offsets.push(0);
            let mut total = 0i64;
            for i in 0..self.length() {
                let (start, stop) = self.row_window(i)?;
                let rowlen = (stop - start) as i64;
                let rowout = if clip { target } else { rowlen.max(target) };
                for k in 0..rowout {
                    index.push(if k < rowlen { start as i64 + k } else { -1 });
                }
                total += rowout;
                offsets.push(total);
            }
            let padded = IndexedOptionArray::new(index.freeze(), self.content.clone())
                .into_content()
                .simplify()?;
            return Ok(ListOffsetArray::<i64>::try_new(offsets.freeze(), padded)?
                .with_parameters(self.parameters.clone())
                .into_ref());
        }
        Ok(Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            starts: self.starts.clone(),
            stops: self.stops.clone(),
            content: self.content.rpad_depth(target, axis, depth + 1, clip)?,
        }
        .into_ref())
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::localindex_axis0(self.length()));
        }
        if axis == depth + 1 {
            let stops = self.trimmed_stops();
            let offsets = kernels::compact_offsets(self.starts.as_slice(), stops.as_slice())
                .map_err(|e| kernel_error(self.classname(), e))?;
            let mut values = BufferMut::<i64>::empty();
            for i in 0..self.length() {
                let count = offsets.as_slice()[i + 1] - offsets.as_slice()[i];
                for k in 0..count {
                    values.push(k);
                }
            }
            let content = PrimitiveArray::from_i64(values.freeze()).into_ref();
            return Ok(ListOffsetArray::<i64>::try_new(offsets, content)?.into_ref());
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            starts: self.starts.clone(),
            stops: self.stops.clone(),
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
        if axis == depth + 1 {
            let starts = widen_index(&self.starts);
            let stops = widen_index(&self.trimmed_stops());
            let (offsets, tocarries) = kernels::list_combinations(
                starts.as_slice(),
                stops.as_slice(),
                n as usize,
                replacement,
            );
            let total = *offsets.as_slice().last().unwrap_or(&0) as usize;
            let mut contents = Vec::with_capacity(tocarries.len());
            for tocarry in &tocarries {
                contents.push(self.content.carry(tocarry)?);
            }
            let record = RecordArray::try_new(contents, recordlookup.cloned(), Some(total))?
                .with_parameters(parameters.clone());
            return Ok(ListOffsetArray::<i64>::try_new(offsets, record.into_ref())?.into_ref());
        }
        Ok(Self {
            identities: self.identities.clone(),
            parameters: Parameters::new(),
            starts: self.starts.clone(),
            stops: self.stops.clone(),
            content: self.content.combinations_depth(
                n,
                replacement,
                recordlookup,
                parameters,
                axis,
                depth + 1,
            )?,
        }
        .into_ref())
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        if self.stops.len() < self.starts.len() {
            return Some(format!(
                "at {} ({}): len(stops) < len(starts)",
                path,
                self.classname()
            ));
        }
        let contentlen = self.content.length() as i64;
        for i in 0..self.starts.len() {
            let start: i64 = num_traits::AsPrimitive::<i64>::as_(self.starts.as_slice()[i]);
            let stop: i64 = num_traits::AsPrimitive::<i64>::as_(self.stops.as_slice()[i]);
            if start < 0 {
                return Some(format!(
                    "at {} ({}): starts[i] < 0 at i={}",
                    path,
                    self.classname(),
                    i
                ));
            }
            if stop < start {
                return Some(format!(
                    "at {} ({}): stops[i] < starts[i] at i={}",
                    path,
                    self.classname(),
                    i
                ));
            }
            if stop > contentlen {
                return Some(format!(
                    "at {} ({}): stops[i] > len(content) at i={}",
                    path,
                    self.classname(),
                    i
                ));
            }
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
        let (start, stop) = self.row_window(row)?;
        sink.begin_list();
        for k in start..stop {
            self.content.tojson_row(k, sink)?;
        }
        sink.end_list();
        Ok(())
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        self.to_listoffset64()?.asslice()
    }
}

/// Concatenate a list-like left operand with a list-like right operand,
/// producing 64-bit lists over the merged content.
pub(crate) fn merge_list_parts(
    left: (&Buffer<i64>, &Buffer<i64>, &ContentRef),
    other: &ContentRef,
    classname: &str,
) -> RaggedResult<ContentRef> {
    let (mystarts, mystops, mycontent) = left;
    let Some((theirstarts, theirstops, theircontent)) = list_parts(other.as_ref()) else {
        ragged_bail!("cannot merge {} with {}", classname, other.classname());
    };
    let mycontentlength = mycontent.length() as i64;
    let mut starts = BufferMut::<i64>::with_capacity(mystarts.len() + theirstarts.len());
    let mut stops = BufferMut::<i64>::with_capacity(mystarts.len() + theirstarts.len());
    starts.extend_from_slice(mystarts.as_slice());
    stops.extend_from_slice(mystops.as_slice());
    for i in 0..theirstarts.len() {
        starts.push(theirstarts.as_slice()[i] + mycontentlength);
        stops.push(theirstops.as_slice()[i] + mycontentlength);
    }
    let content = mycontent.merge(&theircontent)?;
    Ok(ListArray::<i64>::try_new(starts.freeze(), stops.freeze(), content)?.into_ref())
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use crate::contents::{Content, IntoContent, ListArray, PrimitiveArray};
    use crate::slice::{Slice, SliceItem};

    fn jagged() -> Content {
        // [[1, 2, 3], [], [4, 5]]
        ListArray::try_new(
            buffer![0i64, 3, 3],
            buffer![3i64, 3, 5],
            PrimitiveArray::new(buffer![1i64, 2, 3, 4, 5]).into_ref(),
        )
        .unwrap()
        .into_content()
    }

    #[test]
    fn rows_are_windows() {
        let array = jagged();
        assert_eq!(array.length(), 3);
        assert_eq!(
            array.to_json().unwrap(),
            serde_json::json!([[1, 2, 3], [], [4, 5]])
        );
        assert_eq!(array.getitem_at(1).unwrap().length(), 0);
    }

    #[test]
    fn range_slices_every_row() {
        let out = jagged()
            .getitem(&Slice::new(vec![SliceItem::full_range(), SliceItem::range(1, 3)]).unwrap())
            .unwrap();
        assert_eq!(out.to_json().unwrap(), serde_json::json!([[2, 3], [], [5]]));
    }

    #[test]
    fn negative_at_wraps_per_row() {
        let out = jagged()
            .getitem(
                &Slice::new(vec![
                    SliceItem::array(buffer![0i64, 2]),
                    SliceItem::At(-1),
                ])
                .unwrap(),
            )
            .unwrap();
        let Content::Primitive(p) = out.as_ref() else {
            panic!("expected a primitive");
        };
        assert_eq!(p.as_slice::<i64>(), &[3, 5]);
    }

    #[test]
    fn jagged_slice_selects_per_row() {
        // array[[[2, 0], [], [1]]]
        let slice = SliceItem::Jagged {
            offsets: buffer![0i64, 2, 2, 3],
            item: Box::new(SliceItem::array(buffer![2i64, 0, 1])),
        };
        let out = jagged().getitem(&Slice::new(vec![slice]).unwrap()).unwrap();
        assert_eq!(out.to_json().unwrap(), serde_json::json!([[3, 1], [], [5]]));
    }

    #[test]
    fn num_counts_rows() {
        let counts = jagged().num(1).unwrap();
        let Content::Primitive(p) = counts.as_ref() else {
            panic!("expected a primitive");
        };
        assert_eq!(p.as_slice::<i64>(), &[3, 0, 2]);
    }

    #[test]
    fn non_contiguous_rows_survive_validity() {
        // Overlapping windows are legal.
        let array = ListArray::try_new(
            buffer![2i64, 0],
            buffer![5i64, 3],
            PrimitiveArray::new(buffer![1i64, 2, 3, 4, 5]).into_ref(),
        )
        .unwrap()
        .into_content();
        assert!(array.validityerror("layout").is_none());
        assert_eq!(array.to_json().unwrap(), serde_json::json!([[3, 4, 5], [1, 2, 3]]));
    }
}
