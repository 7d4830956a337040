//! Native loops standing in for the stateless buffer kernels.
//!
//! Each kernel operates on plain slices and reports failures as a flat
//! [`KernelError`] carrying a static message and the offending position.
//! Callers attach node context (class name, identity) through one uniform
//! handler before surfacing the error.

use num_traits::AsPrimitive;
use ragged_buffer::{Buffer, BufferMut};

use crate::ptype::IndexPType;

/// A kernel failure: a static message plus the position it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelError {
    /// What went wrong.
    pub message: &'static str,
    /// The element index the failure refers to, when one exists.
    pub at: Option<i64>,
}

/// The result type of every kernel.
pub type KernelResult<T = ()> = Result<T, KernelError>;

fn fail<T>(message: &'static str) -> KernelResult<T> {
    Err(KernelError { message, at: None })
}

fn fail_at<T>(message: &'static str, at: i64) -> KernelResult<T> {
    Err(KernelError {
        message,
        at: Some(at),
    })
}

/// `out[i] = i`.
pub fn carry_arange(length: usize) -> Buffer<i64> {
    Buffer::from_iter(0..length as i64)
}

/// Wrap a possibly-negative position and check it against `length`.
pub fn regularize_index(at: i64, length: i64) -> KernelResult<i64> {
    let mut regular = at;
    if regular < 0 {
        regular += length;
    }
    if regular < 0 || regular >= length {
        return fail_at("index out of range", at);
    }
    Ok(regular)
}

/// Normalize a python-style `start:stop:step` range against `length`,
/// returning the effective start, step and element count.
pub fn regularize_range(
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
    length: i64,
) -> KernelResult<(i64, i64, i64)> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return fail("slice step cannot be zero");
    }

    let (lower, upper) = if step > 0 { (0, length) } else { (-1, length - 1) };

    let start = match start {
        None => {
            if step > 0 {
                0
            } else {
                length - 1
            }
        }
        Some(s) if s < 0 => (s + length).max(lower),
        Some(s) => s.min(upper),
    };
    let stop = match stop {
        None => {
            if step > 0 {
                length
            } else {
                -1
            }
        }
        Some(e) if e < 0 => (e + length).max(lower),
        Some(e) => e.min(upper),
    };

    let count = if step > 0 {
        (stop - start + step - 1).div_euclid(step).max(0)
    } else {
        (stop - start + step + 1).div_euclid(step).max(0)
    };
    Ok((start, step, count))
}

/// Gather `index` through `carry`, checking that every carry position is
/// within `index`.
pub fn index_carry<O: IndexPType>(index: &[O], carry: &[i64]) -> KernelResult<Buffer<O>> {
    let len = index.len() as i64;
    let mut out = BufferMut::<O>::with_capacity(carry.len());
    for (i, &k) in carry.iter().enumerate() {
        if k < 0 || k >= len {
            return fail_at("index out of range", i as i64);
        }
        out.push(index[k as usize]);
    }
    Ok(out.freeze())
}

/// Gather `index` through `carry` without validating positions. Positions
/// are trusted to have been produced by a checked kernel.
pub fn index_carry_nocheck<O: IndexPType>(index: &[O], carry: &[i64]) -> Buffer<O> {
    Buffer::from_iter(carry.iter().map(|&k| index[k as usize]))
}

/// `offsets[i + 1] - offsets[i] = stops[i] - starts[i]`, anchored at zero.
pub fn compact_offsets<O: IndexPType>(starts: &[O], stops: &[O]) -> KernelResult<Buffer<i64>> {
    let mut out = BufferMut::<i64>::with_capacity(starts.len() + 1);
    let mut total = 0i64;
    out.push(0);
    for i in 0..starts.len() {
        let (start, stop): (i64, i64) = (starts[i].as_(), stops[i].as_());
        if stop < start {
            return fail_at("stops[i] < starts[i]", i as i64);
        }
        total += stop - start;
        out.push(total);
    }
    Ok(out.freeze())
}

/// Flatten every list row into one carry: positions
/// `starts[i], starts[i]+1, .., stops[i]-1` in row order.
pub fn list_broadcast_carry<O: IndexPType>(
    starts: &[O],
    stops: &[O],
    total: usize,
) -> Buffer<i64> {
    let mut out = BufferMut::<i64>::with_capacity(total);
    for i in 0..starts.len() {
        let (start, stop): (i64, i64) = (starts[i].as_(), stops[i].as_());
        for k in start..stop {
            out.push(k);
        }
    }
    out.freeze()
}

/// Compose outer list offsets through inner list offsets:
/// `out[i] = inner[outer[i]]`.
pub fn flatten_offsets(outer: &[i64], inner: &[i64]) -> KernelResult<Buffer<i64>> {
    let mut out = BufferMut::<i64>::with_capacity(outer.len());
    for (i, &o) in outer.iter().enumerate() {
        if o < 0 || o as usize >= inner.len() {
            return fail_at("flattening offset exceeds inner offsets", i as i64);
        }
        out.push(inner[o as usize]);
    }
    Ok(out.freeze())
}

/// Per-row integer lookup: `out[i] = starts[i] + wrap(at, row length)`.
pub fn list_at<O: IndexPType>(starts: &[O], stops: &[O], at: i64) -> KernelResult<Buffer<i64>> {
    let mut out = BufferMut::<i64>::with_capacity(starts.len());
    for i in 0..starts.len() {
        let (start, stop): (i64, i64) = (starts[i].as_(), stops[i].as_());
        let length = stop - start;
        let mut regular = at;
        if regular < 0 {
            regular += length;
        }
        if regular < 0 || regular >= length {
            return fail_at("index out of range", i as i64);
        }
        out.push(start + regular);
    }
    Ok(out.freeze())
}

/// Per-row range: normalizes the range against each row's length, returning
/// the resulting row offsets and the flat gather positions.
pub fn list_range<O: IndexPType>(
    starts: &[O],
    stops: &[O],
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> KernelResult<(Buffer<i64>, Buffer<i64>)> {
    let mut offsets = BufferMut::<i64>::with_capacity(starts.len() + 1);
    let mut carry = BufferMut::<i64>::empty();
    offsets.push(0);
    let mut total = 0i64;
    for i in 0..starts.len() {
        let (rowstart, rowstop): (i64, i64) = (starts[i].as_(), stops[i].as_());
        let (first, step, count) = regularize_range(start, stop, step, rowstop - rowstart)?;
        for k in 0..count {
            carry.push(rowstart + first + k * step);
        }
        total += count;
        offsets.push(total);
    }
    Ok((offsets.freeze(), carry.freeze()))
}

/// Copy each row's advanced position across that row's output elements.
pub fn spread_advanced(advanced: &[i64], offsets: &[i64]) -> Buffer<i64> {
    let total = *offsets.last().unwrap_or(&0) as usize;
    let mut out = BufferMut::<i64>::with_capacity(total);
    for i in 0..offsets.len().saturating_sub(1) {
        out.push_n(advanced[i], (offsets[i + 1] - offsets[i]) as usize);
    }
    out.freeze()
}

/// Per-row advanced gather: `out[i*m + j] = starts[i] + wrap(head[j])`,
/// recording the within-head position `j` for broadcasting.
pub fn list_array<O: IndexPType>(
    starts: &[O],
    stops: &[O],
    flathead: &[i64],
) -> KernelResult<(Buffer<i64>, Buffer<i64>)> {
    let m = flathead.len();
    let mut carry = BufferMut::<i64>::with_capacity(starts.len() * m);
    let mut advanced = BufferMut::<i64>::with_capacity(starts.len() * m);
    for i in 0..starts.len() {
        let (start, stop): (i64, i64) = (starts[i].as_(), stops[i].as_());
        let length = stop - start;
        for (j, &h) in flathead.iter().enumerate() {
            let mut regular = h;
            if regular < 0 {
                regular += length;
            }
            if regular < 0 || regular >= length {
                return fail_at("index out of range", i as i64);
            }
            carry.push(start + regular);
            advanced.push(j as i64);
        }
    }
    Ok((carry.freeze(), advanced.freeze()))
}

/// Broadcast an already-advanced gather: each row takes a single element,
/// `out[i] = starts[i] + wrap(head[advanced[i]])`.
pub fn list_array_advanced<O: IndexPType>(
    starts: &[O],
    stops: &[O],
    flathead: &[i64],
    advanced: &[i64],
) -> KernelResult<(Buffer<i64>, Buffer<i64>)> {
    let mut carry = BufferMut::<i64>::with_capacity(starts.len());
    let mut nextadvanced = BufferMut::<i64>::with_capacity(starts.len());
    for i in 0..starts.len() {
        let (start, stop): (i64, i64) = (starts[i].as_(), stops[i].as_());
        let length = stop - start;
        let j = advanced[i];
        if j < 0 || j as usize >= flathead.len() {
            return fail_at("advanced index out of range", i as i64);
        }
        let mut regular = flathead[j as usize];
        if regular < 0 {
            regular += length;
        }
        if regular < 0 || regular >= length {
            return fail_at("index out of range", i as i64);
        }
        carry.push(start + regular);
        nextadvanced.push(j);
    }
    Ok((carry.freeze(), nextadvanced.freeze()))
}

/// Apply a jagged slice of flat positions: for each row, gather the
/// positions in the row's slice window against the row's elements.
pub fn jagged_apply<O: IndexPType>(
    slicestarts: &[i64],
    slicestops: &[i64],
    sliceindex: &[i64],
    starts: &[O],
    stops: &[O],
) -> KernelResult<(Buffer<i64>, Buffer<i64>)> {
    let mut offsets = BufferMut::<i64>::with_capacity(starts.len() + 1);
    let mut carry = BufferMut::<i64>::empty();
    offsets.push(0);
    let mut total = 0i64;
    for i in 0..starts.len() {
        let (rowstart, rowstop): (i64, i64) = (starts[i].as_(), stops[i].as_());
        let rowlength = rowstop - rowstart;
        let (wstart, wstop) = (slicestarts[i], slicestops[i]);
        if wstart < 0 || wstop < wstart || wstop as usize > sliceindex.len() {
            return fail_at("jagged slice window out of range", i as i64);
        }
        for w in wstart..wstop {
            let mut regular = sliceindex[w as usize];
            if regular < 0 {
                regular += rowlength;
            }
            if regular < 0 || regular >= rowlength {
                return fail_at("index out of range", i as i64);
            }
            carry.push(rowstart + regular);
        }
        total += wstop - wstart;
        offsets.push(total);
    }
    Ok((offsets.freeze(), carry.freeze()))
}

/// Apply a jagged slice of option-typed positions. Missing entries pass
/// through as `-1` in the returned per-element index; present entries
/// resolve through `valids` (the compact array of present positions) and
/// append to the gather.
pub fn jagged_apply_missing<O: IndexPType>(
    slicestarts: &[i64],
    slicestops: &[i64],
    missingindex: &[i64],
    valids: &[i64],
    starts: &[O],
    stops: &[O],
) -> KernelResult<(Buffer<i64>, Buffer<i64>, Buffer<i64>)> {
    let mut offsets = BufferMut::<i64>::with_capacity(starts.len() + 1);
    let mut outindex = BufferMut::<i64>::empty();
    let mut carry = BufferMut::<i64>::empty();
    offsets.push(0);
    let mut total = 0i64;
    let mut numvalid = 0i64;
    for i in 0..starts.len() {
        let (rowstart, rowstop): (i64, i64) = (starts[i].as_(), stops[i].as_());
        let rowlength = rowstop - rowstart;
        let (wstart, wstop) = (slicestarts[i], slicestops[i]);
        if wstart < 0 || wstop < wstart || wstop as usize > missingindex.len() {
            return fail_at("jagged slice window out of range", i as i64);
        }
        for w in wstart..wstop {
            let m = missingindex[w as usize];
            if m < 0 {
                outindex.push(-1);
            } else {
                if m as usize >= valids.len() {
                    return fail_at("missing slice index out of range", i as i64);
                }
                let mut regular = valids[m as usize];
                if regular < 0 {
                    regular += rowlength;
                }
                if regular < 0 || regular >= rowlength {
                    return fail_at("index out of range", i as i64);
                }
                carry.push(rowstart + regular);
                outindex.push(numvalid);
                numvalid += 1;
            }
        }
        total += wstop - wstart;
        offsets.push(total);
    }
    Ok((offsets.freeze(), outindex.freeze(), carry.freeze()))
}

/// Partition the missing rows out of a byte mask: the gather of present
/// rows, and a per-row index that is `-1` where missing.
pub fn bytemask_carry_outindex(mask: &[i8], valid_when: bool) -> (Buffer<i64>, Buffer<i64>, usize) {
    let mut carry = BufferMut::<i64>::empty();
    let mut outindex = BufferMut::<i64>::with_capacity(mask.len());
    let mut numnull = 0usize;
    for (i, &m) in mask.iter().enumerate() {
        if (m != 0) == valid_when {
            outindex.push(carry.len() as i64);
            carry.push(i as i64);
        } else {
            outindex.push(-1);
            numnull += 1;
        }
    }
    (carry.freeze(), outindex.freeze(), numnull)
}

/// Partition the missing rows out of an option index: the gather of present
/// content positions, and a per-row index that is `-1` where missing.
pub fn indexedoption_carry_outindex<O: IndexPType>(
    index: &[O],
    lencontent: usize,
) -> KernelResult<(Buffer<i64>, Buffer<i64>, usize)> {
    let mut carry = BufferMut::<i64>::empty();
    let mut outindex = BufferMut::<i64>::with_capacity(index.len());
    let mut numnull = 0usize;
    for (i, &ix) in index.iter().enumerate() {
        let ix: i64 = ix.as_();
        if ix < 0 {
            outindex.push(-1);
            numnull += 1;
        } else {
            if ix as usize >= lencontent {
                return fail_at("index[i] > len(content)", i as i64);
            }
            outindex.push(carry.len() as i64);
            carry.push(ix);
        }
    }
    Ok((carry.freeze(), outindex.freeze(), numnull))
}

/// The gather positions of a never-null index, bounds-checked.
pub fn indexed_carry<O: IndexPType>(index: &[O], lencontent: usize) -> KernelResult<Buffer<i64>> {
    let mut out = BufferMut::<i64>::with_capacity(index.len());
    for (i, &ix) in index.iter().enumerate() {
        let ix: i64 = ix.as_();
        if ix < 0 || ix as usize >= lencontent {
            return fail_at("index[i] > len(content)", i as i64);
        }
        out.push(ix);
    }
    Ok(out.freeze())
}

/// Unpack a packed bitmask into one byte per element.
pub fn bitmask_to_bytemask(mask: &[u8], lsb_order: bool, length: usize) -> Buffer<i8> {
    let mut out = BufferMut::<i8>::with_capacity(length);
    for i in 0..length {
        let byte = mask[i / 8];
        let bit = if lsb_order {
            (byte >> (i % 8)) & 1
        } else {
            (byte >> (7 - i % 8)) & 1
        };
        out.push(bit as i8);
    }
    out.freeze()
}

/// Per-arm running position: `out[i]` counts how many earlier rows share
/// `tags[i]`.
pub fn union_regular_index<I: IndexPType>(tags: &[i8]) -> Buffer<I> {
    let mut counters = [0i64; 128];
    let mut out = BufferMut::<I>::with_capacity(tags.len());
    for &tag in tags {
        let n = &mut counters[tag.max(0) as usize];
        out.push(I::from_i64(*n).unwrap_or_else(I::zero));
        *n += 1;
    }
    out.freeze()
}

/// The content positions of the rows whose tag is `which`, in row order.
pub fn union_project<I: IndexPType>(
    tags: &[i8],
    index: &[I],
    which: i64,
) -> KernelResult<Buffer<i64>> {
    let mut out = BufferMut::<i64>::empty();
    for i in 0..tags.len() {
        if tags[i] as i64 == which {
            let ix: i64 = index[i].as_();
            if ix < 0 {
                return fail_at("index[i] < 0", i as i64);
            }
            out.push(ix);
        }
    }
    Ok(out.freeze())
}

/// Remap the rows of outer arm `fromwhich` onto canonical arm `towhich`,
/// offsetting their positions by `base`.
pub fn union_simplify_one<OI: IndexPType>(
    totags: &mut [i8],
    toindex: &mut [i64],
    outer_tags: &[i8],
    outer_index: &[OI],
    towhich: usize,
    fromwhich: usize,
    base: i64,
) {
    for i in 0..outer_tags.len() {
        if outer_tags[i] as usize == fromwhich {
            totags[i] = towhich as i8;
            toindex[i] = base + outer_index[i].as_::<i64>();
        }
    }
}

/// Remap the rows of inner arm `fromwhichj` of the nested union at outer arm
/// `fromwhichi` onto canonical arm `towhich`, offsetting by `base`.
pub fn union_simplify_nested<OI: IndexPType, II: IndexPType>(
    totags: &mut [i8],
    toindex: &mut [i64],
    outer_tags: &[i8],
    outer_index: &[OI],
    inner_tags: &[i8],
    inner_index: &[II],
    towhich: usize,
    fromwhichj: usize,
    fromwhichi: usize,
    base: i64,
) -> KernelResult<()> {
    for i in 0..outer_tags.len() {
        if outer_tags[i] as usize == fromwhichi {
            let oi: i64 = outer_index[i].as_();
            if oi < 0 || oi as usize >= inner_tags.len() {
                return fail_at("index[i] > len(content)", i as i64);
            }
            if inner_tags[oi as usize] as usize == fromwhichj {
                totags[i] = towhich as i8;
                toindex[i] = base + inner_index[oi as usize].as_::<i64>();
            }
        }
    }
    Ok(())
}

/// Write `length` copies of `tag` starting at `offset`.
pub fn union_filltags_const(totags: &mut [i8], offset: usize, length: usize, tag: i64) {
    for slot in totags.iter_mut().skip(offset).take(length) {
        *slot = tag as i8;
    }
}

/// Copy tags, rebasing each by `base`.
pub fn union_filltags_from(totags: &mut [i8], offset: usize, fromtags: &[i8], base: i64) {
    for (i, &tag) in fromtags.iter().enumerate() {
        totags[offset + i] = (tag as i64 + base) as i8;
    }
}

/// Write `0, 1, 2, ..` starting at `offset`.
pub fn union_fillindex_count(toindex: &mut [i64], offset: usize, length: usize) {
    for (i, slot) in toindex.iter_mut().skip(offset).take(length).enumerate() {
        *slot = i as i64;
    }
}

/// Copy index positions, widening to 64 bits.
pub fn union_fillindex_from<I: IndexPType>(toindex: &mut [i64], offset: usize, fromindex: &[I]) {
    for (i, &ix) in fromindex.iter().enumerate() {
        toindex[offset + i] = ix.as_();
    }
}

/// Total flattened length of a union whose arms all produced row offsets.
pub fn union_flatten_length<I: IndexPType>(
    tags: &[i8],
    index: &[I],
    offsetsraws: &[&[i64]],
) -> KernelResult<i64> {
    let mut total = 0i64;
    for i in 0..tags.len() {
        let which = tags[i] as usize;
        if which >= offsetsraws.len() {
            return fail_at("tags[i] >= len(contents)", i as i64);
        }
        let offsets = offsetsraws[which];
        let ix: i64 = index[i].as_();
        if ix < 0 || (ix + 1) as usize >= offsets.len() {
            return fail_at("index[i] > len(content)", i as i64);
        }
        total += offsets[(ix + 1) as usize] - offsets[ix as usize];
    }
    Ok(total)
}

/// Flatten a union of list arms: per output element, the arm tag and the
/// within-arm flat position, plus the combined row offsets.
pub fn union_flatten_combine<I: IndexPType>(
    tags: &[i8],
    index: &[I],
    offsetsraws: &[&[i64]],
    total_length: i64,
) -> KernelResult<(Buffer<i8>, Buffer<i64>, Buffer<i64>)> {
    let mut totags = BufferMut::<i8>::with_capacity(total_length as usize);
    let mut toindex = BufferMut::<i64>::with_capacity(total_length as usize);
    let mut tooffsets = BufferMut::<i64>::with_capacity(tags.len() + 1);
    tooffsets.push(0);
    let mut total = 0i64;
    for i in 0..tags.len() {
        let which = tags[i] as usize;
        let offsets = offsetsraws[which];
        let ix: i64 = index[i].as_();
        let ix = ix as usize;
        let (start, stop) = (offsets[ix], offsets[ix + 1]);
        for k in start..stop {
            totags.push(which as i8);
            toindex.push(k);
        }
        total += stop - start;
        tooffsets.push(total);
    }
    Ok((totags.freeze(), toindex.freeze(), tooffsets.freeze()))
}

/// Check tag and index domains against the arm lengths.
pub fn union_validity<I: IndexPType>(
    tags: &[i8],
    index: &[I],
    lencontents: &[usize],
) -> KernelResult<()> {
    if index.len() < tags.len() {
        return fail("len(index) < len(tags)");
    }
    for i in 0..tags.len() {
        let tag = tags[i] as i64;
        if tag < 0 || tag as usize >= lencontents.len() {
            return fail_at("tags[i] >= len(contents)", i as i64);
        }
        let ix: i64 = index[i].as_();
        if ix < 0 {
            return fail_at("index[i] < 0", i as i64);
        }
        if ix as usize >= lencontents[tag as usize] {
            return fail_at("index[i] >= len(content(tags[i]))", i as i64);
        }
    }
    Ok(())
}

/// The option index that pads an array out to `target` rows: existing rows
/// keep their position, the padding is `-1`.
pub fn rpad_index_axis0(target: i64, length: i64) -> Buffer<i64> {
    Buffer::from_iter((0..target).map(|i| if i < length { i } else { -1 }))
}

/// Enumerate the n-element combinations of each row, producing the row
/// offsets and one gather per combination slot.
pub fn list_combinations(
    starts: &[i64],
    stops: &[i64],
    n: usize,
    replacement: bool,
) -> (Buffer<i64>, Vec<Buffer<i64>>) {
    let mut offsets = BufferMut::<i64>::with_capacity(starts.len() + 1);
    let mut tocarry: Vec<BufferMut<i64>> = (0..n).map(|_| BufferMut::empty()).collect();
    offsets.push(0);
    let mut total = 0i64;
    let mut odometer = vec![0i64; n];
    for i in 0..starts.len() {
        let (start, stop) = (starts[i], stops[i]);
        // Reset the odometer to the first combination of this row.
        let mut valid = true;
        for (j, slot) in odometer.iter_mut().enumerate() {
            *slot = if replacement { start } else { start + j as i64 };
            if *slot >= stop {
                valid = false;
            }
        }
        while valid {
            for (j, slot) in odometer.iter().enumerate() {
                tocarry[j].push(*slot);
            }
            total += 1;
            // Advance the rightmost slot that still has room.
            let mut j = n;
            loop {
                if j == 0 {
                    valid = false;
                    break;
                }
                j -= 1;
                let headroom = if replacement { 0 } else { (n - 1 - j) as i64 };
                if odometer[j] + 1 < stop - headroom {
                    odometer[j] += 1;
                    for k in j + 1..n {
                        odometer[k] = if replacement {
                            odometer[k - 1]
                        } else {
                            odometer[k - 1] + 1
                        };
                    }
                    break;
                }
            }
        }
        offsets.push(total);
    }
    (
        offsets.freeze(),
        tocarry.into_iter().map(BufferMut::freeze).collect(),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn regularize_range_matches_python() {
        // [1:5:2] over 6 elements -> 1, 3
        assert_eq!(regularize_range(Some(1), Some(5), Some(2), 6).unwrap(), (1, 2, 2));
        // [::-1] over 4 elements -> 3, 2, 1, 0
        assert_eq!(regularize_range(None, None, Some(-1), 4).unwrap(), (3, -1, 4));
        // [-2:] over 5 elements -> 3, 4
        assert_eq!(regularize_range(Some(-2), None, None, 5).unwrap(), (3, 1, 2));
        // empty when start passes stop
        assert_eq!(regularize_range(Some(4), Some(2), None, 5).unwrap().2, 0);
        assert!(regularize_range(None, None, Some(0), 5).is_err());
    }

    #[test]
    fn list_range_per_row() {
        let starts = [0i64, 3, 3];
        let stops = [3i64, 3, 5];
        let (offsets, carry) = list_range(&starts, &stops, Some(1), None, None).unwrap();
        assert_eq!(offsets.as_slice(), &[0, 2, 2, 3]);
        assert_eq!(carry.as_slice(), &[1, 2, 4]);
    }

    #[test]
    fn bytemask_partition() {
        let (carry, outindex, numnull) = bytemask_carry_outindex(&[1, 0, 1], true);
        assert_eq!(carry.as_slice(), &[0, 2]);
        assert_eq!(outindex.as_slice(), &[0, -1, 1]);
        assert_eq!(numnull, 1);
    }

    #[test]
    fn union_regular_index_counts_per_tag() {
        let out: Buffer<i64> = union_regular_index(&[0, 1, 0, 0, 1]);
        assert_eq!(out.as_slice(), &[0, 0, 1, 2, 1]);
    }

    #[test]
    fn combinations_pairs() {
        let (offsets, tocarry) = list_combinations(&[0], &[3], 2, false);
        assert_eq!(offsets.as_slice(), &[0, 3]);
        assert_eq!(tocarry[0].as_slice(), &[0, 0, 1]);
        assert_eq!(tocarry[1].as_slice(), &[1, 2, 2]);
    }

    #[test]
    fn combinations_with_replacement() {
        let (offsets, tocarry) = list_combinations(&[0], &[2], 2, true);
        assert_eq!(offsets.as_slice(), &[0, 3]);
        assert_eq!(tocarry[0].as_slice(), &[0, 0, 1]);
        assert_eq!(tocarry[1].as_slice(), &[0, 1, 1]);
    }
}
