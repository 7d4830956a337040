use ragged_buffer::{Buffer, BufferMut, ByteBuffer};
use ragged_error::{RaggedResult, ragged_bail, ragged_err};

use crate::contents::{Content, ContentRef, IntoContent, RegularArray, scalar_i64};
use crate::identities::IdentitiesRef;
use crate::parameters::Parameters;
use crate::ptype::{NativePType, PType};
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;
use crate::{match_each_integer_ptype, match_each_native_ptype};

/// A dense, possibly multi-dimensional primitive leaf.
///
/// The payload is row-major contiguous; an empty shape is a scalar.
/// Booleans are stored one byte per element.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveArray {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    ptype: PType,
    shape: Vec<usize>,
    buffer: ByteBuffer,
}

impl PrimitiveArray {
    /// A 1-dimensional array over a typed buffer.
    pub fn new<T: NativePType>(buffer: Buffer<T>) -> Self {
        let shape = vec![buffer.len()];
        Self {
            identities: None,
            parameters: Parameters::new(),
            ptype: T::PTYPE,
            shape,
            buffer: buffer.into_byte_buffer(),
        }
    }

    /// A multi-dimensional array over raw bytes.
    pub fn try_new(ptype: PType, shape: Vec<usize>, buffer: ByteBuffer) -> RaggedResult<Self> {
        let expected = shape.iter().product::<usize>() * ptype.byte_width();
        if buffer.len() != expected {
            ragged_bail!(
                "buffer of {} bytes does not hold a {:?} array of {}",
                buffer.len(),
                shape,
                ptype
            );
        }
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            ptype,
            shape,
            buffer,
        })
    }

    /// A 1-dimensional 64-bit integer array.
    pub fn from_i64(buffer: Buffer<i64>) -> Self {
        Self::new(buffer)
    }

    /// A 1-dimensional boolean array.
    pub fn from_bool_iter(values: impl Iterator<Item = bool>) -> Self {
        let buffer: Buffer<u8> = values.map(|v| v as u8).collect();
        let mut out = Self::new(buffer);
        out.ptype = PType::Bool;
        out
    }

    /// A 0-dimensional 64-bit integer scalar.
    pub fn scalar_i64(value: i64) -> Self {
        Self {
            identities: None,
            parameters: Parameters::new(),
            ptype: PType::I64,
            shape: Vec::new(),
            buffer: Buffer::from(vec![value]).into_byte_buffer(),
        }
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// The physical element type.
    pub fn ptype(&self) -> PType {
        self.ptype
    }

    /// The dimensions; empty for a scalar.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Elements per outermost row.
    fn rowstride(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// The raw payload.
    pub fn byte_buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    /// View the payload as a typed slice.
    ///
    /// ## Panics
    ///
    /// Panics if `T` does not match the array's storage type.
    pub fn as_slice<T: NativePType>(&self) -> &[T] {
        let storage_matches = T::PTYPE == self.ptype
            || (self.ptype == PType::Bool && T::PTYPE == PType::U8);
        if !storage_matches {
            ragged_error::ragged_panic!(
                Internal: "attempted to view a {} array as {}",
                self.ptype,
                T::PTYPE
            );
        }
        let raw = self.buffer.as_slice();
        // SAFETY: construction guarantees the byte length is a whole number
        // of elements and the block is element-aligned.
        unsafe {
            std::slice::from_raw_parts(raw.as_ptr().cast(), raw.len() / size_of::<T>())
        }
    }

    /// The scalar value of a 0- or 1-dimensional integer array at `row`.
    pub fn scalar_at_i64(&self, row: usize) -> Option<i64> {
        if !self.ptype.is_int() {
            return None;
        }
        match_each_integer_ptype!(self.ptype, |$T| {
            self.as_slice::<$T>().get(row).and_then(|v| num_traits::ToPrimitive::to_i64(v))
        })
    }

    /// The scalar value of a 0- or 1-dimensional float array at `row`.
    pub fn scalar_at_f64(&self, row: usize) -> Option<f64> {
        match self.ptype {
            PType::F32 => self.as_slice::<f32>().get(row).map(|&v| v as f64),
            PType::F64 => self.as_slice::<f64>().get(row).copied(),
            _ => None,
        }
    }

    /// The scalar value of a boolean array at `row`.
    pub fn scalar_at_bool(&self, row: usize) -> Option<bool> {
        if self.ptype != PType::Bool {
            return None;
        }
        self.as_slice::<u8>().get(row).map(|&v| v != 0)
    }

    /// Peel the outermost dimension into an explicit fixed-size list layer.
    /// A 1-dimensional array is returned unchanged.
    pub fn to_regular(&self) -> RaggedResult<ContentRef> {
        if self.ndim() <= 1 {
            return Ok(self.clone().into_ref());
        }
        let length = self.shape[0];
        let size = self.shape[1];
        let mut innershape = Vec::with_capacity(self.ndim() - 1);
        innershape.push(length * size);
        innershape.extend_from_slice(&self.shape[2..]);
        let content = Self::try_new(self.ptype, innershape, self.buffer.clone())?;
        Ok(RegularArray::try_new(content.into_ref(), size, length)?
            .with_identities(self.identities.clone())
            .into_ref())
    }

    fn kind(&self) -> &'static str {
        if self.ptype.is_bool() { "bool" } else { "numeric" }
    }

    pub(crate) fn kind_mergeable(&self, other: &PrimitiveArray, mergebool: bool) -> bool {
        if self.shape[1..] != other.shape[1..] {
            return false;
        }
        self.kind() == other.kind() || mergebool
    }

    fn cast_values<TO: NativePType>(&self) -> RaggedResult<Buffer<TO>> {
        if self.ptype.is_bool() {
            return Ok(self
                .as_slice::<u8>()
                .iter()
                .map(|&v| if v != 0 { TO::one() } else { TO::zero() })
                .collect());
        }
        match_each_native_ptype!(self.ptype, |$T| {
            let mut out = BufferMut::<TO>::with_capacity(self.as_slice::<$T>().len());
            for &v in self.as_slice::<$T>() {
                out.push(num_traits::cast::<$T, TO>(v).ok_or_else(|| {
                    ragged_err!("cannot represent {} as {}", v, TO::PTYPE)
                })?);
            }
            Ok(out.freeze())
        })
    }

    /// Copy-convert the payload to another primitive type.
    pub fn cast_to(&self, target: PType) -> RaggedResult<PrimitiveArray> {
        if target == self.ptype {
            return Ok(self.clone());
        }
        if target.is_bool() {
            ragged_bail!("cannot cast {} to bool", self.ptype);
        }
        match_each_native_ptype!(target, |$TO| {
            let values = self.cast_values::<$TO>()?;
            let mut out = Self::new(values);
            out.shape = self.shape.clone();
            out.ptype = target;
            Ok(out)
        })
    }

    fn merged_ptype(a: PType, b: PType) -> PType {
        if a == b {
            return a;
        }
        if a.is_bool() {
            return b;
        }
        if b.is_bool() {
            return a;
        }
        if a.is_float() || b.is_float() {
            if a == PType::F32 && b == PType::F32 {
                return PType::F32;
            }
            if a.is_float() && b.is_float() {
                return PType::F64;
            }
            return PType::F64;
        }
        // Both integers.
        if a.is_signed_int() == b.is_signed_int() {
            if a.bit_width() >= b.bit_width() { a } else { b }
        } else {
            PType::I64
        }
    }

    pub(crate) fn classname(&self) -> &'static str {
        "PrimitiveArray"
    }

    pub(crate) fn length(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
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
        _copyindexes: bool,
        copyidentities: bool,
    ) -> ContentRef {
        let mut out = self.clone();
        if copyarrays {
            out.buffer = Buffer::copy_from(self.buffer.as_slice());
        }
        if copyidentities {
            out.identities = self
                .identities
                .as_ref()
                .map(|ids| std::sync::Arc::new(ids.deep_copy()));
        }
        out.into_ref()
    }

    pub(crate) fn getitem_at_nowrap(&self, at: usize) -> RaggedResult<ContentRef> {
        if self.ndim() == 0 {
            ragged_bail!(Unsupported: "cannot index a scalar");
        }
        let stride = self.rowstride() * self.ptype.byte_width();
        let out = Self {
            identities: None,
            parameters: self.parameters.clone(),
            ptype: self.ptype,
            shape: self.shape[1..].to_vec(),
            buffer: self.buffer.slice(at * stride..(at + 1) * stride),
        };
        Ok(out.into_ref())
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        if self.ndim() == 0 {
            ragged_bail!(Unsupported: "cannot slice a scalar");
        }
        let stride = self.rowstride() * self.ptype.byte_width();
        let mut shape = self.shape.clone();
        shape[0] = stop - start;
        let out = Self {
            identities: crate::identities::range_identities(self.identities.as_ref(), start, stop),
            parameters: self.parameters.clone(),
            ptype: self.ptype,
            shape,
            buffer: self.buffer.slice(start * stride..stop * stride),
        };
        Ok(out.into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        ragged_bail!("cannot slice {} by field name {:?}", self.classname(), key);
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        ragged_bail!("cannot slice {} by field names {:?}", self.classname(), keys);
    }

    pub(crate) fn getitem_next(
        &self,
        head: &SliceItem,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        if self.ndim() > 1 {
            return self.to_regular()?.getitem_next(Some(head), tail, advanced);
        }
        ragged_bail!("too many dimensions in slice");
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        if self.ndim() > 1 {
            return self
                .to_regular()?
                .getitem_next_jagged(slicestarts, slicestops, item, tail);
        }
        ragged_bail!("too many jagged slice dimensions");
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        let length = self.length() as i64;
        let stride = self.rowstride() * self.ptype.byte_width();
        let mut out = BufferMut::<u8>::with_capacity(carry.len() * stride);
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
            let at = k as usize * stride;
            out.extend_from_slice(&self.buffer.as_slice()[at..at + stride]);
        }
        let mut shape = self.shape.clone();
        if shape.is_empty() {
            shape = vec![carry.len()];
        } else {
            shape[0] = carry.len();
        }
        let identities = crate::identities::carry_identities(self.identities.as_ref(), carry)?;
        let mut array = Self::try_new(self.ptype, shape, out.freeze())?;
        array.parameters = self.parameters.clone();
        array.identities = identities;
        Ok(array.into_ref())
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(scalar_i64(self.length() as i64));
        }
        if self.ndim() > 1 {
            return self.to_regular()?.num_depth(axis, depth);
        }
        ragged_bail!("'axis' out of range for 'num'");
    }

    pub(crate) fn offsets_and_flattened(
        &self,
        axis: i64,
        depth: i64,
    ) -> RaggedResult<(Buffer<i64>, ContentRef)> {
        if axis == depth {
            ragged_bail!("axis=0 not allowed for flatten");
        }
        if self.ndim() > 1 {
            return self.to_regular()?.offsets_and_flattened_depth(axis, depth);
        }
        ragged_bail!("array with one dimension cannot be flattened at axis {}", axis);
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let Content::Primitive(other) = other.as_ref() else {
            ragged_bail!(
                "cannot merge {} with {}",
                self.classname(),
                other.classname()
            );
        };
        if self.ndim() != other.ndim() {
            ragged_bail!("cannot merge arrays of different dimensionality");
        }
        if self.ndim() > 1 {
            if self.shape[1..] != other.shape[1..] {
                ragged_bail!("cannot merge arrays of different inner shape");
            }
            return self.to_regular()?.merge(&other.to_regular()?);
        }
        if self.ptype == other.ptype {
            let mut bytes =
                BufferMut::<u8>::with_capacity(self.buffer.len() + other.buffer.len());
            bytes.extend_from_slice(self.buffer.as_slice());
            bytes.extend_from_slice(other.buffer.as_slice());
            let length = self.length() + other.length();
            return Ok(Self::try_new(self.ptype, vec![length], bytes.freeze())?.into_ref());
        }
        let target = Self::merged_ptype(self.ptype, other.ptype);
        let left = self.cast_to(target)?;
        let right = other.cast_to(target)?;
        left.merge(&right.into_ref())
    }

    pub(crate) fn fillna(&self, _value: &ContentRef) -> RaggedResult<ContentRef> {
        Ok(self.clone().into_ref())
    }

    pub(crate) fn is_none(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::is_none_axis0(self.length()));
        }
        if self.ndim() > 1 {
            return self.to_regular()?.is_none_depth(axis, depth);
        }
        ragged_bail!("'axis' out of range for 'is_none'");
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
        if self.ndim() > 1 {
            return self.to_regular()?.rpad_depth(target, axis, depth, clip);
        }
        ragged_bail!("'axis' out of range for 'rpad'");
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::localindex_axis0(self.length()));
        }
        if self.ndim() > 1 {
            return self.to_regular()?.localindex_depth(axis, depth);
        }
        ragged_bail!("'axis' out of range for 'localindex'");
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
        if self.ndim() > 1 {
            return self.to_regular()?.combinations_depth(
                n,
                replacement,
                recordlookup,
                parameters,
                axis,
                depth,
            );
        }
        ragged_bail!("'axis' out of range for 'combinations'");
    }

    pub(crate) fn validityerror(&self, _path: &str) -> Option<String> {
        None
    }

    pub(crate) fn minmax_depth(&self) -> (i64, i64) {
        let depth = self.ndim().max(1) as i64;
        (depth, depth)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn emit_scalar(&self, index: usize, sink: &mut dyn JsonSink) {
        match self.ptype {
            PType::Bool => sink.boolean(self.as_slice::<u8>()[index] != 0),
            PType::F32 => sink.real(self.as_slice::<f32>()[index] as f64),
            PType::F64 => sink.real(self.as_slice::<f64>()[index]),
            _ => match_each_integer_ptype!(self.ptype, |$T| {
                sink.integer(
                    num_traits::ToPrimitive::to_i64(&self.as_slice::<$T>()[index]).unwrap_or(0),
                )
            }),
        }
    }

    fn emit_block(&self, offset: usize, dims: &[usize], sink: &mut dyn JsonSink) {
        match dims.split_first() {
            None => self.emit_scalar(offset, sink),
            Some((&first, rest)) => {
                let stride: usize = rest.iter().product();
                sink.begin_list();
                for i in 0..first {
                    self.emit_block(offset + i * stride, rest, sink);
                }
                sink.end_list();
            }
        }
    }

    pub(crate) fn tojson_row(&self, row: usize, sink: &mut dyn JsonSink) -> RaggedResult<()> {
        if self.ndim() == 0 {
            self.emit_scalar(0, sink);
        } else {
            let stride = self.rowstride();
            self.emit_block(row * stride, &self.shape[1..], sink);
        }
        Ok(())
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        if self.ndim() != 1 {
            ragged_bail!("only one-dimensional arrays can be used as a slice");
        }
        if self.ptype.is_int() {
            let index = match_each_integer_ptype!(self.ptype, |$T| {
                Buffer::from_iter(
                    self.as_slice::<$T>()
                        .iter()
                        .map(|v| num_traits::ToPrimitive::to_i64(v).unwrap_or(0)),
                )
            });
            return Ok(SliceItem::array(index));
        }
        if self.ptype.is_bool() {
            let index = Buffer::from_iter(
                self.as_slice::<u8>()
                    .iter()
                    .enumerate()
                    .filter(|(_, &v)| v != 0)
                    .map(|(i, _)| i as i64),
            );
            return Ok(SliceItem::array(index));
        }
        ragged_bail!("only integer and boolean arrays can be used as a slice");
    }
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use crate::contents::{Content, IntoContent, PrimitiveArray};
    use crate::ptype::PType;

    #[test]
    fn carry_gathers_rows() {
        let array = PrimitiveArray::new(buffer![10i64, 20, 30, 40]).into_content();
        let carried = array.carry(&buffer![3i64, 0, 0]).unwrap();
        let Content::Primitive(p) = carried.as_ref() else {
            panic!("expected a primitive");
        };
        assert_eq!(p.as_slice::<i64>(), &[40, 10, 10]);
        assert!(array.carry(&buffer![4i64]).is_err());
    }

    #[test]
    fn merge_promotes_types() {
        let a = PrimitiveArray::new(buffer![1i32, 2]).into_content();
        let b = PrimitiveArray::new(buffer![0.5f64]).into_ref();
        let Content::Primitive(merged) = &*a.merge(&b).unwrap() else {
            panic!("expected a primitive");
        };
        assert_eq!(merged.ptype(), PType::F64);
        assert_eq!(merged.as_slice::<f64>(), &[1.0, 2.0, 0.5]);
    }

    #[test]
    fn bool_does_not_merge_with_numbers_by_default() {
        let a = PrimitiveArray::from_bool_iter([true, false].into_iter()).into_content();
        let b = PrimitiveArray::new(buffer![1i64]).into_content();
        assert!(!a.mergeable(&b, false));
        assert!(a.mergeable(&b, true));
        assert!(a.mergeable(&PrimitiveArray::from_bool_iter([true].into_iter()).into_content(), false));
    }

    #[test]
    fn multidim_peels_into_regular() {
        let bytes = buffer![1i32, 2, 3, 4, 5, 6].into_byte_buffer();
        let array = PrimitiveArray::try_new(PType::I32, vec![2, 3], bytes).unwrap();
        assert_eq!(array.length(), 2);
        let regular = array.to_regular().unwrap();
        let Content::Regular(r) = regular.as_ref() else {
            panic!("expected a regular layer");
        };
        assert_eq!(r.size(), 3);
        assert_eq!(r.length(), 2);
    }

    #[test]
    fn json_rendering() {
        let array = PrimitiveArray::new(buffer![1i64, 2, 3]).into_content();
        assert_eq!(array.to_json().unwrap(), serde_json::json!([1, 2, 3]));
    }
}
