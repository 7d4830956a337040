use std::collections::BTreeSet;

use itertools::Itertools;
use ragged_buffer::Buffer;
use ragged_error::{RaggedResult, ragged_bail, ragged_err};

use crate::contents::{Content, ContentRef, IntoContent, scalar_i64};
use crate::identities::IdentitiesRef;
use crate::parameters::Parameters;
use crate::slice::{Slice, SliceItem};
use crate::tojson::JsonSink;

/// A struct-of-arrays: a fixed set of fields, each itself a content of at
/// least this node's length. A tuple when `recordlookup` is absent.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordArray {
    identities: Option<IdentitiesRef>,
    parameters: Parameters,
    contents: Vec<ContentRef>,
    recordlookup: Option<Vec<String>>,
    length: usize,
}

impl RecordArray {
    /// A record over parallel field arrays. With `length` absent, the
    /// shortest field wins (zero when there are no fields).
    pub fn try_new(
        contents: Vec<ContentRef>,
        recordlookup: Option<Vec<String>>,
        length: Option<usize>,
    ) -> RaggedResult<Self> {
        if let Some(lookup) = &recordlookup {
            if lookup.len() != contents.len() {
                ragged_bail!("recordlookup and contents must have the same number of fields");
            }
            let unique: BTreeSet<&str> = lookup.iter().map(|k| k.as_str()).collect();
            if unique.len() != lookup.len() {
                ragged_bail!("recordlookup keys must be unique");
            }
        }
        let length = length.unwrap_or_else(|| {
            contents.iter().map(|c| c.length()).min().unwrap_or(0)
        });
        Ok(Self {
            identities: None,
            parameters: Parameters::new(),
            contents,
            recordlookup,
            length,
        })
    }

    /// A named record from `(key, field)` pairs.
    pub fn from_fields<N: AsRef<str>>(items: &[(N, ContentRef)]) -> RaggedResult<Self> {
        let lookup = items.iter().map(|(k, _)| k.as_ref().to_string()).collect();
        let contents = items.iter().map(|(_, c)| c.clone()).collect();
        Self::try_new(contents, Some(lookup), None)
    }

    /// Attach parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// The field arrays.
    pub fn contents(&self) -> &[ContentRef] {
        &self.contents
    }

    /// The field names, when this is not a tuple.
    pub fn recordlookup(&self) -> Option<&Vec<String>> {
        self.recordlookup.as_ref()
    }

    /// Whether the fields are positional.
    pub fn istuple(&self) -> bool {
        self.recordlookup.is_none()
    }

    /// The number of fields.
    pub fn numfields(&self) -> usize {
        self.contents.len()
    }

    /// Resolve a key to a field position. Tuples resolve decimal strings.
    pub fn fieldindex(&self, key: &str) -> RaggedResult<usize> {
        if let Some(lookup) = &self.recordlookup {
            if let Some(i) = lookup.iter().position(|k| k == key) {
                return Ok(i);
            }
            ragged_bail!("no field {:?} in record with {} fields", key, self.numfields());
        }
        let i: usize = key
            .parse()
            .map_err(|_| ragged_err!("no field {:?} in tuple with {} fields", key, self.numfields()))?;
        if i >= self.numfields() {
            ragged_bail!("no field {:?} in tuple with {} fields", key, self.numfields());
        }
        Ok(i)
    }

    /// The untrimmed field array at a position.
    pub fn field_at(&self, fieldindex: usize) -> RaggedResult<&ContentRef> {
        self.contents.get(fieldindex).ok_or_else(|| {
            ragged_err!(
                "fieldindex {} for record with only {} fields",
                fieldindex,
                self.numfields()
            )
        })
    }

    /// The untrimmed field array for a key.
    pub fn field(&self, key: &str) -> RaggedResult<&ContentRef> {
        self.field_at(self.fieldindex(key)?)
    }

    /// Whether a key resolves to a field.
    pub fn haskey(&self, key: &str) -> bool {
        self.fieldindex(key).is_ok()
    }

    /// `(key, field)` pairs, fabricating `"0", "1", ..` for tuples.
    pub fn fielditems(&self) -> Vec<(String, ContentRef)> {
        self.keys()
            .into_iter()
            .zip(self.contents.iter().cloned())
            .collect()
    }

    /// Forget the field names.
    pub fn astuple(&self) -> Self {
        Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            contents: self.contents.clone(),
            recordlookup: None,
            length: self.length,
        }
    }

    /// Replace or append the field under `key`, which must be as long as
    /// this record.
    pub fn setitem_field(&self, key: &str, what: ContentRef) -> RaggedResult<Self> {
        if what.length() != self.length {
            ragged_bail!(
                "array of length {} cannot be assigned to record array of length {}",
                what.length(),
                self.length
            );
        }
        let mut contents = self.contents.clone();
        let mut recordlookup = match &self.recordlookup {
            Some(lookup) => lookup.clone(),
            None => self.keys(),
        };
        match recordlookup.iter().position(|k| k == key) {
            Some(i) => contents[i] = what,
            None => {
                recordlookup.push(key.to_string());
                contents.push(what);
            }
        }
        Self::try_new(contents, Some(recordlookup), Some(self.length))
    }

    pub(crate) fn classname(&self) -> &'static str {
        "RecordArray"
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
        self.getitem_range_nowrap(at, at + 1)
    }

    pub(crate) fn getitem_range_nowrap(&self, start: usize, stop: usize) -> RaggedResult<ContentRef> {
        let contents = self
            .contents
            .iter()
            .map(|c| c.getitem_range_nowrap(start, stop))
            .try_collect()?;
        Ok(Self {
            identities: crate::identities::range_identities(self.identities.as_ref(), start, stop),
            parameters: self.parameters.clone(),
            contents,
            recordlookup: self.recordlookup.clone(),
            length: stop - start,
        }
        .into_ref())
    }

    pub(crate) fn getitem_field(&self, key: &str) -> RaggedResult<ContentRef> {
        self.field(key)?.getitem_range_nowrap(0, self.length)
    }

    pub(crate) fn getitem_fields(&self, keys: &[String]) -> RaggedResult<ContentRef> {
        let mut contents = Vec::with_capacity(keys.len());
        for key in keys {
            contents.push(self.field(key)?.getitem_range_nowrap(0, self.length)?);
        }
        let recordlookup = self.recordlookup.as_ref().map(|_| keys.to_vec());
        Ok(Self::try_new(contents, recordlookup, Some(self.length))?
            .with_identities(self.identities.clone())
            .into_ref())
    }

    pub(crate) fn getitem_next(
        &self,
        head: &SliceItem,
        tail: &Slice,
        advanced: Option<&Buffer<i64>>,
    ) -> RaggedResult<ContentRef> {
        let empty = Slice::empty();
        let contents = self
            .contents
            .iter()
            .map(|c| c.getitem_next(Some(head), &empty, advanced))
            .try_collect()?;
        let parameters = if head.preserves_type(advanced) {
            self.parameters.clone()
        } else {
            Parameters::new()
        };
        let out = Self::try_new(contents, self.recordlookup.clone(), None)?
            .with_parameters(parameters);
        out.into_content()
            .getitem_next(tail.head(), &tail.tail(), advanced)
    }

    pub(crate) fn getitem_next_jagged(
        &self,
        slicestarts: &Buffer<i64>,
        slicestops: &Buffer<i64>,
        item: &SliceItem,
        tail: &Slice,
    ) -> RaggedResult<ContentRef> {
        if self.contents.is_empty() {
            return Ok(self.clone().into_ref());
        }
        let contents = self
            .contents
            .iter()
            .map(|c| c.getitem_next_jagged(slicestarts, slicestops, item, tail))
            .try_collect()?;
        Ok(Self::try_new(contents, self.recordlookup.clone(), None)?
            .with_parameters(self.parameters.clone())
            .with_identities(self.identities.clone())
            .into_ref())
    }

    pub(crate) fn carry(&self, carry: &Buffer<i64>) -> RaggedResult<ContentRef> {
        let contents = self
            .contents
            .iter()
            .map(|c| c.carry(carry))
            .try_collect()?;
        let identities = crate::identities::carry_identities(self.identities.as_ref(), carry)?;
        Ok(Self {
            identities,
            parameters: self.parameters.clone(),
            contents,
            recordlookup: self.recordlookup.clone(),
            length: carry.len(),
        }
        .into_ref())
    }

    pub(crate) fn num(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            let singleton = scalar_i64(self.length as i64);
            let contents = vec![singleton; self.numfields()];
            return Ok(Self::try_new(contents, self.recordlookup.clone(), Some(1))?.into_ref());
        }
        let contents = self
            .contents
            .iter()
            .map(|c| c.num_depth(axis, depth))
            .try_collect()?;
        Ok(Self::try_new(contents, self.recordlookup.clone(), Some(self.length))?.into_ref())
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
            ragged_bail!(
                "arrays of records cannot be flattened (but their contents can be; \
                 try a different 'axis')"
            );
        }
        let mut contents = Vec::with_capacity(self.numfields());
        for content in &self.contents {
            let trimmed = content.getitem_range_nowrap(0, self.length)?;
            let (offsets, flattened) = trimmed.offsets_and_flattened_depth(axis, depth)?;
            if !offsets.is_empty() {
                ragged_bail!(
                    Internal: "record field with axis > depth + 1 returned non-empty offsets \
                     from flattening"
                );
            }
            contents.push(flattened);
        }
        Ok((
            Buffer::empty(),
            Self::try_new(contents, self.recordlookup.clone(), None)?.into_ref(),
        ))
    }

    pub(crate) fn fields_mergeable(&self, other: &RecordArray, mergebool: bool) -> bool {
        match (&self.recordlookup, &other.recordlookup) {
            (None, None) => {
                self.numfields() == other.numfields()
                    && self
                        .contents
                        .iter()
                        .zip(other.contents.iter())
                        .all(|(a, b)| a.mergeable(b, mergebool))
            }
            (Some(_), Some(_)) => {
                let mut mine = self.keys();
                let mut theirs = other.keys();
                mine.sort();
                theirs.sort();
                if mine != theirs {
                    return false;
                }
                mine.iter().all(|key| {
                    match (self.field(key), other.field(key)) {
                        (Ok(a), Ok(b)) => a.mergeable(b, mergebool),
                        _ => false,
                    }
                })
            }
            _ => false,
        }
    }

    pub(crate) fn merge(&self, other: &ContentRef) -> RaggedResult<ContentRef> {
        let Content::Record(other) = other.as_ref() else {
            ragged_bail!(
                "cannot merge {} with {}",
                self.classname(),
                other.classname()
            );
        };
        let mylength = self.length;
        let theirlength = other.length;
        if self.istuple() == other.istuple() && self.numfields() == 0 && other.numfields() == 0 {
            return Ok(Self::try_new(Vec::new(), None, Some(mylength + theirlength))?.into_ref());
        }
        if self.istuple() && other.istuple() {
            if self.numfields() == other.numfields() {
                let mut contents = Vec::with_capacity(self.numfields());
                for i in 0..self.numfields() {
                    let mine = self.contents[i].getitem_range_nowrap(0, mylength)?;
                    let theirs = other.contents[i].getitem_range_nowrap(0, theirlength)?;
                    contents.push(mine.merge(&theirs)?);
                }
                return Ok(Self::try_new(contents, None, None)?.into_ref());
            }
        } else if !self.istuple() && !other.istuple() {
            let mut mine_keys = self.keys();
            let mut their_keys = other.keys();
            mine_keys.sort();
            their_keys.sort();
            if mine_keys == their_keys {
                let mut contents = Vec::with_capacity(self.numfields());
                for key in self.keys() {
                    let mine = self.field(&key)?.getitem_range_nowrap(0, mylength)?;
                    let theirs = other.field(&key)?.getitem_range_nowrap(0, theirlength)?;
                    contents.push(mine.merge(&theirs)?);
                }
                return Ok(
                    Self::try_new(contents, self.recordlookup.clone(), None)?.into_ref()
                );
            }
        }
        ragged_bail!("cannot merge records or tuples with different fields");
    }

    pub(crate) fn fillna(&self, value: &ContentRef) -> RaggedResult<ContentRef> {
        let contents = self
            .contents
            .iter()
            .map(|c| c.fillna(value))
            .try_collect()?;
        Ok(Self {
            identities: self.identities.clone(),
            parameters: self.parameters.clone(),
            contents,
            recordlookup: self.recordlookup.clone(),
            length: self.length,
        }
        .into_ref())
    }

    pub(crate) fn is_none(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::is_none_axis0(self.length));
        }
        let contents = self
            .contents
            .iter()
            .map(|c| c.is_none_depth(axis, depth))
            .try_collect()?;
        Ok(Self::try_new(contents, self.recordlookup.clone(), Some(self.length))?.into_ref())
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
        let contents: Vec<ContentRef> = self
            .contents
            .iter()
            .map(|c| c.rpad_depth(target, axis, depth, clip))
            .try_collect()?;
        let length = if contents.is_empty() {
            Some(self.length)
        } else {
            None
        };
        Ok(Self::try_new(contents, self.recordlookup.clone(), length)?
            .with_parameters(self.parameters.clone())
            .with_identities(self.identities.clone())
            .into_ref())
    }

    pub(crate) fn localindex(&self, axis: i64, depth: i64) -> RaggedResult<ContentRef> {
        if axis == depth {
            return Ok(crate::contents::localindex_axis0(self.length));
        }
        let contents = self
            .contents
            .iter()
            .map(|c| c.localindex_depth(axis, depth))
            .try_collect()?;
        Ok(Self::try_new(contents, self.recordlookup.clone(), Some(self.length))?.into_ref())
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
            .map(|c| {
                c.combinations_depth(n, replacement, recordlookup, parameters, axis, depth)
            })
            .try_collect()?;
        Ok(Self::try_new(contents, self.recordlookup.clone(), Some(self.length))?.into_ref())
    }

    pub(crate) fn validityerror(&self, path: &str) -> Option<String> {
        for (i, content) in self.contents.iter().enumerate() {
            if content.length() < self.length {
                return Some(format!(
                    "at {} ({}): len(field({})) < len(recordarray)",
                    path,
                    self.classname(),
                    i
                ));
            }
        }
        for (i, content) in self.contents.iter().enumerate() {
            if let Some(error) = content.validityerror(&format!("{}.field({})", path, i)) {
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
        match &self.recordlookup {
            Some(lookup) => lookup.clone(),
            None => (0..self.numfields()).map(|i| i.to_string()).collect(),
        }
    }

    pub(crate) fn tojson_row(&self, row: usize, sink: &mut dyn JsonSink) -> RaggedResult<()> {
        sink.begin_record();
        for (key, content) in self.keys().iter().zip(self.contents.iter()) {
            sink.field(key);
            content.tojson_row(row, sink)?;
        }
        sink.end_record();
        Ok(())
    }

    pub(crate) fn asslice(&self) -> RaggedResult<SliceItem> {
        ragged_bail!("cannot use records as a slice");
    }
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use crate::contents::{Content, IntoContent, PrimitiveArray, RecordArray};

    fn xy() -> RecordArray {
        RecordArray::from_fields(&[
            ("x", PrimitiveArray::new(buffer![1i64, 2, 3]).into_ref()),
            ("y", PrimitiveArray::new(buffer![10.0f64, 20.0, 30.0]).into_ref()),
        ])
        .unwrap()
    }

    #[test]
    fn field_projection() {
        let record = xy().into_content();
        let x = record.getitem_field("x").unwrap();
        let Content::Primitive(p) = x.as_ref() else {
            panic!("expected a primitive");
        };
        assert_eq!(p.as_slice::<i64>(), &[1, 2, 3]);
        assert!(record.getitem_field("z").is_err());
    }

    #[test]
    fn tuple_fields_resolve_by_position() {
        let tuple = RecordArray::try_new(
            vec![
                PrimitiveArray::new(buffer![1i64]).into_ref(),
                PrimitiveArray::new(buffer![2i64]).into_ref(),
                PrimitiveArray::new(buffer![3i64]).into_ref(),
            ],
            None,
            None,
        )
        .unwrap();
        let field = tuple.field("1").unwrap();
        let Content::Primitive(p) = field.as_ref() else {
            panic!("expected a primitive");
        };
        assert_eq!(p.as_slice::<i64>(), &[2]);
    }

    #[test]
    fn setitem_field_round_trip() {
        let record = xy();
        let z = PrimitiveArray::new(buffer![7i64, 8, 9]).into_ref();
        let updated = record.setitem_field("z", z.clone()).unwrap();
        assert_eq!(
            updated.field("z").unwrap().as_ref(),
            z.as_ref()
        );
        let short = PrimitiveArray::new(buffer![7i64]).into_ref();
        assert!(record.setitem_field("w", short).is_err());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let result = RecordArray::try_new(
            vec![
                PrimitiveArray::new(buffer![1i64]).into_ref(),
                PrimitiveArray::new(buffer![2i64]).into_ref(),
            ],
            Some(vec!["x".to_string(), "x".to_string()]),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn merge_requires_matching_fields() {
        let left = xy().into_content();
        let right = xy().into_ref();
        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.length(), 6);

        let other = RecordArray::from_fields(&[
            ("x", PrimitiveArray::new(buffer![1i64]).into_ref()),
        ])
        .unwrap()
        .into_ref();
        assert!(left.merge(&other).is_err());
    }

    #[test]
    fn json_objects_use_keys() {
        let record = xy().into_content();
        assert_eq!(
            record.getitem_range(Some(0), Some(1)).unwrap().to_json().unwrap(),
            serde_json::json!([{"x": 1, "y": 10.0}])
        );
    }
}
