//! The slice language consumed head-first by the recursive getitem.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use ragged_buffer::Buffer;
use ragged_error::{RaggedResult, ragged_bail};

/// One item of a [`Slice`].
#[derive(Clone, PartialEq)]
pub enum SliceItem {
    /// An integer position, possibly negative.
    At(i64),
    /// A half-open `start:stop:step` range; absent members take python
    /// defaults and `step` is canonically 1.
    Range {
        /// The first position, possibly negative.
        start: Option<i64>,
        /// One past the last position, possibly negative.
        stop: Option<i64>,
        /// The stride; must not be zero.
        step: Option<i64>,
    },
    /// Expands to as many full-axis ranges as needed.
    Ellipsis,
    /// Introduces a length-1 axis.
    NewAxis,
    /// Advanced integer indexing, possibly multi-dimensional: `index` holds
    /// the row-major flattened positions and `shape` their dimensions.
    Array {
        /// The flattened positions.
        index: Buffer<i64>,
        /// The dimensions of the index array.
        shape: Vec<i64>,
    },
    /// One variable-length slice per outer row: row `i` is
    /// `item[offsets[i]..offsets[i+1])` of the nested item.
    Jagged {
        /// Row boundaries into the nested item.
        offsets: Buffer<i64>,
        /// The per-row selection.
        item: Box<SliceItem>,
    },
    /// An option-typed selection: `index[i]` is `-1` for an absent row,
    /// otherwise a position into the compact nested item.
    Missing {
        /// `-1` or a position into the nested item.
        index: Buffer<i64>,
        /// The selection over the present rows only.
        item: Box<SliceItem>,
    },
    /// Project one record field.
    Field(String),
    /// Project a sub-record.
    Fields(Vec<String>),
}

impl SliceItem {
    /// A 1-dimensional advanced index.
    pub fn array(index: impl Into<Buffer<i64>>) -> Self {
        let index = index.into();
        let shape = vec![index.len() as i64];
        Self::Array { index, shape }
    }

    /// The full-axis range `::`.
    pub fn full_range() -> Self {
        Self::Range {
            start: None,
            stop: None,
            step: None,
        }
    }

    /// A `start..stop` range with unit step.
    pub fn range(start: i64, stop: i64) -> Self {
        Self::Range {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    /// Whether this item consumes one dimension of the array.
    pub fn consumes_dimension(&self) -> bool {
        match self {
            Self::At(_) | Self::Range { .. } | Self::Array { .. } | Self::Jagged { .. } => true,
            Self::Missing { item, .. } => item.consumes_dimension(),
            Self::Ellipsis | Self::NewAxis | Self::Field(_) | Self::Fields(_) => false,
        }
    }

    /// Whether applying this item keeps the sliced node's type, and hence
    /// its parameters.
    pub fn preserves_type(&self, advanced: Option<&Buffer<i64>>) -> bool {
        match self {
            Self::At(_) | Self::NewAxis => false,
            Self::Range { .. } | Self::Ellipsis | Self::Jagged { .. } => true,
            Self::Array { .. } => advanced.is_none(),
            Self::Missing { item, .. } => item.preserves_type(advanced),
            Self::Field(_) | Self::Fields(_) => true,
        }
    }
}

impl Debug for SliceItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::At(at) => write!(f, "{}", at),
            Self::Range { start, stop, step } => {
                if let Some(start) = start {
                    write!(f, "{}", start)?;
                }
                write!(f, ":")?;
                if let Some(stop) = stop {
                    write!(f, "{}", stop)?;
                }
                if let Some(step) = step {
                    write!(f, ":{}", step)?;
                }
                Ok(())
            }
            Self::Ellipsis => write!(f, "..."),
            Self::NewAxis => write!(f, "newaxis"),
            Self::Array { index, shape } => {
                write!(f, "array(len={}, shape={:?})", index.len(), shape)
            }
            Self::Jagged { offsets, item } => {
                write!(f, "jagged(rows={}, {:?})", offsets.len().saturating_sub(1), item)
            }
            Self::Missing { index, item } => {
                write!(f, "missing(len={}, {:?})", index.len(), item)
            }
            Self::Field(key) => write!(f, "{:?}", key),
            Self::Fields(keys) => write!(f, "{:?}", keys),
        }
    }
}

/// An ordered sequence of [`SliceItem`]s, consumed head-first.
#[derive(Clone, PartialEq)]
pub struct Slice {
    items: Arc<[SliceItem]>,
    start: usize,
}

impl Slice {
    /// A slice over the given items.
    pub fn new(items: Vec<SliceItem>) -> RaggedResult<Self> {
        let mut seen_ellipsis = false;
        for item in &items {
            if matches!(item, SliceItem::Ellipsis) {
                if seen_ellipsis {
                    ragged_bail!("a slice can contain at most one ellipsis");
                }
                seen_ellipsis = true;
            }
        }
        Ok(Self {
            items: items.into(),
            start: 0,
        })
    }

    /// The empty slice.
    pub fn empty() -> Self {
        Self {
            items: Arc::from(Vec::new()),
            start: 0,
        }
    }

    /// The first remaining item, if any.
    pub fn head(&self) -> Option<&SliceItem> {
        self.items.get(self.start)
    }

    /// Everything after the head. Shares the item storage.
    pub fn tail(&self) -> Slice {
        Self {
            items: self.items.clone(),
            start: (self.start + 1).min(self.items.len()),
        }
    }

    /// The remaining items.
    pub fn items(&self) -> &[SliceItem] {
        &self.items[self.start..]
    }

    /// The number of remaining items.
    pub fn len(&self) -> usize {
        self.items.len() - self.start
    }

    /// Whether no items remain.
    pub fn is_empty(&self) -> bool {
        self.start >= self.items.len()
    }

    /// How many of the remaining items consume a dimension.
    pub fn dimlength(&self) -> i64 {
        self.items()
            .iter()
            .filter(|item| item.consumes_dimension())
            .count() as i64
    }

    /// A new slice with `item` pushed in front of the remaining items.
    pub fn prepended(&self, item: SliceItem) -> Slice {
        let mut items = Vec::with_capacity(self.len() + 1);
        items.push(item);
        items.extend(self.items().iter().cloned());
        Self {
            items: items.into(),
            start: 0,
        }
    }
}

impl Debug for Slice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items()).finish()
    }
}

impl From<SliceItem> for Slice {
    fn from(item: SliceItem) -> Self {
        Self {
            items: Arc::from(vec![item]),
            start: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use ragged_buffer::buffer;

    use super::{Slice, SliceItem};

    #[test]
    fn head_tail() {
        let slice = Slice::new(vec![SliceItem::At(1), SliceItem::full_range()]).unwrap();
        assert_eq!(slice.len(), 2);
        assert!(matches!(slice.head(), Some(SliceItem::At(1))));
        let tail = slice.tail();
        assert!(matches!(tail.head(), Some(SliceItem::Range { .. })));
        assert!(tail.tail().is_empty());
        assert!(tail.tail().head().is_none());
    }

    #[test]
    fn dimlength_skips_field_items() {
        let slice = Slice::new(vec![
            SliceItem::At(0),
            SliceItem::Field("x".to_string()),
            SliceItem::array(buffer![0i64, 2]),
            SliceItem::NewAxis,
        ])
        .unwrap();
        assert_eq!(slice.dimlength(), 2);
    }

    #[test]
    fn at_most_one_ellipsis() {
        assert!(Slice::new(vec![SliceItem::Ellipsis, SliceItem::Ellipsis]).is_err());
    }
}
