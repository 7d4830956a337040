#![deny(missing_docs)]

//! Jagged, heterogeneous, nullable, record-structured arrays.
//!
//! Every logical array is a tree of typed nodes ([`Content`]) backed by flat
//! integer/byte buffers, and every operation — slicing, advanced indexing,
//! field projection, flattening, option- and union-type simplification,
//! concatenation — rewrites that tree into another tree without copying the
//! payload where a zero-copy buffer window suffices.
//!
//! ```
//! use ragged_array::{IntoContent, ListOffsetArray, PrimitiveArray, RecordArray};
//! use ragged_buffer::buffer;
//!
//! // [[{"x": 1, "y": 10.0}, {"x": 2, "y": 20.0}], [], [{"x": 3, "y": 30.0}]]
//! let record = RecordArray::from_fields(&[
//!     ("x", PrimitiveArray::new(buffer![1i64, 2, 3]).into_ref()),
//!     ("y", PrimitiveArray::new(buffer![10.0f64, 20.0, 30.0]).into_ref()),
//! ])
//! .unwrap();
//! let events = ListOffsetArray::try_new(buffer![0i64, 2, 2, 3], record.into_ref())
//!     .unwrap()
//!     .into_content();
//!
//! assert_eq!(events.length(), 3);
//! assert_eq!(events.getitem_at(1).unwrap().length(), 0);
//! ```

pub use contents::{
    BitMaskedArray, ByteMaskedArray, Content, ContentRef, EmptyArray, IndexedArray,
    IndexedOptionArray, IntoContent, ListArray, ListOffsetArray, MAX_UNION_ARMS, PrimitiveArray,
    RecordArray, RegularArray, UnionArray, UnmaskedArray,
};
pub use identities::{Identities, IdentitiesRef};
pub use parameters::Parameters;
pub use ptype::{IndexPType, NativePType, PType};
pub use slice::{Slice, SliceItem};
pub use tojson::{JsonBuilder, JsonSink};

mod contents;
mod identities;
pub mod kernels;
mod parameters;
mod ptype;
mod slice;
mod tojson;
