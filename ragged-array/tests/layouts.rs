//! Cross-variant scenarios: building realistic layouts and pushing the
//! structural operations through them.

use ragged_array::{
    ByteMaskedArray, Content, ContentRef, EmptyArray, IndexedOptionArray, IntoContent,
    ListOffsetArray, Parameters, PrimitiveArray, RecordArray, Slice, SliceItem, UnionArray,
    UnmaskedArray,
};
use ragged_buffer::{Buffer, buffer};
use rstest::rstest;
use serde_json::json;

/// [[{"x": 1, "y": 10}, {"x": 2, "y": 20}], [], [{"x": 3, "y": 30}, {"x": 4, "y": 40}, {"x": 5, "y": 50}]]
fn list_of_records() -> Content {
    let record = RecordArray::from_fields(&[
        ("x", PrimitiveArray::new(buffer![1i64, 2, 3, 4, 5]).into_ref()),
        (
            "y",
            PrimitiveArray::new(buffer![10i64, 20, 30, 40, 50]).into_ref(),
        ),
    ])
    .unwrap();
    ListOffsetArray::try_new(buffer![0i64, 2, 2, 5], record.into_ref())
        .unwrap()
        .into_content()
}

#[test]
fn list_of_records_round_trip() {
    let events = list_of_records();
    assert_eq!(events.length(), 3);
    assert!(events.validityerror("").is_none());

    let first = events.getitem_at(0).unwrap();
    assert_eq!(first.length(), 2);
    assert_eq!(
        first.getitem_at_json(0),
        json!([{"x": 1, "y": 10}])
    );

    let second = events.getitem_at(1).unwrap();
    assert_eq!(second.length(), 0);

    let last = events.getitem_at(-1).unwrap();
    assert_eq!(last.to_json().unwrap(), events.getitem_at(2).unwrap().to_json().unwrap());
}

trait JsonAt {
    fn getitem_at_json(&self, at: i64) -> serde_json::Value;
}

impl JsonAt for ContentRef {
    fn getitem_at_json(&self, at: i64) -> serde_json::Value {
        self.getitem_at(at).unwrap().to_json().unwrap()
    }
}

#[test]
fn option_collapse_over_all_present_wrapper() {
    let array = IndexedOptionArray::new(
        buffer![-1i64, 0, 1],
        UnmaskedArray::new(PrimitiveArray::new(buffer![7i64, 8]).into_ref()).into_ref(),
    )
    .into_content();
    let simplified = array.simplify().unwrap();
    let Content::IndexedOption64(out) = simplified.as_ref() else {
        panic!("expected a single option layer, got {}", simplified.classname());
    };
    assert_eq!(out.index().as_slice(), &[-1, 0, 1]);
    assert!(matches!(out.content().as_ref(), Content::Primitive(_)));
    assert_eq!(simplified.to_json().unwrap(), json!([null, 7, 8]));
}

#[test]
fn nested_option_collapse_composes_missing() {
    let inner = IndexedOptionArray::new(
        buffer![0i64, -1, 1],
        PrimitiveArray::new(buffer![9i64, 10]).into_ref(),
    );
    let array =
        ByteMaskedArray::new(buffer![1i8, 0, 1], inner.into_ref(), true).into_content();
    let simplified = array.simplify().unwrap();
    let Content::IndexedOption64(out) = simplified.as_ref() else {
        panic!("expected a single option layer, got {}", simplified.classname());
    };
    assert_eq!(out.index().as_slice(), &[0, -1, 1]);
    assert_eq!(simplified.to_json().unwrap(), json!([9, null, 10]));
}

#[test]
fn union_merge_keeps_incompatible_arms_apart() {
    let union = UnionArray::try_new(
        buffer![0i8, 1],
        buffer![0i64, 0],
        vec![
            PrimitiveArray::new(buffer![1.5f64]).into_ref(),
            PrimitiveArray::from_bool_iter([true].into_iter()).into_ref(),
        ],
    )
    .unwrap()
    .into_content();
    let merged = union.merge(&PrimitiveArray::new(buffer![2.5f64]).into_ref()).unwrap();
    assert_eq!(merged.length(), 3);

    // With mergebool=false the float arms fold together and the bool arm
    // stays separate.
    let Content::Union64(u) = merged.as_ref() else {
        panic!("expected a union");
    };
    let simplified = u.simplify_uniontype(false).unwrap();
    let Content::Union64(s) = simplified.as_ref() else {
        panic!("expected a union");
    };
    assert_eq!(s.numcontents(), 2);
    assert_eq!(simplified.to_json().unwrap(), json!([1.5, true, 2.5]));
}

#[test]
fn flatten_through_union_combines_offsets() {
    let lists_a = ListOffsetArray::try_new(
        buffer![0i64, 2, 3],
        PrimitiveArray::new(buffer![1i64, 2, 3]).into_ref(),
    )
    .unwrap()
    .into_ref();
    let lists_b = ListOffsetArray::try_new(
        buffer![0i64, 1],
        PrimitiveArray::new(buffer![99i64]).into_ref(),
    )
    .unwrap()
    .into_ref();
    let union = UnionArray::try_new(
        buffer![0i8, 1, 0],
        buffer![0i64, 0, 1],
        vec![lists_a, lists_b],
    )
    .unwrap()
    .into_content();
    assert_eq!(union.to_json().unwrap(), json!([[1, 2], [99], [3]]));

    let (offsets, flat) = union.offsets_and_flattened(1).unwrap();
    assert_eq!(offsets.as_slice(), &[0, 2, 3, 4]);
    assert_eq!(flat.length(), 4);
    assert_eq!(flat.to_json().unwrap(), json!([1, 2, 99, 3]));
}

#[test]
fn tuple_projection_by_position() {
    let b = PrimitiveArray::new(buffer![4i64, 5]).into_ref();
    let tuple = RecordArray::try_new(
        vec![
            PrimitiveArray::new(buffer![1i64, 2]).into_ref(),
            b.clone(),
            PrimitiveArray::new(buffer![7i64, 8]).into_ref(),
        ],
        None,
        None,
    )
    .unwrap()
    .into_content();
    let projected = tuple.getitem_field("1").unwrap();
    assert_eq!(projected.as_ref(), b.as_ref());
}

// ----------------------------------------------------------------------
// universal invariants
// ----------------------------------------------------------------------

fn fixtures() -> Vec<Content> {
    vec![
        PrimitiveArray::new(buffer![1i64, 2, 3, 4]).into_content(),
        list_of_records(),
        IndexedOptionArray::new(
            buffer![-1i64, 1, 0],
            PrimitiveArray::new(buffer![5.5f64, 6.5]).into_ref(),
        )
        .into_content(),
        ByteMaskedArray::new(
            buffer![1i8, 1, 0],
            PrimitiveArray::new(buffer![1i64, 2, 3]).into_ref(),
            true,
        )
        .into_content(),
        UnionArray::try_new(
            buffer![0i8, 1, 0],
            buffer![0i64, 0, 1],
            vec![
                PrimitiveArray::new(buffer![1i64, 2]).into_ref(),
                PrimitiveArray::from_bool_iter([false].into_iter()).into_ref(),
            ],
        )
        .unwrap()
        .into_content(),
    ]
}

#[test]
fn shallow_copy_preserves_length_and_shape() {
    for array in fixtures() {
        let copy = array.shallow_copy();
        assert_eq!(copy.length(), array.length());
        assert_eq!(copy.as_ref(), &array);
    }
}

#[test]
fn carry_by_identity_is_identity() {
    for array in fixtures() {
        let identity = Buffer::from_iter(0..array.length() as i64);
        let carried = array.carry(&identity).unwrap();
        assert_eq!(carried.length(), array.length());
        assert_eq!(carried.to_json().unwrap(), array.to_json().unwrap());
    }
}

#[test]
fn outermost_array_slice_agrees_with_carry() {
    for array in fixtures() {
        let index = buffer![2i64, 0];
        let sliced = array
            .getitem(&Slice::new(vec![SliceItem::array(index.clone())]).unwrap())
            .unwrap();
        let carried = array.carry(&index).unwrap();
        assert_eq!(sliced.to_json().unwrap(), carried.to_json().unwrap());
    }
}

#[test]
fn merging_empty_is_identity() {
    for array in fixtures() {
        let merged = array.merge(&EmptyArray::new().into_ref()).unwrap();
        assert_eq!(merged.to_json().unwrap(), array.to_json().unwrap());
    }
}

#[test]
fn merge_length_is_additive() {
    let all = fixtures();
    for left in &all {
        for right in &all {
            // Incompatible pairs refuse to merge; every pair that does merge
            // honors the length contract.
            match left.merge(&right.shallow_copy()) {
                Ok(merged) => {
                    assert_eq!(merged.length(), left.length() + right.length())
                }
                Err(_) => assert!(!left.mergeable(right, false)),
            }
        }
    }
}

#[rstest]
#[case(false)]
#[case(true)]
fn union_simplification_is_idempotent(#[case] mergebool: bool) {
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
    let union = UnionArray::try_new(
        buffer![0i8, 1, 1],
        buffer![0i64, 0, 1],
        vec![PrimitiveArray::new(buffer![0.5f64]).into_ref(), inner],
    )
    .unwrap();

    let once = union.simplify_uniontype(mergebool).unwrap();
    let twice = once.simplify().unwrap();
    assert_eq!(once.to_json().unwrap(), twice.to_json().unwrap());
    if let (Content::Union64(a), Content::Union64(b)) = (once.as_ref(), twice.as_ref()) {
        assert_eq!(a.numcontents(), b.numcontents());
    }
}

#[test]
fn option_simplification_is_idempotent() {
    let nested = IndexedOptionArray::new(
        buffer![1i64, -1, 0],
        IndexedOptionArray::new(
            buffer![0i64, -1],
            PrimitiveArray::new(buffer![3i64]).into_ref(),
        )
        .into_ref(),
    )
    .into_content();
    let once = nested.simplify().unwrap();
    let twice = once.simplify().unwrap();
    assert_eq!(once.as_ref(), twice.as_ref());
    assert_eq!(once.to_json().unwrap(), json!([null, null, 3]));
}

#[test]
fn single_arm_union_collapses_to_a_gather() {
    let union = UnionArray::try_new(
        buffer![0i8, 0],
        buffer![1i64, 0],
        vec![PrimitiveArray::new(buffer![10i64, 20]).into_ref()],
    )
    .unwrap();
    let simplified = union.simplify_uniontype(false).unwrap();
    assert!(!simplified.is_union_type());
    assert_eq!(simplified.to_json().unwrap(), json!([20, 10]));
}

#[rstest]
#[case::flat(PrimitiveArray::new(buffer![1i64, 2]).into_content())]
#[case::jagged(list_of_records())]
fn flatten_axis0_is_rejected(#[case] array: Content) {
    assert!(array.flatten(0).is_err());
}

#[test]
fn flatten_at_a_record_axis_is_rejected() {
    let record = RecordArray::from_fields(&[(
        "x",
        ListOffsetArray::try_new(
            buffer![0i64, 1],
            PrimitiveArray::new(buffer![1i64]).into_ref(),
        )
        .unwrap()
        .into_ref(),
    )])
    .unwrap()
    .into_content();
    // axis 1 names the record itself, which is transparent, not list-bearing.
    assert!(record.flatten(1).is_err());
    // the same holds one list layer down
    let lists = ListOffsetArray::try_new(buffer![0i64, 1], record.shallow_copy())
        .unwrap()
        .into_content();
    assert!(lists.flatten(2).is_err());
}

#[test]
fn public_constructors_produce_valid_trees() {
    for array in fixtures() {
        assert_eq!(array.validityerror(""), None);
    }
}

#[test]
fn record_field_round_trip() {
    let record = RecordArray::from_fields(&[
        ("x", PrimitiveArray::new(buffer![1i64, 2]).into_ref()),
    ])
    .unwrap();
    let value = PrimitiveArray::new(buffer![9.5f64, 8.5]).into_ref();
    let updated = record.setitem_field("v", value.clone()).unwrap();
    assert_eq!(updated.field("v").unwrap().as_ref(), value.as_ref());
}

// ----------------------------------------------------------------------
// slicing pipelines
// ----------------------------------------------------------------------

#[test]
fn field_then_range_through_lists() {
    let events = list_of_records();
    // events[:, "x"]
    let out = events
        .getitem(
            &Slice::new(vec![
                SliceItem::full_range(),
                SliceItem::Field("x".to_string()),
            ])
            .unwrap(),
        )
        .unwrap();
    assert_eq!(out.to_json().unwrap(), json!([[1, 2], [], [3, 4, 5]]));
}

#[test]
fn ellipsis_expands_to_full_ranges() {
    let events = list_of_records();
    let direct = events
        .getitem(&Slice::new(vec![SliceItem::full_range(), SliceItem::At(0)]).unwrap())
        .map(|c| c.to_json().unwrap());
    let ellipsis = events
        .getitem(&Slice::new(vec![SliceItem::Ellipsis, SliceItem::At(0)]).unwrap())
        .map(|c| c.to_json().unwrap());
    match (direct, ellipsis) {
        (Ok(a), Ok(b)) => assert_eq!(a, b),
        (Err(_), Err(_)) => {}
        other => panic!("direct and ellipsis slicing disagree: {:?}", other),
    }
}

#[test]
fn newaxis_inserts_a_length_one_axis() {
    let array = PrimitiveArray::new(buffer![1i64, 2, 3]).into_content();
    let out = array
        .getitem(&Slice::new(vec![SliceItem::NewAxis, SliceItem::full_range()]).unwrap())
        .unwrap();
    assert_eq!(out.to_json().unwrap(), json!([[1, 2, 3]]));
}

#[test]
fn missing_slice_inserts_nulls() {
    let array = PrimitiveArray::new(buffer![10i64, 20, 30]).into_content();
    // array[[0, None, 2]]
    let item = SliceItem::Missing {
        index: buffer![0i64, -1, 1],
        item: Box::new(SliceItem::array(buffer![0i64, 2])),
    };
    let out = array.getitem(&Slice::new(vec![item]).unwrap()).unwrap();
    assert_eq!(out.to_json().unwrap(), json!([10, null, 30]));
}

#[test]
fn arrays_as_slices_through_asslice() {
    let array = list_of_records();
    let picker = PrimitiveArray::new(buffer![2i64, 0]).into_content();
    let item = picker.asslice().unwrap();
    let out = array.getitem(&Slice::new(vec![item]).unwrap()).unwrap();
    assert_eq!(
        out.to_json().unwrap(),
        array.carry(&buffer![2i64, 0]).unwrap().to_json().unwrap()
    );

    let record = RecordArray::from_fields(&[(
        "x",
        PrimitiveArray::new(buffer![1i64]).into_ref(),
    )])
    .unwrap()
    .into_content();
    assert!(record.asslice().is_err());
}

// ----------------------------------------------------------------------
// axis-wise operations end to end
// ----------------------------------------------------------------------

#[test]
fn num_and_localindex_through_option_lists() {
    let lists = ListOffsetArray::try_new(
        buffer![0i64, 2, 2, 3],
        PrimitiveArray::new(buffer![5i64, 6, 7]).into_ref(),
    )
    .unwrap();
    let masked = ByteMaskedArray::new(buffer![1i8, 0, 1], lists.into_ref(), true).into_content();

    let nums = masked.num(1).unwrap();
    assert_eq!(nums.to_json().unwrap(), json!([2, null, 1]));

    let local = masked.localindex(1).unwrap();
    assert_eq!(local.to_json().unwrap(), json!([[0, 1], null, [0]]));
}

#[test]
fn rpad_pads_with_missing_rows() {
    let lists = ListOffsetArray::try_new(
        buffer![0i64, 2, 2, 3],
        PrimitiveArray::new(buffer![5i64, 6, 7]).into_ref(),
    )
    .unwrap()
    .into_content();

    let padded = lists.rpad(2, 1).unwrap();
    assert_eq!(
        padded.to_json().unwrap(),
        json!([[5, 6], [null, null], [7, null]])
    );

    let clipped = lists.rpad_and_clip(1, 1).unwrap();
    assert_eq!(clipped.to_json().unwrap(), json!([[5], [null], [7]]));

    let axis0 = lists.rpad(5, 0).unwrap();
    assert_eq!(
        axis0.to_json().unwrap(),
        json!([[5, 6], [], [7], null, null])
    );
}

#[test]
fn fillna_replaces_missing_rows() {
    let array = IndexedOptionArray::new(
        buffer![0i64, -1, 1],
        PrimitiveArray::new(buffer![1i64, 2]).into_ref(),
    )
    .into_content();
    let filled = array
        .fillna(&PrimitiveArray::new(buffer![0i64]).into_ref())
        .unwrap();
    assert_eq!(filled.to_json().unwrap(), json!([1, 0, 2]));
    // Compatible fill values collapse the union back to a single dense arm.
    assert!(!filled.is_union_type());
}

#[test]
fn is_none_marks_missing_rows() {
    let array = IndexedOptionArray::new(
        buffer![-1i64, 0, -1],
        PrimitiveArray::new(buffer![1i64]).into_ref(),
    )
    .into_content();
    let mask = array.is_none(0).unwrap();
    assert_eq!(mask.to_json().unwrap(), json!([true, false, true]));
}

#[test]
fn combinations_pairs_per_row() {
    let lists = ListOffsetArray::try_new(
        buffer![0i64, 3, 4],
        PrimitiveArray::new(buffer![1i64, 2, 3, 9]).into_ref(),
    )
    .unwrap()
    .into_content();
    let pairs = lists
        .combinations(
            2,
            false,
            Some(&vec!["a".to_string(), "b".to_string()]),
            &Parameters::new(),
            1,
        )
        .unwrap();
    assert_eq!(
        pairs.to_json().unwrap(),
        json!([
            [{"a": 1, "b": 2}, {"a": 1, "b": 3}, {"a": 2, "b": 3}],
            []
        ])
    );
    assert!(lists.combinations(0, false, None, &Parameters::new(), 1).is_err());
}

#[test]
fn jagged_slice_through_option_lists() {
    let lists = ListOffsetArray::try_new(
        buffer![0i64, 2, 2, 4],
        PrimitiveArray::new(buffer![1i64, 2, 3, 4]).into_ref(),
    )
    .unwrap();
    let masked = ByteMaskedArray::new(buffer![1i8, 0, 1], lists.into_ref(), true).into_content();
    // masked[[[1, 0], [], [0]]]
    let item = SliceItem::Jagged {
        offsets: buffer![0i64, 2, 2, 3],
        item: Box::new(SliceItem::array(buffer![1i64, 0, 0])),
    };
    let out = masked.getitem(&Slice::new(vec![item]).unwrap()).unwrap();
    assert_eq!(out.to_json().unwrap(), json!([[2, 1], null, [3]]));
}
