use rstest::rstest;
use temp_dir::TempDir;

use topic_query::{base::Len, query::QueryIndex, Error};

#[test]
fn test_slots() {
    let index = QueryIndex::parse("3 4 7 9\n2 7 1\n", 10, None).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.num_slots(), 5);
    assert_eq!(index.words(), &[4, 7, 9, 7, 1]);
    assert_eq!(index.slots(0), 0..3);
    assert_eq!(index.slots(1), 3..5);
    assert_eq!(index.query_of(3), 1);

    // Word 7 is shared: its second slot copies the first one
    assert_eq!(index.primary_slot(7), Some(1));
    assert!(index.is_primary(1));
    assert!(!index.is_primary(3));
    assert_eq!(index.primary_slot(2), None);
    assert_eq!(index.primary_slot(100), None);
}

#[test]
fn test_repeated_word_in_query() {
    let index = QueryIndex::parse("3 5 5 6 1 5", 10, None).unwrap();
    assert_eq!(index.words(), &[5, 6, 5]);
    assert_eq!(index.slots(0), 0..2);
    assert_eq!(index.slots(1), 2..3);
}

#[test]
fn test_empty_query() {
    let index = QueryIndex::parse("0 1 3", 10, None).unwrap();
    assert_eq!(index.num_queries(), 2);
    assert!(index.slots(0).is_empty());
    assert_eq!(index.slots(1), 0..1);
}

#[test]
fn test_trailing_content() {
    let index = QueryIndex::parse("2 1 2\nend of file\n1 3", 10, None).unwrap();
    assert_eq!(index.num_queries(), 1);
    assert_eq!(index.words(), &[1, 2]);
}

#[rstest]
#[case("2 1 x", 0, 1)]
#[case("1 2\n3 1 2", 1, 2)]
#[case("1 10", 0, 0)]
#[case("2 1 -3", 0, 1)]
fn test_malformed(#[case] text: &str, #[case] query: usize, #[case] position: usize) {
    match QueryIndex::parse(text, 10, None) {
        Err(Error::MalformedQuery {
            query: q,
            position: p,
            ..
        }) => {
            assert_eq!((q, p), (query, position));
        }
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("'{}' should not parse", text),
    }
}

#[rstest]
#[case(4, true)]
#[case(5, false)]
fn test_capacity(#[case] limit: usize, #[case] fails: bool) {
    // Five slots: the shared word 2 has one slot per query
    let result = QueryIndex::parse("3 1 2 3\n2 2 4", 10, Some(limit));
    match result {
        Err(Error::QueryCapacity { limit: l }) => {
            assert!(fails);
            assert_eq!(l, limit);
        }
        Err(e) => panic!("unexpected error {}", e),
        Ok(index) => {
            assert!(!fails);
            assert_eq!(index.num_slots(), 5);
        }
    }
}

#[test]
fn test_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.child("queries.txt");
    std::fs::write(&path, "2 0 1\n1 1\n").unwrap();
    let index = QueryIndex::read(&path, 2, None).unwrap();
    assert_eq!(index.num_queries(), 2);

    let missing = dir.child("missing.txt");
    assert!(matches!(
        QueryIndex::read(&missing, 2, None),
        Err(Error::Io { .. })
    ));
}
