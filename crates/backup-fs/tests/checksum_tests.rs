use backup_fs::{HASH_CHUNK_SIZE, hash_bytes, hash_file, hash_reader};
use proptest::prelude::*;
use std::io::Cursor;

proptest! {
    #[test]
    fn reader_and_slice_agree(data in proptest::collection::vec(any::<u8>(), 0..(HASH_CHUNK_SIZE * 3))) {
        let from_reader = hash_reader(Cursor::new(data.clone())).unwrap();
        prop_assert_eq!(from_reader, hash_bytes(&data));
    }

    #[test]
    fn single_byte_change_changes_digest(
        data in proptest::collection::vec(any::<u8>(), 1..4096),
        idx in any::<prop::sample::Index>(),
    ) {
        let mut altered = data.clone();
        let i = idx.index(altered.len());
        altered[i] = altered[i].wrapping_add(1);
        prop_assert_ne!(hash_bytes(&data), hash_bytes(&altered));
    }
}

#[test]
fn file_digest_is_stable_across_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.bin");
    std::fs::write(&path, vec![0xAB; HASH_CHUNK_SIZE * 10 + 1]).unwrap();

    assert_eq!(hash_file(&path).unwrap(), hash_file(&path).unwrap());
}
