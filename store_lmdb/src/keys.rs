//! Composite-key helpers.
//!
//! Secondary indexes use `parent_id ++ child_id` composite keys so each
//! entry is its own LMDB key/value pair; listing all children of a parent is
//! a prefix range-scan.

/// Build composite key `parent ++ child` from two 16-byte ids.
pub(crate) fn composite_key(parent: &[u8; 16], child: &[u8; 16]) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(parent);
    key[16..].copy_from_slice(child);
    key
}

/// Increment a key prefix in place to form the exclusive upper bound of a
/// prefix range. Trailing 0xFF bytes are dropped; an all-0xFF prefix leaves
/// the vector empty, which callers translate to an unbounded upper bound.
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) {
    while let Some(last) = prefix.last_mut() {
        if *last == 0xFF {
            prefix.pop();
        } else {
            *last += 1;
            return;
        }
    }
}
