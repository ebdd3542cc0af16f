//! Small shared helpers

/// Content hash of a block: BLAKE3, lowercase hex
pub fn hash(buf: &[u8]) -> String {
	hex::encode(blake3::hash(buf).as_bytes())
}

/// Whether a filename can live in the flat namespace and the checkpoint log
///
/// The name must be a single plain path component: no separators, no `.` or
/// `..`, and nothing the log format cannot represent.
pub fn is_syncable_name(name: &str) -> bool {
	!name.is_empty()
		&& name != "."
		&& name != ".."
		&& !name.contains(|c: char| matches!(c, ',' | '\n' | '\r' | '/' | '\\' | '\0'))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_is_hex_and_stable() {
		let h = hash(b"hello");
		assert_eq!(h.len(), 64);
		assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
		assert_eq!(h, hash(b"hello"));
		assert_ne!(h, hash(b"hello!"));
	}

	#[test]
	fn test_syncable_names() {
		assert!(is_syncable_name("notes.txt"));
		assert!(!is_syncable_name("a,b.txt"));
		assert!(!is_syncable_name("line\nbreak"));
		assert!(!is_syncable_name(""));
		assert!(!is_syncable_name("../escape.txt"));
		assert!(!is_syncable_name("sub/file"));
		assert!(!is_syncable_name("sub\\file"));
		assert!(!is_syncable_name("."));
		assert!(!is_syncable_name(".."));
		assert!(is_syncable_name("..hidden"));
	}
}

// vim: ts=4
