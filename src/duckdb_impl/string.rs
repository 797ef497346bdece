use libduckdb_sys::duckdb_string_t;

const INLINE_LIMIT: u32 = 12;

/// Borrow the bytes behind a DuckDB string value.
///
/// # Safety
///
/// `s` must be a non-NULL row of a `VARCHAR` vector owned by DuckDB for the
/// active callback; the returned slice must not outlive that vector.
unsafe fn duckdb_string_bytes(s: &duckdb_string_t) -> &[u8] {
    // SAFETY: both union arms start with the length field.
    let len = unsafe { s.value.inlined.length };
    if len == 0 {
        return &[];
    }

    if len <= INLINE_LIMIT {
        // SAFETY: short strings keep `len` bytes inline.
        let inlined = unsafe { &s.value.inlined.inlined };
        unsafe { std::slice::from_raw_parts(inlined.as_ptr() as *const u8, len as usize) }
    } else {
        // SAFETY: long strings point at `len` bytes of DuckDB-owned storage.
        let ptr = unsafe { s.value.pointer.ptr };
        unsafe { std::slice::from_raw_parts(ptr as *const u8, len as usize) }
    }
}

/// Decode a DuckDB string value into an owned `String`, replacing invalid
/// UTF-8 sequences.
///
/// # Safety
///
/// Same contract as reading the row directly: the caller has checked the row
/// is not NULL and the vector is alive.
pub unsafe fn decode_duckdb_string(s: &duckdb_string_t) -> String {
    // SAFETY: forwarded caller contract.
    let bytes = unsafe { duckdb_string_bytes(s) };
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use libduckdb_sys::{
        duckdb_string_t__bindgen_ty_1, duckdb_string_t__bindgen_ty_1__bindgen_ty_1,
        duckdb_string_t__bindgen_ty_1__bindgen_ty_2,
    };
    use std::os::raw::c_char;

    fn inlined(bytes: &[u8]) -> duckdb_string_t {
        let mut inlined = [0 as c_char; 12];
        for (dst, src) in inlined.iter_mut().zip(bytes) {
            *dst = *src as c_char;
        }
        duckdb_string_t {
            value: duckdb_string_t__bindgen_ty_1 {
                inlined: duckdb_string_t__bindgen_ty_1__bindgen_ty_2 {
                    length: bytes.len() as u32,
                    inlined,
                },
            },
        }
    }

    fn pointer(bytes: &mut [u8]) -> duckdb_string_t {
        let mut prefix = [0 as c_char; 4];
        for (dst, src) in prefix.iter_mut().zip(bytes.iter()) {
            *dst = *src as c_char;
        }
        duckdb_string_t {
            value: duckdb_string_t__bindgen_ty_1 {
                pointer: duckdb_string_t__bindgen_ty_1__bindgen_ty_1 {
                    length: bytes.len() as u32,
                    prefix,
                    ptr: bytes.as_mut_ptr() as *mut c_char,
                },
            },
        }
    }

    #[test]
    fn test_decode_empty() {
        let value = inlined(b"");
        // SAFETY: fixture is a valid inlined string.
        assert_eq!(unsafe { decode_duckdb_string(&value) }, "");
    }

    #[test]
    fn test_decode_inlined_theme_list() {
        let value = inlined(b"fork short");
        // SAFETY: fixture is a valid inlined string.
        assert_eq!(unsafe { decode_duckdb_string(&value) }, "fork short");
    }

    #[test]
    fn test_decode_twelve_bytes_stays_inline() {
        let value = inlined(b"e2e4 e7e5 d4");
        // SAFETY: fixture is a valid inlined string.
        assert_eq!(unsafe { decode_duckdb_string(&value) }, "e2e4 e7e5 d4");
    }

    #[test]
    fn test_decode_pointer_fen() {
        let mut backing = b"r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3".to_vec();
        let value = pointer(&mut backing);
        // SAFETY: backing storage outlives the decode.
        let decoded = unsafe { decode_duckdb_string(&value) };
        assert!(decoded.ends_with(" w KQkq - 2 3"));
        assert_eq!(decoded.len(), backing.len());
    }

    #[test]
    fn test_decode_pointer_invalid_utf8_is_lossy() {
        let mut backing = b"mateIn2 middlegame".to_vec();
        backing[3] = 0xff;
        let expected = String::from_utf8_lossy(&backing).into_owned();
        let value = pointer(&mut backing);
        // SAFETY: backing storage outlives the decode.
        assert_eq!(unsafe { decode_duckdb_string(&value) }, expected);
    }
}
