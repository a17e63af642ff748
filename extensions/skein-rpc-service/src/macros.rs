use xxhash_rust::const_xxh3::xxh3_64 as const_xxh3_64;

pub const fn method_id_hash(name: &str) -> u64 {
    const_xxh3_64(name.as_bytes())
}

/// Compile-time method ID generator using xxHash3.
///
/// Servers key their method tables by this hash of the method name, so the
/// hot dispatch path is a single integer lookup.
///
/// ```rust
/// use skein_rpc_service::rpc_method_id;
/// let id_1 = rpc_method_id!("Get");
/// let id_2 = rpc_method_id!("GetById");
/// assert_ne!(id_1, id_2);
/// ```
#[macro_export]
macro_rules! rpc_method_id {
    ($name:literal) => {{
        const ID: u64 = $crate::method_id_hash($name);
        ID
    }};
}
