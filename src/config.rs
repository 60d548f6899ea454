//! Compile-time arena layout, generated by `build.rs` from `contarena.toml`
//! (or the file named by `CONTARENA_CONFIG`).

include!(concat!(env!("OUT_DIR"), "/config_gen.rs"));

/// Alignment of the reserved area in bytes.
pub const AREA_ALIGN: usize = 1 << LG_AREA_SIZE;

const _: () = assert!(PAGE_SIZE == 1 << PAGE_SHIFT);
const _: () = assert!(AREA_SIZE % PAGE_SIZE == 0);
const _: () = assert!(AREA_SIZE <= AREA_ALIGN);
