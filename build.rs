use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

const MIN_LG_AREA_SIZE: u32 = 16;
const MAX_LG_AREA_SIZE: u32 = 47;

#[derive(Deserialize, Default)]
struct ArenaSection {
    lg_area_size: Option<u32>,
    area_size: Option<u64>,
    page_size: Option<u64>,
}

#[derive(Deserialize, Default)]
struct Config {
    #[serde(default)]
    arena: ArenaSection,
}

struct ResolvedConfig {
    lg_area_size: u32,
    area_size: u64,
    page_size: u64,
    page_shift: u32,
}

fn resolve_config(cfg: &ArenaSection) -> ResolvedConfig {
    let lg_area_size = cfg.lg_area_size.unwrap_or(30);
    assert!(
        (MIN_LG_AREA_SIZE..=MAX_LG_AREA_SIZE).contains(&lg_area_size),
        "lg_area_size ({}) must be in {}..={}",
        lg_area_size,
        MIN_LG_AREA_SIZE,
        MAX_LG_AREA_SIZE
    );

    let page_size = cfg.page_size.unwrap_or(4096);
    assert!(
        page_size > 0 && page_size.is_power_of_two(),
        "page_size ({}) must be a power of 2",
        page_size
    );
    assert!(
        page_size >= 4096,
        "page_size ({}) must be >= 4096",
        page_size
    );

    let area_size = cfg.area_size.unwrap_or(1u64 << lg_area_size);
    assert!(area_size > 0, "area_size must be > 0");
    assert!(
        area_size % page_size == 0,
        "area_size ({}) must be a multiple of page_size ({})",
        area_size,
        page_size
    );
    assert!(
        area_size <= 1u64 << lg_area_size,
        "area_size ({}) must not exceed 2^lg_area_size ({})",
        area_size,
        1u64 << lg_area_size
    );
    assert!(
        page_size <= 1u64 << lg_area_size,
        "page_size ({}) must not exceed the area alignment",
        page_size
    );

    ResolvedConfig {
        lg_area_size,
        area_size,
        page_size,
        page_shift: page_size.trailing_zeros(),
    }
}

fn default_config_path() -> String {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    format!("{}/contarena.toml", manifest_dir)
}

fn generate_config(cfg: &ResolvedConfig, out_path: &Path) {
    let code = format!(
        "// Auto-generated by build.rs. Do not edit.\n\n\
         pub const LG_AREA_SIZE: u32 = {};\n\
         pub const AREA_SIZE: usize = {};\n\
         pub const PAGE_SHIFT: usize = {};\n\
         pub const PAGE_SIZE: usize = {};\n",
        cfg.lg_area_size, cfg.area_size, cfg.page_shift, cfg.page_size,
    );
    fs::write(out_path, code).expect("failed to write config_gen.rs");
}

fn main() {
    println!("cargo:rerun-if-env-changed=CONTARENA_CONFIG");

    let out_dir = env::var("OUT_DIR").unwrap();

    let config_path = env::var("CONTARENA_CONFIG").unwrap_or_else(|_| default_config_path());
    println!("cargo:rerun-if-changed={}", config_path);
    let content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", config_path, e));

    let config: Config = toml::from_str(&content).expect("failed to parse TOML config");
    let resolved = resolve_config(&config.arena);

    generate_config(&resolved, &Path::new(&out_dir).join("config_gen.rs"));
}
