use pdf_cmap::{CMap, Result};
use std::io::Write;
use tempfile::NamedTempFile;

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn write_fixture(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create fixture file");
    file.write_all(content).expect("Failed to write fixture file");
    file
}

#[allow(dead_code)]
pub fn load_cmap(content: &[u8], lenient: bool) -> Result<CMap> {
    init_logger();
    let file = write_fixture(content);
    CMap::load(file.path(), lenient)
}

/// Wrap CMap blocks into the usual CIDInit resource boilerplate.
#[allow(dead_code)]
pub fn cmap_resource(name: &str, cmap_type: i64, blocks: &str) -> Vec<u8> {
    format!(
        "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /{} def
/CMapType {} def
{}
endcmap
CMapName currentdict /CMap defineresource pop
end
end
",
        name, cmap_type, blocks
    )
    .into_bytes()
}
