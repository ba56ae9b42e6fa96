use std::io::{Seek, SeekFrom, Write};

use maplit::btreemap;
use tempfile::NamedTempFile;

pub fn cnt_files() -> Vec<(&'static str, Vec<u8>)> {
    let files = btreemap! {
        "intro.bin" => vec![0x10, 0x20, 0x30, 0x40, 0x50],
        "music.bin" => (0..=255u8).collect::<Vec<u8>>(),
    };
    files.into_iter().collect()
}

pub fn archive_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file
}
