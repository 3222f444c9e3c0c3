#![no_main]

// Corrupts bytes of a valid file. Arbitrary input rarely gets past the header, so this
// reaches the prefix code, palette and level decoders far more often.

use crunch_unpack::fixtures::CrnFixture;
use crunch_unpack::{CrnFormat, unpack_begin};
use libfuzzer_sys::{arbitrary, fuzz_target};

#[derive(Clone, Debug, arbitrary::Arbitrary)]
pub struct Corruption {
    pub format: u8,
    pub width: u8,
    pub height: u8,
    pub cube_map: bool,
    pub edits: Vec<(u16, u8)>,
}

fuzz_target!(|input: Corruption| {
    let formats = [
        CrnFormat::Dxt1,
        CrnFormat::Dxt5,
        CrnFormat::Dxt5A,
        CrnFormat::DxnXY,
        CrnFormat::Etc1,
        CrnFormat::Etc2A,
        CrnFormat::Etc1S,
        CrnFormat::Etc2AS,
    ];
    let format = formats[input.format as usize % formats.len()];
    let width = input.width as u32 + 1;
    let height = input.height as u32 + 1;
    let faces = if input.cube_map { 6 } else { 1 };
    let mut data = CrnFixture::simple(format, width, height, 1, faces).build();

    for (position, value) in input.edits {
        let position = position as usize % data.len();
        data[position] ^= value;
    }

    if let Ok(context) = unpack_begin(&data) {
        let _ = context.unpack_level_to_vec(0);
    }
});
