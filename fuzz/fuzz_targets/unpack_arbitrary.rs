#![no_main]

// Feeds arbitrary bytes through every entry point. Malformed input must produce an error,
// never a panic or an out of bounds write.

use crunch_unpack::{get_level_info, get_texture_info, unpack_begin, validate_file};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = validate_file(data);
    let Ok(texture) = get_texture_info(data) else {
        return;
    };
    for level in 0..texture.levels {
        let _ = get_level_info(data, level);
    }

    if let Ok(context) = unpack_begin(data) {
        for level in 0..texture.levels {
            if let Ok(blocks) = context.unpack_level_to_vec(level) {
                let info = context.level_info(level).unwrap();
                assert_eq!(Some(blocks.len()), info.output_size(info.min_row_pitch()));
            }
        }
    }
});
