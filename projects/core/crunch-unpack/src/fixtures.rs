//! Synthetic CRN files for tests, benchmarks and fuzzing.
//!
//! [`CrnFixture`] describes a texture by its final palette entries and, for every block, the
//! endpoint reference and palette indices it uses. [`CrnFixture::build`] entropy codes that
//! description into a valid CRN file, and [`CrnFixture::expected_level`] assembles the blocks the
//! file should decode to directly from the description.
//!
//! A block that reuses a neighbour's endpoints gets whatever that neighbour resolved to, so the
//! endpoints of such blocks in the description are ignored.
//!
//! Every prefix code written here is the complete code from [`complete_lengths`], so any symbol
//! below the alphabet size can be encoded.

use crate::codebook::{CODE_LENGTH_ORDER, MAX_CODE_LENGTH};
use crate::format::{BlockLayout, Channel, CrnFormat};
use crate::palette::{DXT1_FROM_LINEAR, DXT5_FROM_LINEAR, ETC1_FROM_LINEAR};
use crate::unpack::REFERENCE_SYMBOLS;
use crate::util::crc16::crc16;
use alloc::vec;
use alloc::vec::Vec;

/// EAC modifier index of each linear alpha selector. Negative modifiers are stored smallest
/// magnitude first.
const EAC_FROM_LINEAR: [u8; 8] = [3, 2, 1, 0, 4, 5, 6, 7];

/// Writes bits most significant first, the layout [`BitReader`](crate::bitstream) reads.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u64,
    count: u32,
}

impl BitWriter {
    /// An empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the low `bits` bits of `value`.
    pub fn put_bits(&mut self, value: u32, bits: u32) {
        assert!(bits <= 32);
        assert!(bits == 32 || value >> bits == 0, "{value} does not fit in {bits} bits");
        self.acc = (self.acc << bits) | value as u64;
        self.count += bits;
        while self.count >= 8 {
            self.count -= 8;
            self.bytes.push((self.acc >> self.count) as u8);
        }
        self.acc &= (1u64 << self.count) - 1;
    }

    /// Pads the final byte with zero bits and returns the data.
    pub fn finish(mut self) -> Vec<u8> {
        if self.count > 0 {
            self.bytes.push((self.acc << (8 - self.count)) as u8);
        }
        self.bytes
    }
}

/// Code lengths of a complete prefix code over `num_symbols` symbols, as balanced as possible.
pub fn complete_lengths(num_symbols: usize) -> Vec<u8> {
    assert!(num_symbols > 0);
    if num_symbols == 1 {
        return vec![1];
    }
    let bits = usize::BITS - (num_symbols - 1).leading_zeros();
    let short = (1usize << bits) - num_symbols;
    (0..num_symbols)
        .map(|symbol| (if symbol < short { bits - 1 } else { bits }) as u8)
        .collect()
}

/// Canonical codes for `lengths`: shorter codes first, ties broken by symbol.
pub fn canonical_codes(lengths: &[u8]) -> Vec<u32> {
    let mut counts = [0u32; MAX_CODE_LENGTH + 1];
    for &length in lengths {
        counts[length as usize] += 1;
    }
    counts[0] = 0;

    let mut next = [0u32; MAX_CODE_LENGTH + 1];
    for len in 1..MAX_CODE_LENGTH {
        next[len + 1] = (next[len] + counts[len]) << 1;
    }

    lengths
        .iter()
        .map(|&length| {
            if length == 0 {
                return 0;
            }
            let code = next[length as usize];
            next[length as usize] += 1;
            code
        })
        .collect()
}

/// Transmits `lengths` in the layout read by the prefix code receiver.
///
/// The code length code gives literal lengths 0..=15 four bits each, so each length is sent as
/// its own four-bit value.
pub fn send_prefix_code(writer: &mut BitWriter, lengths: &[u8]) {
    writer.put_bits(lengths.len() as u32, 14);
    writer.put_bits(CODE_LENGTH_ORDER.len() as u32, 5);
    for &symbol in &CODE_LENGTH_ORDER {
        writer.put_bits(if symbol < 16 { 4 } else { 0 }, 3);
    }
    for &length in lengths {
        assert!(length < 16);
        writer.put_bits(length as u32, 4);
    }
}

/// Encoder for one complete prefix code.
#[derive(Debug, Clone)]
pub struct PrefixEncoder {
    lengths: Vec<u8>,
    codes: Vec<u32>,
}

impl PrefixEncoder {
    /// A complete code over `num_symbols` symbols.
    pub fn complete(num_symbols: usize) -> Self {
        let lengths = complete_lengths(num_symbols);
        let codes = canonical_codes(&lengths);
        Self { lengths, codes }
    }

    /// Transmits the code lengths.
    pub fn send(&self, writer: &mut BitWriter) {
        send_prefix_code(writer, &self.lengths);
    }

    /// Writes the code of `symbol`.
    pub fn put(&self, writer: &mut BitWriter, symbol: u32) {
        let symbol = symbol as usize;
        writer.put_bits(self.codes[symbol], self.lengths[symbol] as u32);
    }
}

/// `(to - from) mod modulus`.
fn wrapping_delta(from: u32, to: u32, modulus: u32) -> u32 {
    (to + modulus - from) % modulus
}

/// Encodes a colour endpoint palette section.
///
/// With `etc`, each value holds 5-bit red, green and blue and a 3-bit modifier table, one per
/// byte. Otherwise each value is two RGB565 colours.
pub fn encode_color_endpoints(values: &[u32], etc: bool) -> Vec<u8> {
    let dm5 = PrefixEncoder::complete(32);
    let mut writer = BitWriter::new();
    dm5.send(&mut writer);

    if etc {
        let mut previous = [0u32; 4];
        for &value in values {
            for (lane, previous) in previous.iter_mut().enumerate() {
                let component = value >> (lane * 8) & 0xFF;
                assert!(component < 32, "{value:#x} is not an ETC base colour");
                dm5.put(&mut writer, wrapping_delta(*previous, component, 32));
                *previous = component;
            }
        }
        return writer.finish();
    }

    const MODULI: [u32; 6] = [32, 64, 32, 32, 64, 32];
    let dm6 = PrefixEncoder::complete(64);
    dm6.send(&mut writer);

    let mut previous = [0u32; 6];
    for &value in values {
        let (c0, c1) = (value & 0xFFFF, value >> 16);
        let components = [
            (c0 >> 11) & 31,
            (c0 >> 5) & 63,
            c0 & 31,
            (c1 >> 11) & 31,
            (c1 >> 5) & 63,
            c1 & 31,
        ];
        for i in 0..6 {
            let encoder = if MODULI[i] == 32 { &dm5 } else { &dm6 };
            encoder.put(&mut writer, wrapping_delta(previous[i], components[i], MODULI[i]));
            previous[i] = components[i];
        }
    }
    writer.finish()
}

/// Shared selector palette encoding: each entry is sent as the groups of bits that differ from
/// the previous entry, lowest group first.
fn encode_selectors(entries: impl Iterator<Item = u64>, group_bits: u32, total_bits: u32) -> Vec<u8> {
    let dm = PrefixEncoder::complete(1 << group_bits);
    let mut writer = BitWriter::new();
    dm.send(&mut writer);

    let mask = (1u64 << group_bits) - 1;
    let mut previous = 0u64;
    for linear in entries {
        assert_eq!(linear >> total_bits, 0, "{linear:#x} has more than {total_bits} bits");
        let changed = previous ^ linear;
        for shift in (0..total_bits).step_by(group_bits as usize) {
            dm.put(&mut writer, (changed >> shift & mask) as u32);
        }
        previous = linear;
    }
    writer.finish()
}

/// Encodes a colour selector palette section from linear selectors, texel `i` at bits `2i`.
pub fn encode_color_selectors(values: &[u32]) -> Vec<u8> {
    encode_selectors(values.iter().map(|&value| value as u64), 4, 32)
}

/// Encodes an alpha endpoint palette section.
pub fn encode_alpha_endpoints(values: &[u16]) -> Vec<u8> {
    let dm = PrefixEncoder::complete(256);
    let mut writer = BitWriter::new();
    dm.send(&mut writer);

    let (mut a0, mut a1) = (0u32, 0u32);
    for &value in values {
        let (next0, next1) = ((value & 0xFF) as u32, (value >> 8) as u32);
        dm.put(&mut writer, wrapping_delta(a0, next0, 256));
        dm.put(&mut writer, wrapping_delta(a1, next1, 256));
        (a0, a1) = (next0, next1);
    }
    writer.finish()
}

/// Encodes an alpha selector palette section from linear selectors, texel `i` at bits `3i`.
pub fn encode_alpha_selectors(values: &[u64]) -> Vec<u8> {
    encode_selectors(values.iter().copied(), 6, 48)
}

/// Linear texel shown at output texel `(x, y)`. Transposed selectors are read column by column.
fn source_texel(x: usize, y: usize, transposed: bool) -> usize {
    if transposed { x * 4 + y } else { y * 4 + x }
}

/// Selector bytes of a colour block showing the linear selector `linear`.
///
/// BC1 packs texel `i` in raster order at bits `2i`. ETC1 stores two big-endian bit planes, the
/// high index bits first, with texel `(x, y)` at bit `4x + y` of each.
pub fn color_selector_bytes(format: CrnFormat, linear: u32, transposed: bool) -> [u8; 4] {
    let value = |x: usize, y: usize| (linear >> (2 * source_texel(x, y, transposed)) & 3) as usize;

    if !format.has_etc_color() {
        let bits = (0..16usize).fold(0u32, |bits, i| {
            bits | (DXT1_FROM_LINEAR[value(i % 4, i / 4)] as u32) << (2 * i)
        });
        return bits.to_le_bytes();
    }

    let (mut high, mut low) = (0u16, 0u16);
    for y in 0..4 {
        for x in 0..4 {
            let index = ETC1_FROM_LINEAR[value(x, y)] as u16;
            high |= (index >> 1) << (4 * x + y);
            low |= (index & 1) << (4 * x + y);
        }
    }
    let mut bytes = [0u8; 4];
    bytes[..2].copy_from_slice(&high.to_be_bytes());
    bytes[2..].copy_from_slice(&low.to_be_bytes());
    bytes
}

/// Selector bytes of an alpha block showing the linear selector `linear`.
///
/// BC4 packs texel `i` in raster order at bits `3i`, little endian. EAC is a big-endian 48-bit
/// value holding the texels column by column from the top bits down.
pub fn alpha_selector_bytes(format: CrnFormat, linear: u64, transposed: bool) -> [u8; 6] {
    let value = |x: usize, y: usize| (linear >> (3 * source_texel(x, y, transposed)) & 7) as usize;

    let mut bytes = [0u8; 6];
    if format.has_etc_alpha() {
        let bits = (0..16usize).fold(0u64, |bits, q| {
            bits | (EAC_FROM_LINEAR[value(q / 4, q % 4)] as u64) << (45 - 3 * q)
        });
        bytes.copy_from_slice(&bits.to_be_bytes()[2..]);
    } else {
        let bits = (0..16usize).fold(0u64, |bits, i| {
            bits | (DXT5_FROM_LINEAR[value(i % 4, i / 4)] as u64) << (3 * i)
        });
        bytes.copy_from_slice(&bits.to_le_bytes()[..6]);
    }
    bytes
}

/// First word of an ETC1 block whose subblocks use the packed base colours `first` and
/// `second`.
fn etc1_base_colors(first: u32, second: u32, flip: bool) -> [u8; 4] {
    let (a, b) = (first.to_le_bytes(), second.to_le_bytes());
    let deltas: [i32; 3] = core::array::from_fn(|c| b[c] as i32 - a[c] as i32);
    let differential = deltas.iter().all(|delta| (-4..=3).contains(delta));

    let mut word = [0u8; 4];
    for c in 0..3 {
        word[c] = if differential {
            a[c] << 3 | (deltas[c] as u8 & 7)
        } else {
            (a[c] >> 1) << 4 | b[c] >> 1
        };
    }
    word[3] = a[3] << 5 | b[3] << 2 | (differential as u8) << 1 | flip as u8;
    word
}

/// First word of an ETC1 block where both subblocks use the packed base colour `packed`.
fn etc1s_base_color(packed: u32) -> [u8; 4] {
    let [r, g, b, table] = packed.to_le_bytes();
    [r << 3, g << 3, b << 3, table << 5 | table << 2 | 0b10]
}

/// Endpoint reference and palette indices of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockIndices {
    /// Where the endpoints come from: 0 delta coded, 1 the block to the left, 2 the block above,
    /// 3 the second subblock above and to the left for ETC blocks with subblocks, otherwise the
    /// block above.
    pub reference: u8,
    /// ETC blocks with subblocks: a non-zero mode reads `second_endpoint`, and bit 1 clear sets
    /// the block's flip bit.
    pub etc_mode: u8,
    /// Endpoint index per channel in decode order. Only used by delta coded blocks.
    pub endpoints: [u32; 2],
    /// Colour endpoint of the second subblock, used when `etc_mode` is non-zero.
    pub second_endpoint: u32,
    /// Selector index per channel in decode order.
    pub selectors: [u32; 2],
}

/// Small deterministic generator so fixtures are reproducible.
#[derive(Debug, Clone)]
pub struct FixtureRng(u32);

impl FixtureRng {
    /// A generator seeded with `seed`.
    pub fn new(seed: u32) -> Self {
        Self(seed | 1)
    }

    /// Next raw value.
    pub fn next_u32(&mut self) -> u32 {
        // xorshift32
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        (self.next_u32() as u64) << 32 | self.next_u32() as u64
    }

    /// Next value below `bound`.
    pub fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound
    }
}

/// Palette sizes used by [`CrnFixture::random`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PaletteSizes {
    pub color_endpoints: usize,
    pub color_selectors: usize,
    pub alpha_endpoints: usize,
    pub alpha_selectors: usize,
}

impl Default for PaletteSizes {
    fn default() -> Self {
        Self {
            color_endpoints: 7,
            color_selectors: 5,
            alpha_endpoints: 6,
            alpha_selectors: 4,
        }
    }
}

/// Description of a CRN file.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct CrnFixture {
    pub format: CrnFormat,
    pub width: u32,
    pub height: u32,
    pub faces: u32,
    pub userdata: [u32; 2],
    /// RGB565 pairs, or ETC base colours for ETC formats.
    pub color_endpoints: Vec<u32>,
    /// Linear colour selectors.
    pub color_selectors: Vec<u32>,
    pub alpha_endpoints: Vec<u16>,
    /// Linear alpha selectors.
    pub alpha_selectors: Vec<u64>,
    /// Blocks of every level and face in raster order, over the block grid rounded up to even
    /// dimensions.
    pub levels: Vec<Vec<Vec<BlockIndices>>>,
}

/// Block counts of a level.
#[derive(Debug, Clone, Copy)]
struct LevelLayout {
    blocks_x: usize,
    blocks_y: usize,
    /// Grid width rounded up to even.
    width: usize,
    /// Grid height rounded up to even.
    height: usize,
}

impl CrnFixture {
    /// A fixture with no palettes or levels.
    pub fn new(format: CrnFormat, width: u32, height: u32, faces: u32) -> Self {
        Self {
            format,
            width,
            height,
            faces,
            userdata: [0; 2],
            color_endpoints: Vec::new(),
            color_selectors: Vec::new(),
            alpha_endpoints: Vec::new(),
            alpha_selectors: Vec::new(),
            levels: Vec::new(),
        }
    }

    /// A fixture with small random palettes and random blocks.
    pub fn simple(format: CrnFormat, width: u32, height: u32, levels: u32, faces: u32) -> Self {
        Self::random(format, width, height, levels, faces, PaletteSizes::default())
    }

    /// A fixture with random palettes of the given sizes and random blocks.
    pub fn random(
        format: CrnFormat,
        width: u32,
        height: u32,
        levels: u32,
        faces: u32,
        sizes: PaletteSizes,
    ) -> Self {
        let mut rng = FixtureRng::new(width * 7919 + height * 104_729 + format as u32);
        let mut fixture = Self::new(format, width, height, faces);

        if format.has_color() {
            for _ in 0..sizes.color_endpoints {
                fixture.color_endpoints.push(if format.has_etc_color() {
                    rng.below(32) | rng.below(32) << 8 | rng.below(32) << 16 | rng.below(8) << 24
                } else {
                    rng.next_u32()
                });
            }
            fixture.color_selectors = (0..sizes.color_selectors).map(|_| rng.next_u32()).collect();
        }
        if format.has_alpha() {
            fixture.alpha_endpoints = (0..sizes.alpha_endpoints)
                .map(|_| rng.next_u32() as u16)
                .collect();
            fixture.alpha_selectors = (0..sizes.alpha_selectors)
                .map(|_| rng.next_u64() & 0xFFFF_FFFF_FFFF)
                .collect();
        }

        let slots = format.block_layout().map_or(&[][..], BlockLayout::slots);
        for level in 0..levels {
            let layout = fixture.layout(level);
            let mut level_faces = Vec::new();
            for _ in 0..faces {
                let mut blocks = Vec::with_capacity(layout.width * layout.height);
                for _ in 0..layout.width * layout.height {
                    let mut block = BlockIndices {
                        reference: rng.below(4) as u8,
                        etc_mode: rng.below(4) as u8,
                        ..Default::default()
                    };
                    for (slot, channel) in slots.iter().enumerate() {
                        let (endpoints, selectors) = fixture.palette_sizes(channel.channel);
                        block.endpoints[slot] = rng.below(endpoints as u32);
                        block.selectors[slot] = rng.below(selectors as u32);
                    }
                    if format.has_subblocks() {
                        block.second_endpoint = rng.below(fixture.color_endpoints.len() as u32);
                    }
                    blocks.push(block);
                }
                level_faces.push(blocks);
            }
            fixture.levels.push(level_faces);
        }
        fixture
    }

    fn layout(&self, level: u32) -> LevelLayout {
        let blocks_x = (self.width >> level).max(1).div_ceil(4) as usize;
        let blocks_y = (self.height >> level).max(1).div_ceil(4) as usize;
        LevelLayout {
            blocks_x,
            blocks_y,
            width: blocks_x.next_multiple_of(2),
            height: blocks_y.next_multiple_of(2),
        }
    }

    fn palette_sizes(&self, channel: Channel) -> (usize, usize) {
        match channel {
            Channel::Color => (self.color_endpoints.len(), self.color_selectors.len()),
            Channel::Alpha => (self.alpha_endpoints.len(), self.alpha_selectors.len()),
        }
    }

    /// Runs the endpoint prediction over `level` the way the decoder does.
    ///
    /// Returns every block with the endpoints it resolves to, and the entropy coded level
    /// stream.
    fn walk_level(&self, level: u32) -> (Vec<Vec<BlockIndices>>, Vec<u8>) {
        let faces = &self.levels[level as usize];
        let Some(block_layout) = self.format.block_layout() else {
            return (faces.clone(), vec![0]);
        };
        let layout = self.layout(level);
        let subblocks = matches!(block_layout, BlockLayout::Subblocks { .. });

        let reference_code = PrefixEncoder::complete(REFERENCE_SYMBOLS as usize);
        let codes: Vec<(PrefixEncoder, PrefixEncoder, u32)> = block_layout
            .slots()
            .iter()
            .map(|slot| {
                let (endpoints, selectors) = self.palette_sizes(slot.channel);
                (
                    PrefixEncoder::complete(endpoints),
                    PrefixEncoder::complete(selectors),
                    endpoints as u32,
                )
            })
            .collect();

        let mut writer = BitWriter::new();
        let mut current = [0u32; 2];
        let mut diagonal = [0u32; 2];
        let mut columns = vec![[0u32; 2]; layout.width * if subblocks { 2 } else { 1 }];
        let mut resolved = faces.clone();

        for (blocks, resolved_blocks) in faces.iter().zip(resolved.iter_mut()) {
            for y in 0..layout.height {
                for x in 0..layout.width {
                    let index = y * layout.width + x;
                    let block = blocks[index];
                    let column = if subblocks { x * 2 } else { x };

                    if subblocks && y % 2 == 0 {
                        let below = blocks[index + layout.width];
                        let symbol = (block.reference & 3)
                            | (below.reference & 3) << 2
                            | (block.etc_mode & 3) << 4
                            | (below.etc_mode & 3) << 6;
                        reference_code.put(&mut writer, symbol as u32);
                    } else if !subblocks && x % 2 == 0 && y % 2 == 0 {
                        let reference = |dx: usize, dy: usize| {
                            (blocks[index + dy * layout.width + dx].reference & 3) as u32
                        };
                        let symbol = reference(0, 0)
                            | reference(0, 1) << 2
                            | reference(1, 0) << 4
                            | reference(1, 1) << 6;
                        reference_code.put(&mut writer, symbol);
                    }

                    match block.reference & 3 {
                        0 => {
                            for (slot, (endpoint_code, _, count)) in codes.iter().enumerate() {
                                let endpoint = block.endpoints[slot];
                                endpoint_code
                                    .put(&mut writer, wrapping_delta(current[slot], endpoint, *count));
                                current[slot] = endpoint;
                            }
                            columns[column] = current;
                        }
                        1 => columns[column] = current,
                        3 if subblocks => {
                            current = diagonal;
                            columns[column] = current;
                        }
                        _ => current = columns[column],
                    }
                    let out = &mut resolved_blocks[index];
                    out.endpoints = current;

                    for (slot, (_, selector_code, _)) in codes.iter().enumerate() {
                        selector_code.put(&mut writer, block.selectors[slot]);
                    }

                    if subblocks {
                        if block.etc_mode & 3 != 0 {
                            let (endpoint_code, _, count) = &codes[0];
                            let second = block.second_endpoint;
                            endpoint_code.put(&mut writer, wrapping_delta(current[0], second, *count));
                            current[0] = second;
                        }
                        out.second_endpoint = current[0];
                        diagonal = core::mem::replace(&mut columns[column + 1], current);
                    }
                }
            }
        }
        (resolved, writer.finish())
    }

    /// Entropy codes the fixture into a CRN file with valid checksums.
    pub fn build(&self) -> Vec<u8> {
        let levels = self.levels.len();
        assert!(levels > 0, "a fixture needs at least one level");
        for (level, faces) in self.levels.iter().enumerate() {
            let layout = self.layout(level as u32);
            assert_eq!(faces.len(), self.faces as usize);
            for blocks in faces {
                assert_eq!(blocks.len(), layout.width * layout.height);
            }
        }

        let header_size = 70 + 4 * levels;
        let mut out = vec![0u8; header_size];

        let mut tables = BitWriter::new();
        PrefixEncoder::complete(REFERENCE_SYMBOLS as usize).send(&mut tables);
        if !self.color_endpoints.is_empty() {
            PrefixEncoder::complete(self.color_endpoints.len()).send(&mut tables);
            PrefixEncoder::complete(self.color_selectors.len()).send(&mut tables);
        }
        if !self.alpha_endpoints.is_empty() {
            PrefixEncoder::complete(self.alpha_endpoints.len()).send(&mut tables);
            PrefixEncoder::complete(self.alpha_selectors.len()).send(&mut tables);
        }
        let tables = tables.finish();
        let tables_offset = out.len();
        out.extend_from_slice(&tables);

        let etc = self.format.has_etc_color();
        let sections = [
            (self.color_endpoints.len(), encode_color_endpoints(&self.color_endpoints, etc)),
            (self.color_selectors.len(), encode_color_selectors(&self.color_selectors)),
            (self.alpha_endpoints.len(), encode_alpha_endpoints(&self.alpha_endpoints)),
            (self.alpha_selectors.len(), encode_alpha_selectors(&self.alpha_selectors)),
        ];
        let mut palettes = [(0u32, 0u32, 0u16); 4];
        for ((count, bytes), palette) in sections.iter().zip(palettes.iter_mut()) {
            if *count > 0 {
                *palette = (out.len() as u32, bytes.len() as u32, *count as u16);
                out.extend_from_slice(bytes);
            }
        }

        let mut level_offsets = Vec::with_capacity(levels);
        for level in 0..levels {
            level_offsets.push(out.len() as u32);
            let (_, stream) = self.walk_level(level as u32);
            out.extend_from_slice(&stream);
        }

        let data_size = out.len() as u32;
        out[0..2].copy_from_slice(&0x4878u16.to_be_bytes());
        out[2..4].copy_from_slice(&(header_size as u16).to_be_bytes());
        out[6..10].copy_from_slice(&data_size.to_be_bytes());
        out[12..14].copy_from_slice(&(self.width as u16).to_be_bytes());
        out[14..16].copy_from_slice(&(self.height as u16).to_be_bytes());
        out[16] = levels as u8;
        out[17] = self.faces as u8;
        out[18] = self.format as u8;
        out[25..29].copy_from_slice(&self.userdata[0].to_be_bytes());
        out[29..33].copy_from_slice(&self.userdata[1].to_be_bytes());
        for (index, (offset, size, count)) in palettes.into_iter().enumerate() {
            let base = 33 + index * 8;
            out[base..base + 3].copy_from_slice(&offset.to_be_bytes()[1..]);
            out[base + 3..base + 6].copy_from_slice(&size.to_be_bytes()[1..]);
            out[base + 6..base + 8].copy_from_slice(&count.to_be_bytes());
        }
        out[65..67].copy_from_slice(&(tables.len() as u16).to_be_bytes());
        out[67..70].copy_from_slice(&(tables_offset as u32).to_be_bytes()[1..]);
        for (level, offset) in level_offsets.iter().enumerate() {
            let base = 70 + level * 4;
            out[base..base + 4].copy_from_slice(&offset.to_be_bytes());
        }

        let data_crc = crc16(0, &out[header_size..]);
        out[10..12].copy_from_slice(&data_crc.to_be_bytes());
        let header_crc = crc16(0, &out[6..header_size]);
        out[4..6].copy_from_slice(&header_crc.to_be_bytes());
        out
    }

    /// The blocks `level` should decode to, faces back to back at the tightest row pitch.
    pub fn expected_level(&self, level: u32) -> Vec<u8> {
        let layout = self.layout(level);
        let bytes_per_block = self.format.bytes_per_block() as usize;
        let row_pitch = layout.blocks_x * bytes_per_block;
        let face_size = row_pitch * layout.blocks_y;
        let mut out = vec![0u8; face_size * self.faces as usize];
        let Some(block_layout) = self.format.block_layout() else {
            return out;
        };

        let (faces, _) = self.walk_level(level);
        for (face, blocks) in faces.iter().enumerate() {
            for y in 0..layout.blocks_y {
                for x in 0..layout.blocks_x {
                    let start = face * face_size + y * row_pitch + x * bytes_per_block;
                    self.assemble_block(
                        block_layout,
                        &blocks[y * layout.width + x],
                        &mut out[start..start + bytes_per_block],
                    );
                }
            }
        }
        out
    }

    fn assemble_block(&self, layout: BlockLayout, block: &BlockIndices, out: &mut [u8]) {
        match layout {
            BlockLayout::Direct(slots) => {
                for (slot, channel) in slots.iter().enumerate() {
                    let half = &mut out[channel.byte_offset..channel.byte_offset + 8];
                    let endpoint = block.endpoints[slot] as usize;
                    let selector = block.selectors[slot] as usize;
                    match channel.channel {
                        Channel::Color => {
                            let packed = self.color_endpoints[endpoint];
                            let endpoints = if self.format.has_etc_color() {
                                etc1s_base_color(packed)
                            } else {
                                packed.to_le_bytes()
                            };
                            let linear = self.color_selectors[selector];
                            half[..4].copy_from_slice(&endpoints);
                            half[4..].copy_from_slice(&color_selector_bytes(self.format, linear, false));
                        }
                        Channel::Alpha => self.alpha_half(half, endpoint, selector, false),
                    }
                }
            }
            BlockLayout::Subblocks { alpha } => {
                // An unflipped block splits into left and right halves and reads its selectors
                // transposed.
                let flip = block.etc_mode & 2 == 0;
                let start = if alpha { 8 } else { 0 };
                let first = self.color_endpoints[block.endpoints[0] as usize];
                let second = self.color_endpoints[block.second_endpoint as usize];
                let linear = self.color_selectors[block.selectors[0] as usize];
                out[start..start + 4].copy_from_slice(&etc1_base_colors(first, second, flip));
                out[start + 4..start + 8]
                    .copy_from_slice(&color_selector_bytes(self.format, linear, !flip));
                if alpha {
                    let (endpoint, selector) = (block.endpoints[1], block.selectors[1]);
                    self.alpha_half(&mut out[..8], endpoint as usize, selector as usize, !flip);
                }
            }
        }
    }

    fn alpha_half(&self, out: &mut [u8], endpoint: usize, selector: usize, transposed: bool) {
        let linear = self.alpha_selectors[selector];
        out[..2].copy_from_slice(&self.alpha_endpoints[endpoint].to_le_bytes());
        out[2..].copy_from_slice(&alpha_selector_bytes(self.format, linear, transposed));
    }
}
