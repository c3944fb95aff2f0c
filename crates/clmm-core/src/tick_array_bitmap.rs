//! # Tick Array Bitmap
//!
//! Sparse index of which tick arrays hold initialized ticks. Bit `o` is set
//! when the array starting at `o * 60 * tick_spacing` is initialized, for
//! array offsets `o` in `[-7680, 7680)`.
//!
//! The pool account carries the 1024 bits around zero (`[u64; 16]`) and the
//! extension carries 14 blocks of 512 bits on each side. Searches merge all
//! of it into 30 `U512` blocks laid out from the most negative offset up:
//!
//! ```text
//! block  0..14  negative extension, farthest block first
//! block 14      inner words 0..8   offsets [-512, 0)
//! block 15      inner words 8..16  offsets [0, 512)
//! block 16..30  positive extension, nearest block first
//! ```

use primitive_types::U512;

use crate::constants::{
    EXTENSION_BITMAP_BLOCKS, INNER_BITMAP_WORDS, MAX_TICK_ARRAY_OFFSET, MIN_TICK_ARRAY_OFFSET,
    TICKS_PER_ARRAY, TICK_ARRAY_BITMAP_SIZE, WORDS_PER_BLOCK,
};
use crate::errors::{ClmmCoreError, CoreResult};
use crate::tick_utils::{
    check_is_out_of_bounds, get_tick_array_bit_index, is_valid_tick_array_boundary, tick_array_size,
};

/// Blocks after merging both extensions around the inner bitmap
pub const MERGED_BLOCK_COUNT: usize = 2 * EXTENSION_BITMAP_BLOCKS + 2;

const BLOCK_BITS: usize = TICK_ARRAY_BITMAP_SIZE as usize;

/// Bitmap blocks for tick arrays beyond the inner 1024
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TickArrayBitmapExtension {
    /// Offsets [512, 7680), nearest block first
    pub positive_tick_array_bitmap: [[u64; WORDS_PER_BLOCK]; EXTENSION_BITMAP_BLOCKS],
    /// Offsets [-7680, -512), nearest block first
    pub negative_tick_array_bitmap: [[u64; WORDS_PER_BLOCK]; EXTENSION_BITMAP_BLOCKS],
}

/// Inner bitmap and extension together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub struct TickArrayBitmap {
    pub inner: [u64; INNER_BITMAP_WORDS],
    pub extension: TickArrayBitmapExtension,
}

fn block_from_words(words: &[u64]) -> U512 {
    let mut limbs = [0u64; WORDS_PER_BLOCK];
    limbs.copy_from_slice(words);
    U512(limbs)
}

/// Merge the inner bitmap and extension into 30 blocks ordered by offset
pub fn merge_bitmap_blocks(
    bitmap: &[u64; INNER_BITMAP_WORDS],
    extension: &TickArrayBitmapExtension,
) -> [U512; MERGED_BLOCK_COUNT] {
    let mut blocks = [U512::zero(); MERGED_BLOCK_COUNT];

    for (i, words) in extension.negative_tick_array_bitmap.iter().rev().enumerate() {
        blocks[i] = block_from_words(words);
    }
    blocks[EXTENSION_BITMAP_BLOCKS] = block_from_words(&bitmap[..WORDS_PER_BLOCK]);
    blocks[EXTENSION_BITMAP_BLOCKS + 1] = block_from_words(&bitmap[WORDS_PER_BLOCK..]);
    for (i, words) in extension.positive_tick_array_bitmap.iter().enumerate() {
        blocks[EXTENSION_BITMAP_BLOCKS + 2 + i] = block_from_words(words);
    }

    blocks
}

/// (block, bit) of an array offset in the merged layout
fn locate(offset: i32) -> (usize, usize) {
    let global = (offset - MIN_TICK_ARRAY_OFFSET) as usize;
    (global / BLOCK_BITS, global % BLOCK_BITS)
}

/// Start indices of up to `count` initialized arrays at or below `start_offset`, nearest first
pub fn search_low_bit_from_start(
    bitmap: &[u64; INNER_BITMAP_WORDS],
    extension: &TickArrayBitmapExtension,
    start_offset: i32,
    count: usize,
    tick_spacing: u16,
) -> Vec<i32> {
    let blocks = merge_bitmap_blocks(bitmap, extension);
    let array_size = TICKS_PER_ARRAY * tick_spacing as i32;
    let mut found = Vec::new();

    let mut offset = start_offset.min(MAX_TICK_ARRAY_OFFSET - 1);
    while offset >= MIN_TICK_ARRAY_OFFSET && found.len() < count {
        let (block, bit) = locate(offset);
        if blocks[block].is_zero() {
            // Skip the rest of an empty block
            offset -= bit as i32 + 1;
            continue;
        }
        if blocks[block].bit(bit) {
            found.push(offset * array_size);
        }
        offset -= 1;
    }

    found
}

/// Start indices of up to `count` initialized arrays at or above `start_offset`, nearest first
pub fn search_high_bit_from_start(
    bitmap: &[u64; INNER_BITMAP_WORDS],
    extension: &TickArrayBitmapExtension,
    start_offset: i32,
    count: usize,
    tick_spacing: u16,
) -> Vec<i32> {
    let blocks = merge_bitmap_blocks(bitmap, extension);
    let array_size = TICKS_PER_ARRAY * tick_spacing as i32;
    let mut found = Vec::new();

    let mut offset = start_offset.max(MIN_TICK_ARRAY_OFFSET);
    while offset < MAX_TICK_ARRAY_OFFSET && found.len() < count {
        let (block, bit) = locate(offset);
        if blocks[block].is_zero() {
            offset += (BLOCK_BITS - bit) as i32;
            continue;
        }
        if blocks[block].bit(bit) {
            found.push(offset * array_size);
        }
        offset += 1;
    }

    found
}

/// Initialized array start indices around `center_start_index`: up to
/// `count_each_side` below it (nearest first), then up to `count_each_side`
/// at or above it (nearest first)
pub fn get_initialized_tick_array_in_range(
    bitmap: &[u64; INNER_BITMAP_WORDS],
    extension: &TickArrayBitmapExtension,
    tick_spacing: u16,
    center_start_index: i32,
    count_each_side: usize,
) -> CoreResult<Vec<i32>> {
    let offset = get_tick_array_bit_index(center_start_index, tick_spacing)?;

    let mut result = search_low_bit_from_start(bitmap, extension, offset - 1, count_each_side, tick_spacing);
    result.extend(search_high_bit_from_start(
        bitmap,
        extension,
        offset,
        count_each_side,
        tick_spacing,
    ));
    Ok(result)
}

impl TickArrayBitmap {
    pub fn new(inner: [u64; INNER_BITMAP_WORDS], extension: TickArrayBitmapExtension) -> Self {
        Self { inner, extension }
    }

    pub fn merged_blocks(&self) -> [U512; MERGED_BLOCK_COUNT] {
        merge_bitmap_blocks(&self.inner, &self.extension)
    }

    /// Array offset for a start index, rejecting misaligned or untrackable indices
    fn checked_offset(start_index: i32, tick_spacing: u16) -> CoreResult<i32> {
        tick_array_size(tick_spacing)?;
        if !is_valid_tick_array_boundary(start_index, tick_spacing) {
            return Err(ClmmCoreError::InvalidTickArray(start_index));
        }
        if check_is_out_of_bounds(start_index, tick_spacing) {
            return Err(ClmmCoreError::TickOutOfRange);
        }
        get_tick_array_bit_index(start_index, tick_spacing)
    }

    /// Storage word and bit holding an array offset
    fn word_mut(&mut self, offset: i32) -> (&mut u64, usize) {
        let (block, bit) = locate(offset);
        let word = bit / 64;
        let bit_in_word = bit % 64;

        let target = if block < EXTENSION_BITMAP_BLOCKS {
            &mut self.extension.negative_tick_array_bitmap[EXTENSION_BITMAP_BLOCKS - 1 - block][word]
        } else if block < EXTENSION_BITMAP_BLOCKS + 2 {
            &mut self.inner[(block - EXTENSION_BITMAP_BLOCKS) * WORDS_PER_BLOCK + word]
        } else {
            &mut self.extension.positive_tick_array_bitmap[block - EXTENSION_BITMAP_BLOCKS - 2][word]
        };
        (target, bit_in_word)
    }

    pub fn is_initialized(&self, start_index: i32, tick_spacing: u16) -> CoreResult<bool> {
        let offset = Self::checked_offset(start_index, tick_spacing)?;
        let (block, bit) = locate(offset);
        Ok(self.merged_blocks()[block].bit(bit))
    }

    /// Toggle the bit for the array at `start_index`
    pub fn flip_bit(&mut self, start_index: i32, tick_spacing: u16) -> CoreResult<()> {
        let offset = Self::checked_offset(start_index, tick_spacing)?;
        let (word, bit) = self.word_mut(offset);
        *word ^= 1u64 << bit;
        Ok(())
    }

    /// Nearest initialized array strictly past `last_start_index` in the swap direction
    pub fn next_initialized_tick_array_start_index(
        &self,
        last_start_index: i32,
        tick_spacing: u16,
        zero_for_one: bool,
    ) -> CoreResult<Option<i32>> {
        let offset = get_tick_array_bit_index(last_start_index, tick_spacing)?;
        let found = if zero_for_one {
            search_low_bit_from_start(&self.inner, &self.extension, offset - 1, 1, tick_spacing)
        } else {
            search_high_bit_from_start(&self.inner, &self.extension, offset + 1, 1, tick_spacing)
        };
        Ok(found.first().copied())
    }

    /// Ticks on either side of zero covered by the inner bitmap alone
    pub fn max_tick_in_bitmap(tick_spacing: u16) -> CoreResult<i32> {
        Ok(TICK_ARRAY_BITMAP_SIZE * tick_array_size(tick_spacing)?)
    }

    pub fn initialized_start_indices(&self, tick_spacing: u16) -> Vec<i32> {
        search_high_bit_from_start(
            &self.inner,
            &self.extension,
            MIN_TICK_ARRAY_OFFSET,
            usize::MAX,
            tick_spacing,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap_with(starts: &[i32], tick_spacing: u16) -> TickArrayBitmap {
        let mut bitmap = TickArrayBitmap::default();
        for start in starts {
            bitmap.flip_bit(*start, tick_spacing).unwrap();
        }
        bitmap
    }

    #[test]
    fn test_storage_layout() {
        // offset 0 is bit 0 of inner word 8
        let bitmap = bitmap_with(&[0], 1);
        assert_eq!(bitmap.inner[8], 1);

        // offset -1 is the top bit of inner word 7
        let bitmap = bitmap_with(&[-60], 1);
        assert_eq!(bitmap.inner[7], 1 << 63);

        // offset 512 is bit 0 of the first positive block
        let bitmap = bitmap_with(&[512 * 60], 1);
        assert_eq!(bitmap.extension.positive_tick_array_bitmap[0][0], 1);

        // offset -513 is the top bit of the first negative block
        let bitmap = bitmap_with(&[-513 * 60], 1);
        assert_eq!(bitmap.extension.negative_tick_array_bitmap[0][7], 1 << 63);

        // offset -7680 is bit 0 of the farthest negative block
        let bitmap = bitmap_with(&[-7680 * 60], 1);
        assert_eq!(bitmap.extension.negative_tick_array_bitmap[13][0], 1);
    }

    #[test]
    fn test_flip_bit_errors() {
        let mut bitmap = TickArrayBitmap::default();
        assert_eq!(bitmap.flip_bit(7680 * 60, 1), Err(ClmmCoreError::TickOutOfRange));
        assert_eq!(bitmap.flip_bit(-7681 * 60, 1), Err(ClmmCoreError::TickOutOfRange));
        assert_eq!(bitmap.flip_bit(30, 1), Err(ClmmCoreError::InvalidTickArray(30)));
        assert_eq!(bitmap.flip_bit(0, 0), Err(ClmmCoreError::InvalidTickSpacing));

        bitmap.flip_bit(600, 10).unwrap();
        assert!(bitmap.is_initialized(600, 10).unwrap());
        bitmap.flip_bit(600, 10).unwrap();
        assert!(!bitmap.is_initialized(600, 10).unwrap());
    }

    #[test]
    fn test_empty_bitmap() {
        let bitmap = TickArrayBitmap::default();
        assert!(search_low_bit_from_start(&bitmap.inner, &bitmap.extension, 0, 5, 1).is_empty());
        assert!(search_high_bit_from_start(&bitmap.inner, &bitmap.extension, 0, 5, 1).is_empty());
        assert!(get_initialized_tick_array_in_range(&bitmap.inner, &bitmap.extension, 1, 0, 5)
            .unwrap()
            .is_empty());
        assert_eq!(bitmap.next_initialized_tick_array_start_index(0, 1, true).unwrap(), None);
    }

    #[test]
    fn test_search_order_and_count() {
        let spacing = 10;
        let starts = [-1_200, -600, 0, 600, 6_000];
        let bitmap = bitmap_with(&starts, spacing);

        let low = search_low_bit_from_start(&bitmap.inner, &bitmap.extension, 0, 2, spacing);
        assert_eq!(low, vec![0, -600]);

        let high = search_high_bit_from_start(&bitmap.inner, &bitmap.extension, 1, 10, spacing);
        assert_eq!(high, vec![600, 6_000]);

        let range = get_initialized_tick_array_in_range(&bitmap.inner, &bitmap.extension, spacing, 0, 2).unwrap();
        assert_eq!(range, vec![-600, -1_200, 0, 600]);
    }

    #[test]
    fn test_search_crosses_into_extension() {
        let spacing = 1;
        let far_positive = 7_000 * 60;
        let far_negative = -7_000 * 60;
        let bitmap = bitmap_with(&[far_negative, far_positive], spacing);

        assert_eq!(
            bitmap.next_initialized_tick_array_start_index(0, spacing, false).unwrap(),
            Some(far_positive)
        );
        assert_eq!(
            bitmap.next_initialized_tick_array_start_index(0, spacing, true).unwrap(),
            Some(far_negative)
        );
        assert_eq!(bitmap.initialized_start_indices(spacing), vec![far_negative, far_positive]);
    }

    #[test]
    fn test_next_start_index_is_strict() {
        let bitmap = bitmap_with(&[-60, 0, 60], 1);
        assert_eq!(bitmap.next_initialized_tick_array_start_index(0, 1, true).unwrap(), Some(-60));
        assert_eq!(bitmap.next_initialized_tick_array_start_index(0, 1, false).unwrap(), Some(60));
        assert_eq!(bitmap.next_initialized_tick_array_start_index(-60, 1, true).unwrap(), None);
    }

    #[test]
    fn test_max_tick_in_bitmap() {
        assert_eq!(TickArrayBitmap::max_tick_in_bitmap(1).unwrap(), 30_720);
        assert_eq!(TickArrayBitmap::max_tick_in_bitmap(10).unwrap(), 307_200);
    }
}
