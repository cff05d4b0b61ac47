//! Immutable lookup tables: oscillator wavetables, the exponential response
//! curve used by log mode, and the LED brightness curve.
//!
//! Every wavetable holds one cycle in [`TABLE_LEN`] samples plus one guard
//! sample so that interpolation at the last index never reads past the end.

/// Samples per wavetable cycle (9 bits of phase).
pub const TABLE_BITS: u32 = 9;

/// Samples per cycle.
pub const TABLE_LEN: usize = 1 << TABLE_BITS;

/// Stored table length including the guard sample.
pub const TABLE_SIZE: usize = TABLE_LEN + 1;

/// Peak amplitude of every waveform.
pub const FULL_SCALE: i32 = 32767;

/// Number of table-backed waveforms (sine, triangle). Saw and square are
/// computed from the phase.
pub const WAVETABLE_COUNT: usize = 2;

/// One cycle of sine starting at zero phase.
pub static SINE_TABLE: [i16; TABLE_SIZE] = [
    0, 402, 804, 1206, 1608, 2009, 2410, 2811, 3212, 3612,
    4011, 4410, 4808, 5205, 5602, 5998, 6393, 6786, 7179, 7571,
    7962, 8351, 8739, 9126, 9512, 9896, 10278, 10659, 11039, 11417,
    11793, 12167, 12539, 12910, 13279, 13645, 14010, 14372, 14732, 15090,
    15446, 15800, 16151, 16499, 16846, 17189, 17530, 17869, 18204, 18537,
    18868, 19195, 19519, 19841, 20159, 20475, 20787, 21096, 21403, 21705,
    22005, 22301, 22594, 22884, 23170, 23452, 23731, 24007, 24279, 24547,
    24811, 25072, 25329, 25582, 25832, 26077, 26319, 26556, 26790, 27019,
    27245, 27466, 27683, 27896, 28105, 28310, 28510, 28706, 28898, 29085,
    29268, 29447, 29621, 29791, 29956, 30117, 30273, 30424, 30571, 30714,
    30852, 30985, 31113, 31237, 31356, 31470, 31580, 31685, 31785, 31880,
    31971, 32057, 32137, 32213, 32285, 32351, 32412, 32469, 32521, 32567,
    32609, 32646, 32678, 32705, 32728, 32745, 32757, 32765, 32767, 32765,
    32757, 32745, 32728, 32705, 32678, 32646, 32609, 32567, 32521, 32469,
    32412, 32351, 32285, 32213, 32137, 32057, 31971, 31880, 31785, 31685,
    31580, 31470, 31356, 31237, 31113, 30985, 30852, 30714, 30571, 30424,
    30273, 30117, 29956, 29791, 29621, 29447, 29268, 29085, 28898, 28706,
    28510, 28310, 28105, 27896, 27683, 27466, 27245, 27019, 26790, 26556,
    26319, 26077, 25832, 25582, 25329, 25072, 24811, 24547, 24279, 24007,
    23731, 23452, 23170, 22884, 22594, 22301, 22005, 21705, 21403, 21096,
    20787, 20475, 20159, 19841, 19519, 19195, 18868, 18537, 18204, 17869,
    17530, 17189, 16846, 16499, 16151, 15800, 15446, 15090, 14732, 14372,
    14010, 13645, 13279, 12910, 12539, 12167, 11793, 11417, 11039, 10659,
    10278, 9896, 9512, 9126, 8739, 8351, 7962, 7571, 7179, 6786,
    6393, 5998, 5602, 5205, 4808, 4410, 4011, 3612, 3212, 2811,
    2410, 2009, 1608, 1206, 804, 402, 0, -402, -804, -1206,
    -1608, -2009, -2410, -2811, -3212, -3612, -4011, -4410, -4808, -5205,
    -5602, -5998, -6393, -6786, -7179, -7571, -7962, -8351, -8739, -9126,
    -9512, -9896, -10278, -10659, -11039, -11417, -11793, -12167, -12539, -12910,
    -13279, -13645, -14010, -14372, -14732, -15090, -15446, -15800, -16151, -16499,
    -16846, -17189, -17530, -17869, -18204, -18537, -18868, -19195, -19519, -19841,
    -20159, -20475, -20787, -21096, -21403, -21705, -22005, -22301, -22594, -22884,
    -23170, -23452, -23731, -24007, -24279, -24547, -24811, -25072, -25329, -25582,
    -25832, -26077, -26319, -26556, -26790, -27019, -27245, -27466, -27683, -27896,
    -28105, -28310, -28510, -28706, -28898, -29085, -29268, -29447, -29621, -29791,
    -29956, -30117, -30273, -30424, -30571, -30714, -30852, -30985, -31113, -31237,
    -31356, -31470, -31580, -31685, -31785, -31880, -31971, -32057, -32137, -32213,
    -32285, -32351, -32412, -32469, -32521, -32567, -32609, -32646, -32678, -32705,
    -32728, -32745, -32757, -32765, -32767, -32765, -32757, -32745, -32728, -32705,
    -32678, -32646, -32609, -32567, -32521, -32469, -32412, -32351, -32285, -32213,
    -32137, -32057, -31971, -31880, -31785, -31685, -31580, -31470, -31356, -31237,
    -31113, -30985, -30852, -30714, -30571, -30424, -30273, -30117, -29956, -29791,
    -29621, -29447, -29268, -29085, -28898, -28706, -28510, -28310, -28105, -27896,
    -27683, -27466, -27245, -27019, -26790, -26556, -26319, -26077, -25832, -25582,
    -25329, -25072, -24811, -24547, -24279, -24007, -23731, -23452, -23170, -22884,
    -22594, -22301, -22005, -21705, -21403, -21096, -20787, -20475, -20159, -19841,
    -19519, -19195, -18868, -18537, -18204, -17869, -17530, -17189, -16846, -16499,
    -16151, -15800, -15446, -15090, -14732, -14372, -14010, -13645, -13279, -12910,
    -12539, -12167, -11793, -11417, -11039, -10659, -10278, -9896, -9512, -9126,
    -8739, -8351, -7962, -7571, -7179, -6786, -6393, -5998, -5602, -5205,
    -4808, -4410, -4011, -3612, -3212, -2811, -2410, -2009, -1608, -1206,
    -804, -402, 0,];

/// Triangle rising from the trough at zero phase to the crest at half phase.
pub static TRIANGLE_TABLE: [i16; TABLE_SIZE] = build_triangle();

/// Table-backed waveforms in waveform-index order.
pub static WAVETABLES: [&[i16; TABLE_SIZE]; WAVETABLE_COUNT] =
    [&SINE_TABLE, &TRIANGLE_TABLE];

const HALF: i32 = (TABLE_LEN / 2) as i32;
const SPAN: i32 = 2 * FULL_SCALE;

const fn build_triangle() -> [i16; TABLE_SIZE] {
    let mut table = [0i16; TABLE_SIZE];
    let mut i = 0;
    while i < TABLE_SIZE {
        let n = i as i32;
        let v = if n < HALF {
            -FULL_SCALE + n * SPAN / HALF
        } else {
            FULL_SCALE - (n - HALF) * SPAN / HALF
        };
        table[i] = v as i16;
        i += 1;
    }
    table
}

/// Bits of a 15-bit magnitude dropped to index [`EXP_TABLE`].
pub const EXP_INDEX_SHIFT: u32 = 7;

/// Exponential response `(e^(4x) - 1) / (e^4 - 1)` over 0..=32767, 256 segments.
pub static EXP_TABLE: [u16; 257] = [
    0, 10, 19, 29, 39, 50, 60, 71, 81, 92, 103, 115,
    126, 138, 149, 161, 174, 186, 199, 211, 224, 237, 251, 264,
    278, 292, 306, 321, 336, 350, 366, 381, 397, 412, 429, 445,
    462, 478, 496, 513, 531, 549, 567, 586, 604, 624, 643, 663,
    683, 703, 724, 745, 766, 788, 810, 832, 855, 878, 902, 926,
    950, 974, 999, 1025, 1050, 1077, 1103, 1130, 1158, 1185, 1214, 1243,
    1272, 1301, 1332, 1362, 1393, 1425, 1457, 1489, 1522, 1556, 1590, 1625,
    1660, 1696, 1732, 1769, 1807, 1845, 1883, 1923, 1963, 2003, 2044, 2086,
    2129, 2172, 2215, 2260, 2305, 2351, 2398, 2445, 2493, 2542, 2592, 2642,
    2694, 2746, 2798, 2852, 2907, 2962, 3018, 3076, 3134, 3193, 3252, 3313,
    3375, 3438, 3502, 3566, 3632, 3699, 3767, 3836, 3906, 3977, 4049, 4123,
    4197, 4273, 4350, 4428, 4507, 4588, 4670, 4753, 4838, 4923, 5010, 5099,
    5189, 5280, 5373, 5467, 5563, 5660, 5759, 5859, 5961, 6065, 6170, 6277,
    6385, 6495, 6607, 6721, 6836, 6954, 7073, 7194, 7317, 7442, 7568, 7697,
    7828, 7961, 8096, 8233, 8372, 8514, 8657, 8803, 8952, 9102, 9255, 9411,
    9568, 9729, 9892, 10057, 10225, 10396, 10569, 10745, 10924, 11106, 11290, 11477,
    11668, 11861, 12058, 12257, 12460, 12666, 12875, 13087, 13303, 13522, 13745, 13971,
    14200, 14433, 14670, 14911, 15155, 15404, 15656, 15912, 16172, 16437, 16705, 16978,
    17255, 17536, 17822, 18112, 18407, 18707, 19011, 19320, 19634, 19952, 20276, 20605,
    20939, 21279, 21623, 21974, 22329, 22690, 23057, 23430, 23809, 24193, 24584, 24981,
    25384, 25793, 26209, 26631, 27060, 27496, 27939, 28388, 28845, 29309, 29780, 30259,
    30745, 31238, 31740, 32250, 32767,];

/// Perceptual (gamma 2.2) LED brightness for a linear 8-bit level.
pub static LED_CURVE: [u8; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2,
    3, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 6, 6, 6,
    6, 7, 7, 7, 8, 8, 8, 9, 9, 9, 10, 10, 11, 11, 11, 12,
    12, 13, 13, 13, 14, 14, 15, 15, 16, 16, 17, 17, 18, 18, 19, 19,
    20, 20, 21, 22, 22, 23, 23, 24, 25, 25, 26, 26, 27, 28, 28, 29,
    30, 30, 31, 32, 33, 33, 34, 35, 35, 36, 37, 38, 39, 39, 40, 41,
    42, 43, 43, 44, 45, 46, 47, 48, 49, 49, 50, 51, 52, 53, 54, 55,
    56, 57, 58, 59, 60, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70, 71,
    73, 74, 75, 76, 77, 78, 79, 81, 82, 83, 84, 85, 87, 88, 89, 90,
    91, 93, 94, 95, 97, 98, 99, 100, 102, 103, 105, 106, 107, 109, 110, 111,
    113, 114, 116, 117, 119, 120, 121, 123, 124, 126, 127, 129, 130, 132, 133, 135,
    137, 138, 140, 141, 143, 145, 146, 148, 149, 151, 153, 154, 156, 158, 159, 161,
    163, 165, 166, 168, 170, 172, 173, 175, 177, 179, 181, 182, 184, 186, 188, 190,
    192, 194, 196, 197, 199, 201, 203, 205, 207, 209, 211, 213, 215, 217, 219, 221,
    223, 225, 227, 229, 231, 234, 236, 238, 240, 242, 244, 246, 248, 251, 253, 255,];

/// Map a 0..=32768 magnitude through [`EXP_TABLE`] with linear interpolation.
#[inline]
pub fn exp_lookup(magnitude: u16) -> u16 {
    let index = (magnitude >> EXP_INDEX_SHIFT) as usize;
    if index >= EXP_TABLE.len() - 1 {
        return EXP_TABLE[EXP_TABLE.len() - 1];
    }
    let frac = (magnitude & ((1 << EXP_INDEX_SHIFT) - 1)) as i32;
    let a = EXP_TABLE[index] as i32;
    let b = EXP_TABLE[index + 1] as i32;
    (a + (((b - a) * frac) >> EXP_INDEX_SHIFT)) as u16
}

/// Perceptual brightness for a 0..=32767 magnitude.
#[inline]
pub fn led_brightness(magnitude: u16) -> u8 {
    let index = (magnitude >> 7) as usize;
    LED_CURVE[if index > 255 { 255 } else { index }]
}
