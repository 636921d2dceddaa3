//! 128 点逆 MDCT 与重叠相加.
//!
//! 每个子帧把 128 条频谱线变换为 256 点时域信号, 加正弦窗后与上一个
//! 子帧的尾部做 50% 重叠相加, 得到 128 个输出采样. 重叠缓冲区跨子帧、
//! 跨数据块持续存在, 循环展开的 seek 也不会重置它.

use super::tables::BINS_PER_SUBFRAME;

/// 逆 MDCT 的正交归一系数: √(2/128)
const IMDCT_SCALE: f64 = 0.125;

/// 对一个子帧做逆变换并与重叠缓冲区相加
///
/// `spectra` 是本子帧的 128 条频谱线, `overlap` 携带上一子帧的加窗尾部,
/// 结果写入 `out`, 同时用本子帧的尾部更新 `overlap`.
pub(crate) fn synthesize(
    spectra: &[f32; BINS_PER_SUBFRAME],
    window: &[f32; 256],
    overlap: &mut [f32; BINS_PER_SUBFRAME],
    out: &mut [f32; BINS_PER_SUBFRAME],
) {
    let mut time = [0.0f32; 2 * BINS_PER_SUBFRAME];

    // 全零子帧直接跳过变换, 只播空重叠尾部
    if spectra.iter().any(|&s| s != 0.0) {
        let n = BINS_PER_SUBFRAME as f64;
        let half = n / 2.0;
        for (i, slot) in time.iter_mut().enumerate() {
            let mut sum = 0.0f64;
            let n_plus_half = i as f64 + 0.5 + half;
            for (k, &coeff) in spectra.iter().enumerate() {
                if coeff == 0.0 {
                    continue;
                }
                let angle = std::f64::consts::PI / n * n_plus_half * (k as f64 + 0.5);
                sum += f64::from(coeff) * angle.cos();
            }
            *slot = (sum * IMDCT_SCALE) as f32;
        }
    }

    for i in 0..BINS_PER_SUBFRAME {
        out[i] = overlap[i] + window[i] * time[i];
    }
    for i in 0..BINS_PER_SUBFRAME {
        overlap[i] = window[BINS_PER_SUBFRAME + i] * time[BINS_PER_SUBFRAME + i];
    }
}
