//! 逐声道频谱解码.
//!
//! 每个数据块的码流布局: 16 位同步字、9+7 位噪声等级, 之后按声道顺序
//! 是各自的包络 (比例因子 + 强度索引/高频比例因子), 再接 8 个子帧的
//! 量化频谱. 解码顺序固定:
//! 包络 → (逐子帧) 频谱解包 → 高频重建 → 强度立体声 → IMDCT.

use koe_core::FrameBitReader;

use super::header::StreamInfo;
use super::imdct;
use super::tables::{
    self, DecodeTables, BINS_PER_SUBFRAME, MAX_BITS, READ_BITS, READ_VALUES, SCALE_CLASS,
    SUBFRAMES_PER_BLOCK,
};

/// 声道在强度立体声配对中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelKind {
    /// 独立声道
    Discrete,
    /// 配对中的主声道 (携带两侧频谱)
    StereoPrimary,
    /// 配对中的次声道 (携带强度索引)
    StereoSecondary,
}

/// 单个声道的解码状态
///
/// 除 `imdct_overlap` 外都是逐块覆盖的暂存; 重叠缓冲区跨块持续存在.
struct ChannelState {
    kind: ChannelKind,
    /// 本声道实际编码的频带数
    coded_bands: usize,
    /// 比例因子 (高频组的比例因子紧随其后存放)
    scalefactors: [u8; BINS_PER_SUBFRAME],
    /// 各频带的分辨率类别
    resolution: [u8; BINS_PER_SUBFRAME],
    /// 反量化增益
    gain: [f32; BINS_PER_SUBFRAME],
    /// 各子帧的强度索引 (次声道)
    intensity: [u8; SUBFRAMES_PER_BLOCK],
    /// 当前子帧的频谱
    spectra: [f32; BINS_PER_SUBFRAME],
    /// IMDCT 重叠缓冲区
    imdct_overlap: [f32; BINS_PER_SUBFRAME],
    /// 各子帧的时域输出
    pcm: [[f32; BINS_PER_SUBFRAME]; SUBFRAMES_PER_BLOCK],
}

impl ChannelState {
    fn new(kind: ChannelKind, coded_bands: usize) -> Self {
        Self {
            kind,
            coded_bands,
            scalefactors: [0; BINS_PER_SUBFRAME],
            resolution: [0; BINS_PER_SUBFRAME],
            gain: [0.0; BINS_PER_SUBFRAME],
            intensity: [0; SUBFRAMES_PER_BLOCK],
            spectra: [0.0; BINS_PER_SUBFRAME],
            imdct_overlap: [0.0; BINS_PER_SUBFRAME],
            pcm: [[0.0; BINS_PER_SUBFRAME]; SUBFRAMES_PER_BLOCK],
        }
    }

    /// 读取本块的声道包络: 比例因子、强度索引/高频比例因子、
    /// 分辨率分类与反量化增益
    fn unpack_envelope(
        &mut self,
        br: &mut FrameBitReader<'_>,
        packed_noise: i32,
        ath: &[u8; BINS_PER_SUBFRAME],
        hfr_groups: usize,
        t: &DecodeTables,
    ) {
        let count = self.coded_bands;

        // 比例因子: 3 位模式字, 0 = 全零, 1..5 = 差分, >=6 = 原始 6 位
        let mode = br.get(3);
        if mode >= 6 {
            for sf in self.scalefactors.iter_mut().take(count) {
                *sf = br.get(6) as u8;
            }
        } else if mode != 0 {
            let escape = (1u32 << mode) - 1;
            let half = (escape >> 1) as i32;
            let mut value = br.get(6) as i32;
            self.scalefactors[0] = value as u8;
            for sf in self.scalefactors.iter_mut().take(count).skip(1) {
                let delta = br.get(mode);
                if delta == escape {
                    value = br.get(6) as i32;
                } else {
                    value = (value + delta as i32 - half).clamp(0, 63);
                }
                *sf = value as u8;
            }
        } else {
            self.scalefactors = [0; BINS_PER_SUBFRAME];
        }

        // 次声道读 8 个强度索引; 其余声道读高频组比例因子
        if self.kind == ChannelKind::StereoSecondary {
            let head = br.peek(4) as u8;
            self.intensity[0] = head;
            if head < 15 {
                for slot in self.intensity.iter_mut() {
                    *slot = br.get(4) as u8;
                }
            }
        } else {
            for i in 0..hfr_groups {
                self.scalefactors[count + i] = br.get(6) as u8;
            }
        }

        // 分辨率分类: 听阈 + 噪声等级与比例因子的差决定量化精度
        for i in 0..count {
            let sf = i32::from(self.scalefactors[i]);
            let resolution = if sf == 0 {
                0
            } else {
                let index = i32::from(ath[i]) + ((packed_noise + i as i32) >> 8) - ((sf * 5) >> 1) + 1;
                if index < 0 {
                    15
                } else if index >= 0x39 {
                    1
                } else {
                    i32::from(SCALE_CLASS[index as usize])
                }
            };
            self.resolution[i] = resolution as u8;
        }
        for slot in self.resolution.iter_mut().skip(count) {
            *slot = 0;
        }

        for i in 0..count {
            self.gain[i] = t.dequant_scale[self.scalefactors[i] as usize]
                * t.resolution_step[self.resolution[i] as usize];
        }
    }

    /// 解包一个子帧的量化频谱并反量化
    fn unpack_spectra(&mut self, br: &mut FrameBitReader<'_>) {
        for i in 0..self.coded_bands {
            let resolution = self.resolution[i] as usize;
            let max_bits = u32::from(MAX_BITS[resolution]);
            let value = if resolution < 8 {
                // 小分辨率走前缀码: 预读最大位数, 查表取值并消耗实际位数
                let code = (resolution << 4) | br.peek(max_bits) as usize;
                br.advance(u32::from(READ_BITS[code]));
                f32::from(READ_VALUES[code])
            } else {
                // 线性码: 符号在最低位, 零值少占一位
                let raw = br.peek(max_bits);
                let magnitude = (raw >> 1) as i32;
                let signed = if raw & 1 != 0 { -magnitude } else { magnitude };
                br.advance(if signed == 0 { max_bits - 1 } else { max_bits });
                signed as f32
            };
            self.spectra[i] = self.gain[i] * value;
        }
        for slot in self.spectra.iter_mut().skip(self.coded_bands) {
            *slot = 0.0;
        }
    }

    /// 高频重建: 编码频带之上的频谱由低频镜像乘增益差还原
    fn reconstruct_high_band(
        &mut self,
        hfr_groups: usize,
        bands_per_group: usize,
        coded_limit: usize,
        total_bands: usize,
        t: &DecodeTables,
    ) {
        if self.kind == ChannelKind::StereoSecondary || bands_per_group == 0 {
            return;
        }

        let mut k = coded_limit;
        let mut l = coded_limit as isize - 1;
        for group in 0..hfr_groups {
            let hf_sf = self.scalefactors[coded_limit + group];
            for _ in 0..bands_per_group {
                if k >= total_bands || l < 0 {
                    break;
                }
                let src_sf = self.scalefactors[l as usize];
                let conv = (64 + i32::from(hf_sf) - i32::from(src_sf)).clamp(0, 127) as usize;
                self.spectra[k] = t.scale_conv[conv] * self.spectra[l as usize];
                k += 1;
                l -= 1;
            }
        }
        self.spectra[BINS_PER_SUBFRAME - 1] = 0.0;
    }

    /// IMDCT 合成本子帧的时域输出
    fn synthesize(&mut self, subframe: usize, t: &DecodeTables) {
        imdct::synthesize(
            &self.spectra,
            &t.window,
            &mut self.imdct_overlap,
            &mut self.pcm[subframe],
        );
    }
}

/// 强度立体声展开: 次声道频谱由主声道频谱按强度索引重建
fn apply_intensity(
    primary: &mut ChannelState,
    secondary: &mut ChannelState,
    subframe: usize,
    base_bands: usize,
    total_bands: usize,
    t: &DecodeTables,
) {
    let ratio = t.intensity_ratio[secondary.intensity[subframe] as usize];
    let mirror = ratio - 2.0;
    for i in base_bands..total_bands {
        secondary.spectra[i] = primary.spectra[i] * mirror;
        primary.spectra[i] *= ratio;
    }
}

/// 全声道解码器
///
/// 持有每个声道的状态与频带划分参数, 逐块驱动解码管线.
pub(crate) struct ChannelDecoder {
    channels: Vec<ChannelState>,
    total_band_count: usize,
    base_band_count: usize,
    stereo_band_count: usize,
    bands_per_hfr_group: usize,
    hfr_group_count: usize,
}

impl ChannelDecoder {
    /// 按头部参数构建声道状态
    ///
    /// 声道分组内的配对布局取决于组内声道数与声道配置,
    /// 覆盖双声道到 7.1 的常见布局.
    pub(crate) fn new(info: &StreamInfo) -> Self {
        let channel_count = info.channel_count as usize;
        let mut kinds = [ChannelKind::Discrete; 16];

        let per_track = channel_count / info.track_count as usize;
        if info.stereo_band_count > 0 && per_track > 1 {
            use ChannelKind::{StereoPrimary as P, StereoSecondary as S};
            for track in 0..info.track_count as usize {
                let group = &mut kinds[track * per_track..];
                match per_track {
                    2 | 3 => {
                        group[0] = P;
                        group[1] = S;
                    }
                    4 => {
                        group[0] = P;
                        group[1] = S;
                        if info.channel_config == 0 {
                            group[2] = P;
                            group[3] = S;
                        }
                    }
                    5 => {
                        group[0] = P;
                        group[1] = S;
                        if info.channel_config <= 2 {
                            group[3] = P;
                            group[4] = S;
                        }
                    }
                    6 | 7 => {
                        group[0] = P;
                        group[1] = S;
                        group[4] = P;
                        group[5] = S;
                    }
                    8 => {
                        group[0] = P;
                        group[1] = S;
                        group[4] = P;
                        group[5] = S;
                        group[6] = P;
                        group[7] = S;
                    }
                    _ => {}
                }
            }
        }

        let base = info.base_band_count as usize;
        let stereo = info.stereo_band_count as usize;
        let channels = (0..channel_count)
            .map(|i| {
                let coded = if kinds[i] == ChannelKind::StereoSecondary {
                    base
                } else {
                    base + stereo
                };
                ChannelState::new(kinds[i], coded)
            })
            .collect();

        Self {
            channels,
            total_band_count: info.total_band_count as usize,
            base_band_count: base,
            stereo_band_count: stereo,
            bands_per_hfr_group: info.bands_per_hfr_group as usize,
            hfr_group_count: info.hfr_group_count as usize,
        }
    }

    /// 声道数
    pub(crate) fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 解码一个数据块的码流 (同步字之后的部分)
    pub(crate) fn decode_block(&mut self, br: &mut FrameBitReader<'_>, ath: &[u8; BINS_PER_SUBFRAME]) {
        let t = tables::get();

        let packed_noise = ((br.get(9) << 8) as i32) - br.get(7) as i32;
        for ch in &mut self.channels {
            ch.unpack_envelope(br, packed_noise, ath, self.hfr_group_count, t);
        }

        let coded_limit = self.base_band_count + self.stereo_band_count;
        for subframe in 0..SUBFRAMES_PER_BLOCK {
            for ch in &mut self.channels {
                ch.unpack_spectra(br);
            }
            for ch in &mut self.channels {
                ch.reconstruct_high_band(
                    self.hfr_group_count,
                    self.bands_per_hfr_group,
                    coded_limit,
                    self.total_band_count,
                    t,
                );
            }
            if self.stereo_band_count > 0 {
                for i in 0..self.channels.len().saturating_sub(1) {
                    if self.channels[i].kind == ChannelKind::StereoPrimary {
                        let (head, tail) = self.channels.split_at_mut(i + 1);
                        apply_intensity(
                            &mut head[i],
                            &mut tail[0],
                            subframe,
                            self.base_band_count,
                            self.total_band_count,
                            t,
                        );
                    }
                }
            }
            for ch in &mut self.channels {
                ch.synthesize(subframe, t);
            }
        }
    }

    /// 把本块的时域输出按声道交错写入 `out` (长度 1024 × 声道数)
    pub(crate) fn serialize(&self, volume: f32, out: &mut [f32]) {
        let mut idx = 0;
        for subframe in 0..SUBFRAMES_PER_BLOCK {
            for sample in 0..BINS_PER_SUBFRAME {
                for ch in &self.channels {
                    out[idx] = ch.pcm[subframe][sample] * volume;
                    idx += 1;
                }
            }
        }
    }
}
