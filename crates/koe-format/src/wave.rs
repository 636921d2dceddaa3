//! RIFF/WAVE 封装.
//!
//! 将解码输出写成标准 WAV 文件. 与回填式封装器不同, HCA 头部已经给出
//! 总块数和循环信息, 所有大小字段都可以在写入前算出, 因此这里一次性
//! 写出完整头部, 之后只需按块追加 PCM 数据.
//!
//! 块顺序: `RIFF`/`WAVE` + `fmt ` + 可选 `smpl` + 可选 `note` + `data`.

use log::debug;

use koe_core::KoeResult;

use crate::io::IoContext;

/// `smpl` 块携带的循环点信息
#[derive(Debug, Clone, Copy)]
pub struct SampleLoop {
    /// 循环起点 (采样索引)
    pub start_sample: u32,
    /// 循环终点 (采样索引)
    pub end_sample: u32,
    /// 播放次数, 0 表示无限循环
    pub play_count: u32,
}

/// WAVE 头部描述
///
/// 字段齐备后调用 [`write`](Self::write) 写出全部头部字节.
#[derive(Debug, Clone)]
pub struct WaveHeader {
    /// 格式码: 1 = 整数 PCM, 3 = IEEE 浮点
    pub format_code: u16,
    /// 位深
    pub bit_count: u16,
    /// 声道数
    pub channel_count: u16,
    /// 采样率 (Hz)
    pub sampling_rate: u32,
    /// 每声道总采样数 (循环展开后)
    pub total_samples: u32,
    /// 可选循环信息 (`smpl` 块)
    pub sample_loop: Option<SampleLoop>,
    /// 可选备注 (`note` 块)
    pub note: Option<String>,
}

/// `smpl` 块体固定 0x3C 字节 (15 个 u32)
const SMPL_BODY_SIZE: u32 = 0x3C;

impl WaveHeader {
    /// 每组采样帧的字节数 (所有声道)
    pub fn block_align(&self) -> u16 {
        self.bit_count / 8 * self.channel_count
    }

    /// `data` 块的 PCM 载荷字节数
    pub fn data_size(&self) -> u32 {
        (u64::from(self.total_samples) * u64::from(self.block_align())) as u32
    }

    /// `note` 块体字节数 (含 dwName 与零终止, 4 字节对齐)
    fn note_size(&self) -> u32 {
        match &self.note {
            Some(comm) => {
                let mut size = 4 + comm.len() as u32 + 1;
                if size & 3 != 0 {
                    size += 4 - (size & 3);
                }
                size
            }
            None => 0,
        }
    }

    /// `RIFF` 大小字段: 自身之后的全部字节数
    pub fn riff_size(&self) -> u32 {
        let mut size = 0x24 + self.data_size();
        if self.sample_loop.is_some() {
            size += 8 + SMPL_BODY_SIZE;
        }
        if self.note.is_some() {
            size += 8 + self.note_size();
        }
        size
    }

    /// 头部总字节数 (`data` 载荷之前的全部内容)
    pub fn header_size(&self) -> u32 {
        8 + self.riff_size() - self.data_size()
    }

    /// 写出完整的 WAVE 头部
    pub fn write(&self, io: &mut IoContext) -> KoeResult<()> {
        let block_align = self.block_align();
        let byte_rate = self.sampling_rate * u32::from(block_align);

        // RIFF header
        io.write_tag(b"RIFF")?;
        io.write_u32_le(self.riff_size())?;
        io.write_tag(b"WAVE")?;

        // fmt chunk
        io.write_tag(b"fmt ")?;
        io.write_u32_le(0x10)?;
        io.write_u16_le(self.format_code)?;
        io.write_u16_le(self.channel_count)?;
        io.write_u32_le(self.sampling_rate)?;
        io.write_u32_le(byte_rate)?;
        io.write_u16_le(block_align)?;
        io.write_u16_le(self.bit_count)?;

        // smpl chunk (循环信息)
        if let Some(lp) = &self.sample_loop {
            io.write_tag(b"smpl")?;
            io.write_u32_le(SMPL_BODY_SIZE)?;
            io.write_u32_le(0)?; // manufacturer
            io.write_u32_le(0)?; // product
            io.write_u32_le(1_000_000_000u32 / self.sampling_rate)?; // sample period (ns)
            io.write_u32_le(0x3C)?; // MIDI unity note
            io.write_u32_le(0)?; // MIDI pitch fraction
            io.write_u32_le(0)?; // SMPTE format
            io.write_u32_le(0)?; // SMPTE offset
            io.write_u32_le(1)?; // sample loops
            io.write_u32_le(0x18)?; // sampler data
            io.write_u32_le(0)?; // loop identifier
            io.write_u32_le(0)?; // loop type
            io.write_u32_le(lp.start_sample)?;
            io.write_u32_le(lp.end_sample)?;
            io.write_u32_le(0)?; // loop fraction
            io.write_u32_le(lp.play_count)?;
        }

        // note chunk (备注)
        if let Some(comm) = &self.note {
            let note_size = self.note_size();
            io.write_tag(b"note")?;
            io.write_u32_le(note_size)?;
            io.write_u32_le(0)?; // dwName
            io.write_all(comm.as_bytes())?;
            io.write_u8(0)?;
            let padding = note_size - 4 - comm.len() as u32 - 1;
            for _ in 0..padding {
                io.write_u8(0)?;
            }
        }

        // data chunk header
        io.write_tag(b"data")?;
        io.write_u32_le(self.data_size())?;

        debug!(
            "WAVE 头部: {} Hz, {} 声道, {} 位, data {} 字节",
            self.sampling_rate,
            self.channel_count,
            self.bit_count,
            self.data_size(),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;

    fn plain_header() -> WaveHeader {
        WaveHeader {
            format_code: 1,
            bit_count: 16,
            channel_count: 1,
            sampling_rate: 44100,
            total_samples: 10 * 1024,
            sample_loop: None,
            note: None,
        }
    }

    fn render(header: &WaveHeader) -> Vec<u8> {
        let backend = MemoryBackend::new();
        let mut io = IoContext::new(Box::new(backend));
        header.write(&mut io).unwrap();
        io.seek(std::io::SeekFrom::Start(0)).unwrap();
        let len = header.header_size() as usize;
        io.read_bytes(len).unwrap()
    }

    #[test]
    fn test_plain_header_is_44_bytes() {
        let h = plain_header();
        assert_eq!(h.header_size(), 44);
        assert_eq!(h.data_size(), 10 * 1024 * 2);
        assert_eq!(h.riff_size(), 0x24 + 10 * 1024 * 2);

        let bytes = render(&h);
        assert_eq!(bytes.len(), 44);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        // fmt 块: 格式码 1, 单声道, 44100 Hz, blockAlign 2, 16 位
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 1);
        assert_eq!(
            u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            44100
        );
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 2);
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16);
        assert_eq!(&bytes[36..40], b"data");
    }

    #[test]
    fn test_float_descriptor() {
        let mut h = plain_header();
        h.format_code = 3;
        h.bit_count = 32;
        h.channel_count = 2;
        assert_eq!(h.block_align(), 8);

        let bytes = render(&h);
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 3);
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 32);
    }

    #[test]
    fn test_smpl_chunk_layout() {
        let mut h = plain_header();
        h.sample_loop = Some(SampleLoop {
            start_sample: 4 * 1024,
            end_sample: 12 * 1024,
            play_count: 0,
        });
        assert_eq!(h.header_size(), 44 + 8 + 0x3C);

        let bytes = render(&h);
        assert_eq!(&bytes[36..40], b"smpl");
        assert_eq!(
            u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
            0x3C
        );
        // samplePeriod = floor(1e9 / 44100)
        assert_eq!(
            u32::from_le_bytes([bytes[52], bytes[53], bytes[54], bytes[55]]),
            22675
        );
        // loopStart 位于块体偏移 0x2C
        assert_eq!(
            u32::from_le_bytes([bytes[88], bytes[89], bytes[90], bytes[91]]),
            4 * 1024
        );
        assert_eq!(&bytes[104..108], b"data");
    }

    #[test]
    fn test_note_chunk_padding() {
        let mut h = plain_header();
        h.note = Some("ab".into());
        // 4 + 2 + 1 = 7, 对齐到 8
        assert_eq!(h.note_size(), 8);

        let bytes = render(&h);
        assert_eq!(&bytes[36..40], b"note");
        assert_eq!(
            u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
            8
        );
        assert_eq!(&bytes[48..50], b"ab");
        assert_eq!(bytes[50], 0);
        assert_eq!(&bytes[52..56], b"data");
    }

    #[test]
    fn test_note_chunk_max_comment() {
        let mut h = plain_header();
        h.note = Some("x".repeat(255));
        // 4 + 255 + 1 = 260, 已对齐
        assert_eq!(h.note_size(), 260);
        let bytes = render(&h);
        assert_eq!(bytes.len() as u32, 44 + 8 + 260);
    }
}
