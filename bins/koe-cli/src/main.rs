//! koe - HCA 批量解码命令行工具
//!
//! 把一个或多个 .hca 文件解码为标准 WAV. 多文件时按 -p 并行,
//! 每个工作线程各持一个解码器实例; 单个文件失败只记日志, 不中断批次.

mod logging;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use tracing::{error, info, warn};

use koe_codec::{DecodeConfig, HcaDecoder};
use koe_core::OutputMode;

#[derive(Parser, Debug)]
#[command(name = "koe", version, about = "纯 Rust HCA 音频解码工具")]
struct Cli {
    /// 保存 WAV 文件的目录 (默认为源文件所在目录)
    #[arg(long = "save")]
    save_dir: Option<PathBuf>,

    /// 解扰密钥 1 (十六进制, 例如 30DBE1AB)
    #[arg(long = "c1", value_parser = parse_hex_key)]
    key1: Option<u32>,

    /// 解扰密钥 2 (十六进制, 例如 CC554639)
    #[arg(long = "c2", value_parser = parse_hex_key)]
    key2: Option<u32>,

    /// 解码输出位数 (0=浮点, 8, 16, 24, 32)
    #[arg(short = 'm', long = "mode", default_value_t = 16)]
    mode: i64,

    /// 循环次数 (0=使用文件内设置, >0=强制循环 N 次)
    #[arg(short = 'l', long = "loop", default_value_t = 0)]
    loop_count: u32,

    /// 音量缩放 (例如 0.5, 1.0, 1.5)
    #[arg(short = 'v', long = "volume", default_value_t = 1.0)]
    volume: f32,

    /// 并行解码的文件数量 (默认为 CPU 核心数)
    #[arg(short = 'p', long = "parallel")]
    parallel: Option<usize>,

    /// 日志级别 (--verbose debug, --verbose --verbose trace)
    #[arg(long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// 输入 .hca 文件
    inputs: Vec<PathBuf>,
}

/// 解析十六进制密钥, 允许 0x 前缀
fn parse_hex_key(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("无效的十六进制密钥 '{s}': {e}"))
}

fn main() {
    let cli = Cli::parse();
    logging::init("koe-cli", cli.verbose);

    if cli.inputs.is_empty() {
        error!("请提供至少一个 HCA 文件进行解码");
        eprintln!();
        eprintln!("用法: koe [选项] <hca文件1> [hca文件2] ...");
        eprintln!("使用 --help 查看完整用法.");
        process::exit(1);
    }

    let defaults = DecodeConfig::default();
    let mode = match OutputMode::from_bits(cli.mode) {
        Ok(m) => m,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };
    let config = DecodeConfig {
        key1: cli.key1.unwrap_or(defaults.key1),
        key2: cli.key2.unwrap_or(defaults.key2),
        mode,
        loop_count: cli.loop_count,
        volume: cli.volume,
    };

    if let Some(dir) = &cli.save_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!("无法创建输出目录 {}: {e}", dir.display());
            process::exit(1);
        }
    }

    let workers = cli
        .parallel
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .max(1)
        .min(cli.inputs.len());

    info!("开始解码 {} 个文件, 并行数 {}", cli.inputs.len(), workers);

    let next_job = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                // 解码器状态不可共享, 每个工作线程各建一个实例
                let decoder = HcaDecoder::new(config);
                loop {
                    let job = next_job.fetch_add(1, Ordering::Relaxed);
                    let Some(input) = cli.inputs.get(job) else {
                        break;
                    };
                    if !process_file(&decoder, input, cli.save_dir.as_deref()) {
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    let failed = failures.load(Ordering::Relaxed);
    if failed > 0 {
        warn!("解码完成, {failed} 个文件失败");
    } else {
        info!("所有解码任务完成");
    }
}

/// 处理单个输入文件, 返回是否成功
fn process_file(decoder: &HcaDecoder, input: &Path, save_dir: Option<&Path>) -> bool {
    let is_hca = input
        .extension()
        .map(|e| e.eq_ignore_ascii_case("hca"))
        .unwrap_or(false);
    if !is_hca {
        warn!("跳过 {} (非 .hca 文件)", input.display());
        return true;
    }

    let output = match save_dir {
        Some(dir) => dir.join(input.with_extension("wav").file_name().unwrap_or_default()),
        None => input.with_extension("wav"),
    };

    info!("正在处理: {} -> {}", input.display(), output.display());
    match decoder.decode_file(&input.to_string_lossy(), &output.to_string_lossy()) {
        Ok(stream) => {
            info!(
                "成功解码: {} ({} 声道, {} Hz, {} 块)",
                output.display(),
                stream.channel_count,
                stream.sampling_rate,
                stream.block_count,
            );
            true
        }
        Err(e) => {
            error!("解码失败 {}: {e}", input.display());
            false
        }
    }
}
