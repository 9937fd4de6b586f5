//! kalloc 构建脚本
//!
//! 这个脚本在编译前运行，负责：
//! 1. 解析 Kalloc.toml 配置文件
//! 2. 校验配置取值
//! 3. 生成 src/config.rs

use std::env;
use std::fs;
use std::path::PathBuf;

/// 默认 CPU 数量（也是空闲页池数量）
const DEFAULT_MAX_CPUS: i64 = 4;
/// 默认页大小
const DEFAULT_PAGE_SIZE: i64 = 4096;
/// 默认窃取批量
const DEFAULT_STEAL_BATCH: i64 = 1;
/// 默认释放毒化字节
const DEFAULT_JUNK_ON_FREE: i64 = 0x01;
/// 默认分配毒化字节
const DEFAULT_JUNK_ON_ALLOC: i64 = 0x05;

fn get_int(config: &toml::Value, section: &str, key: &str, default: i64) -> i64 {
    config
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_integer())
        .unwrap_or(default)
}

fn main() {
    println!("cargo:rerun-if-changed=../Kalloc.toml");
    println!("cargo:rerun-if-changed=build.rs");

    // 配置文件缺失时使用默认值
    let config: toml::Value = match fs::read_to_string("../Kalloc.toml") {
        Ok(content) => toml::from_str(&content).expect("Kalloc.toml 解析失败"),
        Err(_) => {
            println!("cargo:warning=Kalloc.toml not found, using defaults");
            toml::Value::Table(toml::map::Map::new())
        }
    };

    let max_cpus = get_int(&config, "smp", "max_cpus", DEFAULT_MAX_CPUS);
    let page_size = get_int(&config, "memory", "page_size", DEFAULT_PAGE_SIZE);
    let steal_batch = get_int(&config, "memory", "steal_batch", DEFAULT_STEAL_BATCH);
    let junk_on_free = get_int(&config, "debug", "junk_on_free", DEFAULT_JUNK_ON_FREE);
    let junk_on_alloc = get_int(&config, "debug", "junk_on_alloc", DEFAULT_JUNK_ON_ALLOC);

    if max_cpus < 1 {
        panic!("smp.max_cpus 必须至少为 1，当前为 {}", max_cpus);
    }
    // 空闲页的第一个字要存放链表指针
    if page_size < 8 || page_size & (page_size - 1) != 0 {
        panic!("memory.page_size 必须是不小于 8 的 2 的幂，当前为 {}", page_size);
    }
    if steal_batch < 1 {
        panic!("memory.steal_batch 必须至少为 1，当前为 {}", steal_batch);
    }
    for (key, byte) in [("junk_on_free", junk_on_free), ("junk_on_alloc", junk_on_alloc)] {
        if !(0..=0xff).contains(&byte) {
            panic!("debug.{} 必须是单字节，当前为 {:#x}", key, byte);
        }
    }
    if junk_on_free == junk_on_alloc {
        panic!("debug.junk_on_free 与 debug.junk_on_alloc 不能相同");
    }

    generate_config_code(
        max_cpus,
        page_size,
        steal_batch,
        junk_on_free,
        junk_on_alloc,
    );
}

fn generate_config_code(
    max_cpus: i64,
    page_size: i64,
    steal_batch: i64,
    junk_on_free: i64,
    junk_on_alloc: i64,
) {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    let config_code = format!(
        r#"//! kalloc 配置（自动生成）
//!
//! 此文件由 build.rs 根据 Kalloc.toml 自动生成，请勿手动修改

// ============================================================
// SMP 配置
// ============================================================

/// 最大CPU数量（空闲页池数量）
pub const NCPU: usize = {};

// ============================================================
// 内存配置
// ============================================================

/// 页大小
pub const PAGE_SIZE: usize = {};

/// 页大小位移
pub const PAGE_SHIFT: usize = {};

/// 每次探测成功后最多窃取的页数
pub const STEAL_BATCH: usize = {};

// ============================================================
// 调试配置
// ============================================================

/// 释放时填充的毒化字节
pub const JUNK_ON_FREE: u8 = {:#04x};

/// 分配时填充的毒化字节
pub const JUNK_ON_ALLOC: u8 = {:#04x};
"#,
        max_cpus,
        page_size,
        page_size.trailing_zeros(),
        steal_batch,
        junk_on_free,
        junk_on_alloc,
    );

    let config_file = manifest_dir.join("src").join("config.rs");
    let existing_content = fs::read_to_string(&config_file).unwrap_or_default();

    // 只有内容变化时才写入，避免每次编译都更新文件时间戳
    if existing_content != config_code {
        fs::write(&config_file, &config_code).expect("写入配置文件失败");
    }
}
