//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `marquee_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("marquee_core ping={}", marquee_core::ping());
    println!("marquee_core version={}", marquee_core::core_version());
    println!("marquee_core base_url={}", marquee_core::DEFAULT_BASE_URL);
}
